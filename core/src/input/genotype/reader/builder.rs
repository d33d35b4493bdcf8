//! Genotype reader builder.

use std::{io, num::NonZeroUsize};

use noodles_bgzf as bgzf;

use crate::{input, Input};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A builder for a VCF genotype reader over plain or BGZF-compressed input.
///
/// Compression is detected from the magic bytes of the input.
#[derive(Debug)]
pub struct Builder {
    input: Input,
    threads: NonZeroUsize,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            input: Input::Stdin,
            threads: NonZeroUsize::MIN,
        }
    }
}

impl Builder {
    /// Opens the input and builds the reader.
    pub fn build(self) -> io::Result<super::DynReader> {
        let threads = self.threads;

        match self.input.open()? {
            input::Reader::File(reader) => open_vcf(reader, threads),
            input::Reader::Stdin(reader) => open_vcf(reader, threads),
        }
    }

    /// Sets the input, stdin by default.
    pub fn set_input(mut self, input: Input) -> Self {
        self.input = input;
        self
    }

    /// Sets the number of decompression threads for BGZF input.
    pub fn set_threads(mut self, threads: NonZeroUsize) -> Self {
        self.threads = threads;
        self
    }
}

fn open_vcf<R>(mut reader: R, threads: NonZeroUsize) -> io::Result<super::DynReader>
where
    R: 'static + io::BufRead,
{
    if is_gzipped(&mut reader)? {
        log::debug!("Reading BGZF-compressed VCF using {threads} threads");

        let reader = bgzf::reader::Builder::default()
            .set_worker_count(threads)
            .build_from_reader(reader);
        Ok(Box::new(super::vcf::Reader::new(reader)?))
    } else {
        log::debug!("Reading uncompressed VCF");

        Ok(Box::new(super::vcf::Reader::new(reader)?))
    }
}

/// Returns true if the input starts with the gzip magic bytes, without consuming them.
fn is_gzipped<R>(reader: &mut R) -> io::Result<bool>
where
    R: io::BufRead,
{
    Ok(reader.fill_buf()?.starts_with(&GZIP_MAGIC))
}
