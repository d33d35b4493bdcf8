use std::{fs, io, path::Path};

use crate::spectrum::{Masked, State};

use super::{dadi, text, Format};

/// A builder to write a masked spectrum.
#[derive(Debug)]
pub struct Builder {
    format: Format,
    precision: usize,
}

impl Builder {
    /// Sets the output format. Defaults to dadi; the plain text format drops the mask.
    pub fn set_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Sets the number of decimals written for each value, six by default.
    pub fn set_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn write<W, S: State>(self, writer: &mut W, masked: &Masked<S>) -> io::Result<()>
    where
        W: io::Write,
    {
        match self.format {
            Format::Text => text::write_spectrum(writer, masked.spectrum(), self.precision),
            Format::Dadi => dadi::write_spectrum(writer, masked, self.precision),
        }
    }

    /// Writes to a file, truncating any existing contents.
    pub fn write_to_path<P, S: State>(self, path: P, masked: &Masked<S>) -> io::Result<()>
    where
        P: AsRef<Path>,
    {
        self.write(&mut fs::File::create(path)?, masked)
    }

    /// Writes to a file, or to stdout when no path is given.
    pub fn write_to_path_or_stdout<P, S: State>(
        self,
        path: Option<P>,
        masked: &Masked<S>,
    ) -> io::Result<()>
    where
        P: AsRef<Path>,
    {
        match path {
            Some(path) => self.write_to_path(path, masked),
            None => self.write(&mut io::stdout().lock(), masked),
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            format: Format::Dadi,
            precision: 6,
        }
    }
}
