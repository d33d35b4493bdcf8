//! Utilities for reading spectra.

use std::{fs, io, path::Path};

use crate::spectrum::{Counts, Masked};

use super::{dadi, text, Format};

/// A builder to read a masked SCS.
#[derive(Debug, Default)]
pub struct Builder {
    format: Option<Format>,
}

impl Builder {
    /// Reads a masked SCS, detecting the format from the contents unless it has been set.
    pub fn read<R>(self, reader: &mut R) -> io::Result<Masked<Counts>>
    where
        R: io::Read,
    {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;

        let format = self.format.or_else(|| Format::detect(&raw));
        log::debug!("Reading spectrum in {format:?} format");

        let reader = &mut &raw[..];
        match format {
            Some(Format::Text) => text::read_scs(reader).map(|scs| scs.into_masked()),
            Some(Format::Dadi) => dadi::read_scs(reader),
            None => Err(io::Error::new(io::ErrorKind::InvalidData, "invalid format")),
        }
    }

    /// Reads a masked SCS from a file.
    pub fn read_from_path<P>(self, path: P) -> io::Result<Masked<Counts>>
    where
        P: AsRef<Path>,
    {
        self.read(&mut fs::File::open(path)?)
    }

    /// Reads a masked SCS from a file, or from stdin when no path is given.
    pub fn read_from_path_or_stdin<P>(self, path: Option<P>) -> io::Result<Masked<Counts>>
    where
        P: AsRef<Path>,
    {
        match path {
            Some(path) => self.read_from_path(path),
            None => self.read(&mut io::stdin().lock()),
        }
    }

    /// Fixes the input format rather than detecting it.
    pub fn set_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }
}
