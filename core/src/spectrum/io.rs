//! Utilities for reading and writing spectra.

pub mod dadi;
pub mod read;
pub mod text;
pub mod write;

use std::{fmt::Write as _, io, str::FromStr};

/// Supported spectrum formats.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Format {
    /// The dadi `.fs` text format, which carries a mask and population ids.
    Dadi,
    /// Plain text format with a `#SHAPE` header.
    Text,
}

impl Format {
    pub(crate) fn detect(bytes: &[u8]) -> Option<Self> {
        Self::detect_plain_text(bytes).or_else(|| Self::detect_dadi(bytes))
    }

    fn detect_dadi(bytes: &[u8]) -> Option<Self> {
        bytes
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .filter(|b| b.is_ascii_digit() || **b == b'#')
            .map(|_| Self::Dadi)
    }

    fn detect_plain_text(bytes: &[u8]) -> Option<Self> {
        bytes.starts_with(&text::START).then_some(Self::Text)
    }
}

fn parse_values(s: &str) -> io::Result<Vec<f64>> {
    s.split_ascii_whitespace()
        .map(f64::from_str)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn format_values(values: &[f64], precision: usize) -> String {
    let mut s = String::new();
    for (i, x) in values.iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        // Writing to a string cannot fail
        let _ = write!(s, "{x:.precision$}");
    }
    s
}
