//! Reading and writing for the plain text format.
//!
//! The plain text format consists of two lines. The first line is a header `#SHAPE=<[shape]>`,
//! where `[shape]` is the `/`-separated shape of the spectrum. The second line gives the
//! spectrum values in flat, row-major order separated by a single space.
//!
//! The format carries no mask, so spectra read from it get the default corner mask.

use std::{fmt, io};

use crate::{
    array::Shape,
    spectrum::{Scs, Spectrum, State},
};

/// The text format start string.
pub(crate) const START: [u8; 6] = *b"#SHAPE";

const PREFIX: &str = "#SHAPE=<";
const SUFFIX: char = '>';

/// Reads an SCS in text format from a reader.
///
/// The stream is assumed to be positioned at the start.
pub fn read_scs<R>(reader: &mut R) -> io::Result<Scs>
where
    R: io::BufRead,
{
    let mut header = String::new();
    reader.read_line(&mut header)?;
    let shape = parse_header(&header).map_err(invalid_data)?;

    let mut body = String::new();
    reader.read_to_string(&mut body)?;
    let values = super::parse_values(&body)?;

    Scs::new(values, shape).map_err(invalid_data)
}

/// Writes a spectrum in text format to a writer.
pub fn write_spectrum<W, S: State>(
    writer: &mut W,
    spectrum: &Spectrum<S>,
    precision: usize,
) -> io::Result<()>
where
    W: io::Write,
{
    let values = spectrum.inner().as_slice();

    writeln!(writer, "{PREFIX}{}{SUFFIX}", spectrum.shape())?;
    writeln!(writer, "{}", super::format_values(values, precision))
}

fn invalid_data<E>(e: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, e)
}

fn parse_header(line: &str) -> Result<Shape, ParseHeaderError> {
    let line = line.trim();

    let sizes = line
        .strip_prefix(PREFIX)
        .and_then(|rest| rest.strip_suffix(SUFFIX))
        .ok_or_else(|| ParseHeaderError::Malformed(line.to_string()))?;

    sizes
        .split('/')
        .map(|size| {
            size.parse::<usize>()
                .map_err(|_| ParseHeaderError::InvalidSize(size.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Shape)
}

/// An error associated with parsing the plain text format header.
#[derive(Debug, Eq, PartialEq)]
pub enum ParseHeaderError {
    /// The line does not have the form `#SHAPE=<...>`.
    Malformed(String),
    /// A size in the shape is not a non-negative integer.
    InvalidSize(String),
}

impl fmt::Display for ParseHeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(line) => write!(
                f,
                "expected plain text header of the form '{PREFIX}...{SUFFIX}', found '{line}'"
            ),
            Self::InvalidSize(size) => {
                write!(f, "invalid size '{size}' in plain text header shape")
            }
        }
    }
}

impl std::error::Error for ParseHeaderError {}
