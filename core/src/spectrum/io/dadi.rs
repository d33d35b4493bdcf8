//! Reading and writing for the dadi `.fs` format.
//!
//! A file consists of any number of comment lines starting with `#`, followed by
//!
//! 1. a header line with the shape of the spectrum, optionally followed by `folded` or
//!    `unfolded`, optionally followed by quoted population ids, e.g.
//!    `21 17 unfolded "YRI" "CEU"`;
//! 2. a line with the spectrum values in flat, row-major order;
//! 3. an optional line of `0`/`1` mask values, where `1` means masked.
//!
//! When the mask line is missing, the corners are masked, along with the folded-out entries if
//! the spectrum is folded. Writing always includes the mask line.

use std::{fmt, io, str::FromStr};

use crate::{
    array::{Array, Shape},
    spectrum::{Counts, Mask, Masked, Scs, State},
};

/// Reads a masked SCS in dadi format from a reader.
pub fn read_scs<R>(reader: &mut R) -> io::Result<Masked<Counts>>
where
    R: io::BufRead,
{
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;

    let mut lines = buf
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    let header = lines
        .next()
        .ok_or_else(|| invalid_data(ParseDadiError::MissingHeader))?
        .parse::<Header>()
        .map_err(invalid_data)?;

    let values = lines
        .next()
        .ok_or_else(|| invalid_data(ParseDadiError::MissingValues))
        .and_then(super::parse_values)?;

    let spectrum = Scs::new(values, header.shape.clone()).map_err(invalid_data)?;

    let mask = match lines.next() {
        Some(line) => parse_mask(line, header.shape.clone())?,
        None if header.folded => Mask::corners(header.shape.clone())
            .union(&Mask::folded(header.shape.clone())),
        None => Mask::corners(header.shape.clone()),
    };

    let mut masked = Masked::new(spectrum, mask).map_err(invalid_data)?;
    masked.folded = header.folded;
    masked.populations = header.populations;
    Ok(masked)
}

/// Writes a masked spectrum in dadi format to a writer.
pub fn write_spectrum<W, S: State>(
    writer: &mut W,
    masked: &Masked<S>,
    precision: usize,
) -> io::Result<()>
where
    W: io::Write,
{
    let header = Header {
        shape: masked.shape().clone(),
        folded: masked.is_folded(),
        populations: masked.populations.clone(),
    };
    writeln!(writer, "{header}")?;

    writeln!(
        writer,
        "{}",
        super::format_values(masked.spectrum().inner().as_slice(), precision)
    )?;

    let mask = masked
        .mask()
        .inner()
        .iter()
        .map(|&masked| if masked { "1" } else { "0" })
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{mask}")
}

fn parse_mask(line: &str, shape: Shape) -> io::Result<Mask> {
    line.split_ascii_whitespace()
        .map(|v| match v {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => Err(invalid_data(ParseDadiError::InvalidMaskValue(
                v.to_string(),
            ))),
        })
        .collect::<io::Result<Vec<_>>>()
        .and_then(|data| Array::new(data, shape).map_err(invalid_data))
        .map(Mask::new)
}

fn invalid_data<E>(e: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, e)
}

#[derive(Clone, Debug, PartialEq)]
struct Header {
    shape: Shape,
    folded: bool,
    populations: Option<Vec<String>>,
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for v in self.shape.iter() {
            write!(f, "{v} ")?;
        }
        f.write_str(if self.folded { "folded" } else { "unfolded" })?;

        if let Some(populations) = &self.populations {
            for population in populations {
                write!(f, " \"{population}\"")?;
            }
        }

        Ok(())
    }
}

impl FromStr for Header {
    type Err = ParseDadiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Population ids are quoted and may contain whitespace
        let (fields, quoted) = s.split_once('"').unwrap_or((s, ""));

        let mut shape = Vec::new();
        let mut folded = false;
        for field in fields.split_ascii_whitespace() {
            match field {
                "folded" => folded = true,
                "unfolded" => folded = false,
                v => shape.push(
                    v.parse::<usize>()
                        .map_err(|_| ParseDadiError::InvalidHeader(s.to_string()))?,
                ),
            }
        }

        if shape.is_empty() {
            return Err(ParseDadiError::InvalidHeader(s.to_string()));
        }

        let populations = quoted
            .split('"')
            .step_by(2)
            .map(str::to_string)
            .filter(|id| !id.is_empty())
            .collect::<Vec<_>>();

        if !populations.is_empty() && populations.len() != shape.len() {
            return Err(ParseDadiError::PopulationMismatch {
                dimensions: shape.len(),
                populations: populations.len(),
            });
        }

        Ok(Self {
            shape: Shape(shape),
            folded,
            populations: (!populations.is_empty()).then_some(populations),
        })
    }
}

/// An error associated with parsing the dadi format.
#[derive(Debug)]
pub enum ParseDadiError {
    /// The header line could not be parsed.
    InvalidHeader(String),
    /// A mask value was not `0` or `1`.
    InvalidMaskValue(String),
    /// No header line was found.
    MissingHeader,
    /// No line of values followed the header.
    MissingValues,
    /// The number of population ids differs from the number of dimensions.
    PopulationMismatch {
        /// Number of dimensions in the header shape.
        dimensions: usize,
        /// Number of population ids in the header.
        populations: usize,
    },
}

impl fmt::Display for ParseDadiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseDadiError::InvalidHeader(s) => {
                write!(f, "failed to parse '{s}' as dadi format header")
            }
            ParseDadiError::InvalidMaskValue(v) => {
                write!(f, "invalid mask value '{v}', expected 0 or 1")
            }
            ParseDadiError::MissingHeader => f.write_str("missing dadi format header line"),
            ParseDadiError::MissingValues => f.write_str("missing dadi format values line"),
            ParseDadiError::PopulationMismatch {
                dimensions,
                populations,
            } => write!(
                f,
                "found {populations} population ids for spectrum with {dimensions} dimensions"
            ),
        }
    }
}

impl std::error::Error for ParseDadiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let header = Header::from_str("3 4 unfolded \"pop A\" \"pop B\"").unwrap();
        assert_eq!(header.shape, Shape(vec![3, 4]));
        assert!(!header.folded);
        assert_eq!(
            header.populations,
            Some(vec![String::from("pop A"), String::from("pop B")])
        );

        let header = Header::from_str("11 folded").unwrap();
        assert_eq!(header.shape, Shape(vec![11]));
        assert!(header.folded);
        assert_eq!(header.populations, None);

        let header = Header::from_str("5").unwrap();
        assert!(!header.folded);
    }

    #[test]
    fn test_parse_header_errors() {
        assert!(matches!(
            Header::from_str("folded"),
            Err(ParseDadiError::InvalidHeader(_))
        ));
        assert!(matches!(
            Header::from_str("3 4 unfolded \"a\""),
            Err(ParseDadiError::PopulationMismatch {
                dimensions: 2,
                populations: 1
            })
        ));
    }

    #[test]
    fn test_display_header() {
        let header = Header {
            shape: Shape(vec![3, 4]),
            folded: true,
            populations: Some(vec![String::from("a"), String::from("b")]),
        };
        assert_eq!(header.to_string(), "3 4 folded \"a\" \"b\"");
    }

    #[test]
    fn test_read_with_mask() -> io::Result<()> {
        let src = b"# made up\n4 unfolded \"pop\"\n10 3 2 5\n1 0 0 1\n";
        let masked = read_scs(&mut &src[..])?;

        assert_eq!(masked.spectrum(), &Scs::from_vec([10., 3., 2., 5.]));
        assert_eq!(
            masked.mask().inner().as_slice(),
            &[true, false, false, true]
        );
        assert_eq!(masked.populations(), Some(&[String::from("pop")][..]));
        assert!(!masked.is_folded());

        Ok(())
    }

    #[test]
    fn test_read_folded_without_mask() -> io::Result<()> {
        let src = b"5 folded\n0 4 4 0 0\n";
        let masked = read_scs(&mut &src[..])?;

        assert!(masked.is_folded());
        assert_eq!(
            masked.mask().inner().as_slice(),
            &[true, false, false, true, true]
        );

        Ok(())
    }

    #[test]
    fn test_read_invalid_mask() {
        let src = b"3 unfolded\n0 1 0\n1 2 0\n";
        assert_eq!(
            read_scs(&mut &src[..]).unwrap_err().kind(),
            io::ErrorKind::InvalidData
        );
    }

    #[test]
    fn test_write() -> io::Result<()> {
        let masked = Scs::from_vec([0., 1., 2.])
            .into_masked()
            .with_populations(Some(vec![String::from("x")]));

        let mut dest = Vec::new();
        write_spectrum(&mut dest, &masked, 1)?;

        assert_eq!(dest, b"3 unfolded \"x\"\n0.0 1.0 2.0\n1 0 1\n");

        Ok(())
    }
}
