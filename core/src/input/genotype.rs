//! Genotype calls of single samples.

use std::fmt;

pub mod reader;
pub use reader::Reader;

/// A diploid genotype at a biallelic site, given by its number of alternative alleles.
///
/// When building spectra from VCF, the alternative allele is taken as derived.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Genotype {
    /// Homozygous for the reference allele.
    Zero,
    /// Heterozygous.
    One,
    /// Homozygous for the alternative allele.
    Two,
}

impl Genotype {
    /// The number of called alleles in a genotype.
    pub const PLOIDY: usize = 2;

    /// Returns the number of alternative alleles.
    pub fn alternative_alleles(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// Returns the genotype with the provided allele indices, where zero is the reference allele.
    ///
    /// Returns `None` if any allele is not the reference or the first alternative allele, so that
    /// e.g. `0/2` is not mistaken for a homozygous alternative genotype.
    pub fn from_allele_indices(a: usize, b: usize) -> Option<Self> {
        match (a, b) {
            (0, 0) => Some(Self::Zero),
            (0, 1) | (1, 0) => Some(Self::One),
            (1, 1) => Some(Self::Two),
            _ => None,
        }
    }
}

/// The genotype call of a single sample at a single record.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Call {
    /// A biallelic genotype.
    Called(Genotype),
    /// A genotype that was read, but cannot be counted.
    Skipped(Skipped),
    /// A genotype that could not be interpreted.
    Invalid(Error),
}

/// A reason for skipping a genotype call.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Skipped {
    /// At least one allele was not called.
    ///
    /// Missing calls reduce the number of called alleles at a site.
    Missing,
    /// At least one allele was neither the reference nor the first alternative allele.
    ///
    /// Multiallelic calls cause the whole site to be skipped.
    Multiallelic,
}

impl Skipped {
    /// Returns a short description of the reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Multiallelic => "multiallelic",
        }
    }
}

/// An error associated with interpreting a genotype call.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    /// Genotype does not have two alleles.
    Ploidy {
        /// The number of alleles found.
        found: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Ploidy { found } => write!(
                f,
                "expected diploid genotype with {} alleles, found {found}",
                Genotype::PLOIDY
            ),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_allele_indices() {
        assert_eq!(Genotype::from_allele_indices(0, 0), Some(Genotype::Zero));
        assert_eq!(Genotype::from_allele_indices(1, 0), Some(Genotype::One));
        assert_eq!(Genotype::from_allele_indices(0, 1), Some(Genotype::One));
        assert_eq!(Genotype::from_allele_indices(1, 1), Some(Genotype::Two));
        assert_eq!(Genotype::from_allele_indices(0, 2), None);
        assert_eq!(Genotype::from_allele_indices(2, 2), None);
    }

    #[test]
    fn test_alternative_alleles() {
        assert_eq!(Genotype::Zero.alternative_alleles(), 0);
        assert_eq!(Genotype::One.alternative_alleles(), 1);
        assert_eq!(Genotype::Two.alternative_alleles(), 2);
    }

    #[test]
    fn test_ploidy_error_display() {
        assert_eq!(
            Error::Ploidy { found: 3 }.to_string(),
            "expected diploid genotype with 2 alleles, found 3"
        );
    }
}
