//! Sites with per-population allele counts.

pub mod reader;
pub use reader::Reader;

use crate::spectrum::Count;

/// Derived allele counts and called allele totals for each population at a single site.
///
/// Missing genotypes reduce the totals rather than causing the site to be dropped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Site {
    /// Number of derived alleles per population.
    pub counts: Count,
    /// Number of called alleles per population.
    pub totals: Count,
}

impl Site {
    /// Returns the number of populations.
    pub fn dimensions(&self) -> usize {
        self.counts.dimensions()
    }

    /// Returns true if every population has at least as many called alleles as the provided
    /// sample sizes.
    pub fn is_projectable_to(&self, sample_sizes: &Count) -> bool {
        sample_sizes.fits_within(&self.totals)
    }

    /// Creates a site with zero counts and totals.
    pub fn from_zeros(dimensions: usize) -> Self {
        Self {
            counts: Count::from_zeros(dimensions),
            totals: Count::from_zeros(dimensions),
        }
    }

    /// Returns the site with ancestral and derived alleles swapped.
    pub fn into_swapped(mut self) -> Self {
        self.counts
            .0
            .iter_mut()
            .zip(self.totals.iter())
            .for_each(|(count, total)| *count = total - *count);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_projectable_to() {
        let site = Site {
            counts: Count::from([1, 3]),
            totals: Count::from([10, 6]),
        };

        assert!(site.is_projectable_to(&Count::from([10, 6])));
        assert!(site.is_projectable_to(&Count::from([4, 2])));
        assert!(!site.is_projectable_to(&Count::from([4, 7])));
    }

    #[test]
    fn test_into_swapped() {
        let site = Site {
            counts: Count::from([1, 3]),
            totals: Count::from([10, 6]),
        };

        assert_eq!(site.into_swapped().counts, Count::from([9, 3]));
    }
}
