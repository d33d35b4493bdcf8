use std::ops::{Deref, Index, IndexMut};

use crate::array::Shape;

/// A number of alleles per population.
///
/// A count of derived alleles corresponds to an index in a [`Spectrum`](super::Spectrum), while
/// a count of sampled chromosomes corresponds to its sample sizes.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Count(pub Vec<usize>);

impl Count {
    /// The number of populations.
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no population has more alleles than in `other`.
    pub fn fits_within(&self, other: &Self) -> bool {
        self.dimensions() == other.dimensions()
            && self.iter().zip(other.iter()).all(|(a, b)| a <= b)
    }

    /// Creates a new count with zero alleles in every population.
    pub fn from_zeros(dimensions: usize) -> Self {
        Self(vec![0; dimensions])
    }

    /// Returns the shape of a spectrum with these sample sizes.
    pub(crate) fn into_shape(self) -> Shape {
        Shape(self.0.into_iter().map(|n| n + 1).collect())
    }

    /// Raises each population to the count in `other`, if larger.
    pub fn max_assign(&mut self, other: &Self) {
        self.0
            .iter_mut()
            .zip(other.iter())
            .for_each(|(a, &b)| *a = (*a).max(b));
    }

    pub fn set_zero(&mut self) {
        self.0.fill(0);
    }

    /// Returns the total over populations.
    pub fn total(&self) -> usize {
        self.iter().sum()
    }

    /// Returns the sample sizes of a spectrum shape, or `None` if any axis is empty.
    pub(crate) fn try_from_shape(shape: Shape) -> Option<Self> {
        shape
            .0
            .into_iter()
            .map(|n| n.checked_sub(1))
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }
}

impl AsRef<[usize]> for Count {
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}

impl Deref for Count {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<usize>> for Count {
    fn from(count: Vec<usize>) -> Self {
        Self(count)
    }
}

impl<const N: usize> From<[usize; N]> for Count {
    fn from(count: [usize; N]) -> Self {
        Self(Vec::from(count))
    }
}

impl From<usize> for Count {
    fn from(count: usize) -> Self {
        Self(vec![count])
    }
}

impl Index<usize> for Count {
    type Output = usize;

    fn index(&self, population: usize) -> &Self::Output {
        &self.0[population]
    }
}

impl IndexMut<usize> for Count {
    fn index_mut(&mut self, population: usize) -> &mut Self::Output {
        &mut self.0[population]
    }
}
