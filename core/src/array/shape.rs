//! Shapes and row-major index arithmetic.

use std::{fmt, ops::Deref};

/// An axis of an array, corresponding to a population in a spectrum.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Axis(pub usize);

impl Deref for Axis {
    type Target = usize;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The shape of an array.
///
/// For a spectrum, the shape along each axis is one more than the number of sampled
/// chromosomes in that population.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Shape(pub Vec<usize>);

impl Shape {
    pub fn elements(&self) -> usize {
        self.iter().product()
    }

    /// Returns the row-major strides of the shape.
    pub(crate) fn strides(&self) -> Strides {
        let mut strides = self
            .iter()
            .rev()
            .scan(1, |acc, &n| {
                let stride = *acc;
                *acc *= n;
                Some(stride)
            })
            .collect::<Vec<_>>();
        strides.reverse();

        Strides(strides)
    }

    /// Returns the multi-dimensional index at the provided position in row-major order.
    ///
    /// The position must be less than the number of elements.
    pub(crate) fn unravel(&self, flat: usize) -> Vec<usize> {
        let mut index = self.digits(flat).collect::<Vec<_>>();
        index.reverse();
        index
    }

    /// Returns the sum of the multi-dimensional index at the provided position in row-major
    /// order.
    ///
    /// For a spectrum, this is the derived allele count summed over populations.
    pub(crate) fn unravel_sum(&self, flat: usize) -> usize {
        self.digits(flat).sum()
    }

    /// Mixed-radix digits of a flat position, last axis first.
    fn digits(&self, flat: usize) -> impl Iterator<Item = usize> + '_ {
        self.iter().rev().scan(flat, |rest, &n| {
            let digit = *rest % n;
            *rest /= n;
            Some(digit)
        })
    }

    /// Returns the sample sizes (number of chromosomes) corresponding to the shape.
    pub fn sample_sizes(&self) -> Vec<usize> {
        self.iter().map(|n| n.saturating_sub(1)).collect()
    }

    /// Returns the total number of chromosomes across all axes.
    pub fn total_sample_size(&self) -> usize {
        self.iter().map(|n| n.saturating_sub(1)).sum()
    }
}

/// Row-major strides of a [`Shape`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Strides(pub Vec<usize>);

impl Strides {
    /// Returns the position of `index` in row-major order, or `None` if it has the wrong number
    /// of dimensions or falls outside `shape`.
    pub(crate) fn ravel<I>(&self, shape: &Shape, index: I) -> Option<usize>
    where
        I: AsRef<[usize]>,
    {
        let index = index.as_ref();

        if index.len() != shape.len() || index.len() != self.len() {
            return None;
        }

        let mut flat = 0;
        for ((&i, &n), &stride) in index.iter().zip(shape.iter()).zip(self.iter()) {
            if i >= n {
                return None;
            }
            flat += i * stride;
        }
        Some(flat)
    }
}

impl Deref for Strides {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[usize]> for Shape {
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}

impl Deref for Shape {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<usize>> for Shape {
    fn from(shape: Vec<usize>) -> Self {
        Self(shape)
    }
}

impl From<&[usize]> for Shape {
    fn from(shape: &[usize]) -> Self {
        Self(shape.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(shape: [usize; N]) -> Self {
        Self(shape.to_vec())
    }
}

impl From<usize> for Shape {
    fn from(n: usize) -> Self {
        Self(vec![n])
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self.iter().map(usize::to_string).collect::<Vec<_>>();
        f.write_str(&parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unravel() {
        let shape = Shape(vec![3, 3, 4]);

        assert_eq!(shape.unravel(0), vec![0, 0, 0]);
        assert_eq!(shape.unravel(1), vec![0, 0, 1]);
        assert_eq!(shape.unravel(4), vec![0, 1, 0]);
        assert_eq!(shape.unravel(35), vec![2, 2, 3]);

        assert_eq!(shape.unravel_sum(35), 7);
        assert_eq!(shape.unravel_sum(4), 1);
    }

    #[test]
    fn test_strides() {
        assert_eq!(Shape(vec![6, 3, 7]).strides(), Strides(vec![21, 7, 1]));
        assert_eq!(Shape(vec![5]).strides(), Strides(vec![1]));
    }

    #[test]
    fn test_ravel() {
        let shape = Shape(vec![19, 17]);
        let strides = shape.strides();

        assert_eq!(strides.ravel(&shape, [0, 0]), Some(0));
        assert_eq!(strides.ravel(&shape, [1, 0]), Some(17));
        assert_eq!(strides.ravel(&shape, [18, 16]), Some(322));
        assert_eq!(strides.ravel(&shape, [19, 0]), None);
        assert_eq!(strides.ravel(&shape, [0]), None);
    }

    #[test]
    fn test_unravel_inverts_ravel() {
        let shape = Shape(vec![4, 2, 3]);
        let strides = shape.strides();

        for flat in 0..shape.elements() {
            assert_eq!(strides.ravel(&shape, shape.unravel(flat)), Some(flat));
        }
    }

    #[test]
    fn test_sample_sizes() {
        let shape = Shape(vec![19, 17]);

        assert_eq!(shape.sample_sizes(), vec![18, 16]);
        assert_eq!(shape.total_sample_size(), 34);
    }

    #[test]
    fn test_display() {
        assert_eq!(Shape(vec![19, 17]).to_string(), "19/17");
        assert_eq!(Shape(vec![5]).to_string(), "5");
    }
}
