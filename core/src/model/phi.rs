//! Allele frequency densities.

use crate::Array;

use super::Grid;

/// A density of allele frequencies on a grid, in one or two populations.
///
/// The density of two populations is stored with the first population along the rows, so that
/// the density at frequency `x[i]` in the first and `y[j]` in the second population is at index
/// `[i, j]`.
#[derive(Clone, Debug, PartialEq)]
pub enum Phi {
    /// The density in a single population.
    OnePop(Vec<f64>),
    /// The joint density in two populations.
    TwoPops(Array<f64>),
}

impl Phi {
    /// Returns the number of populations.
    pub fn dimensions(&self) -> usize {
        match self {
            Phi::OnePop(_) => 1,
            Phi::TwoPops(_) => 2,
        }
    }

    /// Returns the neutral equilibrium density of a single population with relative size `nu`.
    ///
    /// The density is `nu * theta / x` with `theta = 1`; the singular value at zero frequency is
    /// replaced by its neighbour.
    pub fn equilibrium(grid: &Grid, nu: f64) -> Self {
        let mut phi = grid
            .points()
            .iter()
            .map(|&x| nu / x)
            .collect::<Vec<_>>();
        phi[0] = phi[1];

        Phi::OnePop(phi)
    }

    /// Returns the total mass of the density, integrated using the grid weights.
    pub fn mass(&self, grid: &Grid) -> f64 {
        let w = grid.widths();
        match self {
            Phi::OnePop(phi) => phi.iter().zip(w).map(|(p, w)| p * w).sum(),
            Phi::TwoPops(phi) => {
                let n = grid.len();
                phi.as_slice()
                    .iter()
                    .enumerate()
                    .map(|(k, p)| p * w[k / n] * w[k % n])
                    .sum()
            }
        }
    }

    /// Splits a single population into two.
    ///
    /// At the time of the split both populations have the same allele frequency, so the mass of
    /// each grid point is placed on the diagonal of the joint density. The integral of the
    /// density is preserved.
    ///
    /// A density of two populations is returned unchanged.
    pub fn split(self, grid: &Grid) -> Self {
        match self {
            Phi::OnePop(phi) => {
                let n = grid.len();
                let w = grid.widths();
                let mut joint = Array::from_zeros([n, n]);
                for (i, p) in phi.into_iter().enumerate() {
                    joint[[i, i]] = p / w[i];
                }
                Phi::TwoPops(joint)
            }
            two @ Phi::TwoPops(_) => two,
        }
    }
}
