//! Frequency grids.

use super::ModelError;

/// A grid of allele frequencies on `[0, 1]`, crowded towards the boundaries.
///
/// The grid points are `1 / (1 + exp(-c * u))` for `u` uniform on `[-1, 1]`, rescaled so that
/// the first point is exactly zero and the last point exactly one. Each point is the centre of a
/// control volume stretching halfway to its neighbours; the control volume widths double as the
/// weights of the trapezoid rule on the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    points: Vec<f64>,
    widths: Vec<f64>,
}

impl Grid {
    /// The crowding of points towards the boundaries.
    pub const CROWDING: f64 = 8.0;

    /// The smallest supported number of grid points.
    pub const MIN_SIZE: usize = 3;

    /// Returns the default grid sizes for the provided sample sizes.
    ///
    /// These are `max(n) + 20`, `max(n) + 30`, and `max(n) + 40`, where `n` are the number of
    /// sampled chromosomes.
    pub fn default_sizes(sample_sizes: &[usize]) -> Vec<usize> {
        let max = sample_sizes.iter().copied().max().unwrap_or(0);
        vec![max + 20, max + 30, max + 40]
    }

    /// Returns the number of grid points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Creates a grid with `size` points.
    ///
    /// # Errors
    ///
    /// If `size` is less than [`Grid::MIN_SIZE`].
    pub fn new(size: usize) -> Result<Self, ModelError> {
        if size < Self::MIN_SIZE {
            return Err(ModelError::GridSize { size });
        }

        let raw = (0..size)
            .map(|i| -1.0 + 2.0 * i as f64 / (size - 1) as f64)
            .map(|u| 1.0 / (1.0 + (-Self::CROWDING * u).exp()))
            .collect::<Vec<_>>();

        let (first, last) = (raw[0], raw[size - 1]);
        let mut points = raw
            .into_iter()
            .map(|x| (x - first) / (last - first))
            .collect::<Vec<_>>();

        // Exact boundaries regardless of rounding
        points[0] = 0.0;
        points[size - 1] = 1.0;

        let widths = (0..size)
            .map(|i| {
                let left = if i == 0 { points[0] } else { points[i - 1] };
                let right = if i == size - 1 {
                    points[size - 1]
                } else {
                    points[i + 1]
                };
                0.5 * (right - left)
            })
            .collect();

        Ok(Self { points, widths })
    }

    /// Returns the grid points.
    pub fn points(&self) -> &[f64] {
        &self.points
    }

    /// Returns the smallest spacing between grid points, which is the spacing at the boundary.
    pub fn spacing(&self) -> f64 {
        self.points[1] - self.points[0]
    }

    /// Returns the control volume widths of the grid points.
    pub fn widths(&self) -> &[f64] {
        &self.widths
    }
}
