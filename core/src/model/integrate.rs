//! Forward integration of allele frequency densities under the diffusion approximation.
//!
//! Time is measured in units of `2 N_ref` generations, population sizes relative to `N_ref`,
//! and migration rates in units of `2 N_ref m`. Densities are advanced by an implicit
//! (backward Euler) finite volume scheme, alternating between directions for two populations.
//! Each step first injects new mutations into the first interior grid cell and then solves one
//! tridiagonal system per grid line.

use crate::Array;

use super::Grid;

/// The size of a population over an integration interval, relative to the reference size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Size {
    /// A constant size.
    Constant(f64),
    /// A size changing exponentially from `start` to `end` over the interval.
    Exponential {
        /// The size at the beginning of the interval.
        start: f64,
        /// The size at the end of the interval.
        end: f64,
    },
}

impl Size {
    /// Returns the size at time `t` of an interval of length `time`.
    pub fn at(&self, t: f64, time: f64) -> f64 {
        match *self {
            Size::Constant(nu) => nu,
            Size::Exponential { start, end } if time > 0.0 => {
                start * ((end / start).ln() * t / time).exp()
            }
            Size::Exponential { start, .. } => start,
        }
    }

    fn min(&self) -> f64 {
        match *self {
            Size::Constant(nu) => nu,
            Size::Exponential { start, end } => start.min(end),
        }
    }
}

impl From<f64> for Size {
    fn from(nu: f64) -> Self {
        Self::Constant(nu)
    }
}

/// An integrator of allele frequency densities.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Integrator {
    timescale: f64,
}

impl Integrator {
    /// The default timescale.
    pub const DEFAULT_TIMESCALE: f64 = 1e-3;

    fn dt(&self, rates: &[f64]) -> f64 {
        let max = rates.iter().fold(1.0f64, |max, &rate| max.max(rate));
        self.timescale / max
    }

    /// Creates a new integrator with the provided timescale.
    ///
    /// The time step of the integration is the timescale divided by the largest of one, the
    /// migration rates, and `0.25 / nu` for each population.
    pub fn new(timescale: f64) -> Self {
        Self { timescale }
    }

    /// Integrates the density of a single population forward for `time`.
    pub fn one_pop(&self, phi: &mut [f64], grid: &Grid, time: f64, nu: Size) {
        let dt = self.dt(&[0.25 / nu.min()]);

        let mut system = Tridiagonal::new(grid.len());
        let mut current = None;

        for (t, step) in Steps::new(time, dt) {
            let nu_t = nu.at(t, time);

            if current != Some((nu_t, step)) {
                system.set_implicit_step(grid, nu_t, |_| 0.0, step);
                current = Some((nu_t, step));
            }

            inject_mutations_1d(phi, grid, step);
            system.solve(phi);
        }
    }

    /// Integrates the joint density of two populations forward for `time`.
    ///
    /// Migration rate `m12` is the rate of migration into the first population from the second,
    /// and conversely for `m21`.
    #[allow(clippy::too_many_arguments)]
    pub fn two_pops(
        &self,
        phi: &mut Array<f64>,
        grid: &Grid,
        time: f64,
        nu1: Size,
        nu2: Size,
        m12: f64,
        m21: f64,
    ) {
        let n = grid.len();
        let x = grid.points();
        let dt = self.dt(&[0.25 / nu1.min(), 0.25 / nu2.min(), m12, m21]);

        // Systems along the first axis are indexed by the grid point of the second, and vice versa
        let mut first = vec![Tridiagonal::new(n); n];
        let mut second = vec![Tridiagonal::new(n); n];
        let mut current = None;

        let mut line = vec![0.0; n];

        for (t, step) in Steps::new(time, dt) {
            let (nu1_t, nu2_t) = (nu1.at(t, time), nu2.at(t, time));

            if current != Some((nu1_t, nu2_t, step)) {
                for (j, system) in first.iter_mut().enumerate() {
                    system.set_implicit_step(grid, nu1_t, |xf| m12 * (x[j] - xf), step);
                }
                for (i, system) in second.iter_mut().enumerate() {
                    system.set_implicit_step(grid, nu2_t, |yf| m21 * (x[i] - yf), step);
                }
                current = Some((nu1_t, nu2_t, step));
            }

            inject_mutations_2d(phi, grid, step);

            let data = phi.as_mut_slice();
            for (j, system) in first.iter_mut().enumerate() {
                line.iter_mut()
                    .enumerate()
                    .for_each(|(i, v)| *v = data[i * n + j]);
                system.solve(&mut line);
                line.iter()
                    .enumerate()
                    .for_each(|(i, v)| data[i * n + j] = *v);
            }
            for (row, system) in data.chunks_exact_mut(n).zip(second.iter_mut()) {
                system.solve(row);
            }
        }
    }

    /// Returns the timescale.
    pub fn timescale(&self) -> f64 {
        self.timescale
    }
}

impl Default for Integrator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMESCALE)
    }
}

fn inject_mutations_1d(phi: &mut [f64], grid: &Grid, dt: f64) {
    let (x, w) = (grid.points(), grid.widths());
    phi[1] += dt / (2.0 * x[1]) / w[1];
}

fn inject_mutations_2d(phi: &mut Array<f64>, grid: &Grid, dt: f64) {
    let (x, w) = (grid.points(), grid.widths());
    let rate = dt / (2.0 * x[1]) / (w[1] * w[0]);
    phi[[1, 0]] += rate;
    phi[[0, 1]] += rate;
}

/// Iterator over integration steps as `(midpoint, length)`, truncating the final step to end
/// exactly at the total time.
struct Steps {
    time: f64,
    dt: f64,
    step: usize,
    steps: usize,
}

impl Steps {
    fn new(time: f64, dt: f64) -> Self {
        let steps = if time > 0.0 {
            (time / dt).ceil() as usize
        } else {
            0
        };

        Self {
            time,
            dt,
            step: 0,
            steps,
        }
    }
}

impl Iterator for Steps {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.step >= self.steps {
            return None;
        }

        let start = self.step as f64 * self.dt;
        let length = self.dt.min(self.time - start);
        self.step += 1;

        (length > 0.0).then_some((start + 0.5 * length, length))
    }
}

/// A tridiagonal linear system.
#[derive(Clone, Debug)]
struct Tridiagonal {
    lower: Vec<f64>,
    diagonal: Vec<f64>,
    upper: Vec<f64>,
    scratch: Vec<f64>,
}

impl Tridiagonal {
    fn new(n: usize) -> Self {
        Self {
            lower: vec![0.0; n],
            diagonal: vec![1.0; n],
            upper: vec![0.0; n],
            scratch: vec![0.0; n],
        }
    }

    /// Sets up the backward Euler step of length `dt` for the diffusion along a grid line.
    ///
    /// The flux through the face between grid points `i` and `i + 1` is
    /// `A[i] * phi[i] + B[i] * phi[i + 1]`, with drift upwinded on the face midpoint and
    /// diffusion `V = x (1 - x) / nu` centered. The outer boundaries are closed.
    fn set_implicit_step<F>(&mut self, grid: &Grid, nu: f64, drift: F, dt: f64)
    where
        F: Fn(f64) -> f64,
    {
        let (x, w) = (grid.points(), grid.widths());
        let v = |i: usize| x[i] * (1.0 - x[i]) / nu;

        self.lower.fill(0.0);
        self.diagonal.fill(1.0);
        self.upper.fill(0.0);

        for i in 0..x.len() - 1 {
            let h = x[i + 1] - x[i];
            let m = drift(0.5 * (x[i] + x[i + 1]));

            let a = m.max(0.0) + v(i) / (2.0 * h);
            let b = m.min(0.0) - v(i + 1) / (2.0 * h);

            self.diagonal[i] += dt * a / w[i];
            self.upper[i] += dt * b / w[i];
            self.lower[i + 1] -= dt * a / w[i + 1];
            self.diagonal[i + 1] -= dt * b / w[i + 1];
        }
    }

    /// Solves the system in place using the Thomas algorithm.
    fn solve(&mut self, rhs: &mut [f64]) {
        let Self {
            lower,
            diagonal,
            upper,
            scratch,
        } = self;
        let n = rhs.len();

        scratch[0] = upper[0] / diagonal[0];
        rhs[0] /= diagonal[0];
        for i in 1..n {
            let m = diagonal[i] - lower[i] * scratch[i - 1];
            scratch[i] = upper[i] / m;
            rhs[i] = (rhs[i] - lower[i] * rhs[i - 1]) / m;
        }

        for i in (0..n - 1).rev() {
            rhs[i] -= scratch[i] * rhs[i + 1];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::Phi;

    fn mass_1d(phi: &[f64], grid: &Grid) -> f64 {
        phi.iter().zip(grid.widths()).map(|(p, w)| p * w).sum()
    }

    #[test]
    fn test_size_exponential() {
        let size = Size::Exponential {
            start: 0.5,
            end: 2.0,
        };

        assert_approx_eq!(size.at(0.0, 1.0), 0.5, epsilon = 1e-12);
        assert_approx_eq!(size.at(0.5, 1.0), 1.0, epsilon = 1e-12);
        assert_approx_eq!(size.at(1.0, 1.0), 2.0, epsilon = 1e-12);
        assert_eq!(size.min(), 0.5);
    }

    #[test]
    fn test_steps_truncate_last() {
        let steps = Steps::new(0.25, 0.1).collect::<Vec<_>>();

        assert_eq!(steps.len(), 3);
        assert_approx_eq!(steps[2].1, 0.05, epsilon = 1e-12);
        assert_approx_eq!(steps.iter().map(|s| s.1).sum::<f64>(), 0.25, epsilon = 1e-12);
        assert_approx_eq!(steps[0].0, 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_steps_zero_time() {
        assert_eq!(Steps::new(0.0, 0.1).count(), 0);
    }

    #[test]
    fn test_tridiagonal_solve() {
        let mut system = Tridiagonal {
            lower: vec![0.0, 1.0, 1.0],
            diagonal: vec![4.0, 4.0, 4.0],
            upper: vec![1.0, 1.0, 0.0],
            scratch: vec![0.0; 3],
        };

        // Solution [1, 2, 3]
        let mut rhs = vec![6.0, 12.0, 14.0];
        system.solve(&mut rhs);

        assert_approx_eq!(rhs, vec![1.0, 2.0, 3.0], epsilon = 1e-12);
    }

    #[test]
    fn test_implicit_step_conserves_mass() {
        let grid = Grid::new(30).unwrap();
        let mut phi = grid
            .points()
            .iter()
            .map(|x| (1.0 + x) * (2.0 - x))
            .collect::<Vec<_>>();
        let mass = mass_1d(&phi, &grid);

        let mut system = Tridiagonal::new(grid.len());
        system.set_implicit_step(&grid, 0.7, |x| 0.3 - x, 0.01);
        for _ in 0..50 {
            system.solve(&mut phi);
        }

        assert_approx_eq!(mass_1d(&phi, &grid), mass, epsilon = 1e-10);
        assert!(phi.iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn test_one_pop_equilibrium_is_stationary() {
        let grid = Grid::new(60).unwrap();
        let Phi::OnePop(start) = Phi::equilibrium(&grid, 1.0) else {
            unreachable!()
        };

        let mut phi = start.clone();
        Integrator::default().one_pop(&mut phi, &grid, 0.5, Size::Constant(1.0));

        // Compare away from the boundaries, where mass of fixed alleles accumulates
        for i in 5..55 {
            assert!((phi[i] / start[i] - 1.0).abs() < 0.05, "{i}");
        }
    }

    #[test]
    fn test_one_pop_decline_loses_diversity() {
        let grid = Grid::new(40).unwrap();
        let Phi::OnePop(start) = Phi::equilibrium(&grid, 1.0) else {
            unreachable!()
        };

        let mut phi = start.clone();
        Integrator::default().one_pop(&mut phi, &grid, 0.2, Size::Constant(0.1));

        assert!(phi[20] < start[20]);
    }

    #[test]
    fn test_two_pops_conserves_mass_without_mutation() {
        let grid = Grid::new(20).unwrap();
        let n = grid.len();
        let mut phi = Array::from_fn([n, n], |index| {
            let (i, j) = (index[0] as f64, index[1] as f64);
            1.0 + 0.1 * i + 0.05 * j
        });
        let mass = Phi::TwoPops(phi.clone()).mass(&grid);

        let x = grid.points();
        let mut first = Tridiagonal::new(n);
        first.set_implicit_step(&grid, 1.5, |xf| 2.0 * (x[3] - xf), 0.01);

        let data = phi.as_mut_slice();
        let mut line = (0..n).map(|i| data[i * n + 3]).collect::<Vec<_>>();
        first.solve(&mut line);
        (0..n).for_each(|i| data[i * n + 3] = line[i]);

        assert_approx_eq!(Phi::TwoPops(phi).mass(&grid), mass, epsilon = 1e-10);
    }

    #[test]
    fn test_two_pops_symmetric() {
        let grid = Grid::new(15).unwrap();
        let Phi::TwoPops(mut phi) = Phi::equilibrium(&grid, 1.0).split(&grid) else {
            unreachable!()
        };

        Integrator::default().two_pops(
            &mut phi,
            &grid,
            0.05,
            Size::Constant(1.0),
            Size::Constant(1.0),
            0.5,
            0.5,
        );

        // Symmetric up to the splitting error of alternating directions
        assert!(phi[[3, 7]] > 0.0);
        assert!((phi[[3, 7]] / phi[[7, 3]] - 1.0).abs() < 0.1);
        assert!(phi.iter().all(|&p| p >= 0.0));
    }
}
