//! Finite difference derivatives at chosen step sizes.
//!
//! Differences are computed by `finitediff`, which moves every coordinate by the same fixed
//! amount. Coordinates are rescaled so that this move lands at the chosen step from the point,
//! and in the chosen direction for one-sided differences.

use std::cell::{Cell, RefCell};

use finitediff::FiniteDiff;
use nalgebra::{DMatrix, DVector};

/// A finite difference stencil for a single coordinate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) enum Stencil {
    /// Steps to either side of the point.
    Central(f64),
    /// Steps upwards only.
    Forward(f64),
    /// Steps downwards only.
    Backward(f64),
}

impl Stencil {
    /// Returns the stencils for a point.
    ///
    /// The step of each coordinate is `eps` times its value, or `eps` itself if the value is
    /// zero. A coordinate is differenced to one side when moving it two steps to the other side
    /// makes `valid` return false.
    pub fn for_point<V>(x: &[f64], eps: f64, valid: V) -> Vec<Self>
    where
        V: Fn(&[f64]) -> bool,
    {
        (0..x.len())
            .map(|i| {
                let h = if x[i] == 0.0 { eps } else { eps * x[i].abs() };

                let moved = |by: f64| {
                    let mut y = x.to_vec();
                    y[i] += by;
                    valid(&y)
                };

                match (moved(-2.0 * h), moved(2.0 * h)) {
                    (false, true) => Self::Forward(h),
                    (true, false) => Self::Backward(h),
                    _ => Self::Central(h),
                }
            })
            .collect()
    }

    fn signed_step(self) -> f64 {
        match self {
            Stencil::Central(h) | Stencil::Forward(h) => h,
            Stencil::Backward(h) => -h,
        }
    }
}

/// Returns how far `finitediff` moves a coordinate to difference a function.
fn gradient_base_step(central: bool) -> f64 {
    let step = Cell::new(0.0f64);
    let record = |u: &Vec<f64>| {
        step.set(step.get().max(u[0].abs()));
        0.0
    };

    let origin = vec![0.0];
    if central {
        origin.central_diff(&record);
    } else {
        origin.forward_diff(&record);
    }
    step.get()
}

/// Returns how far `finitediff` moves a coordinate to difference a vector-valued function.
fn jacobian_base_step(central: bool) -> f64 {
    let step = Cell::new(0.0f64);
    let record = |u: &Vec<f64>| {
        step.set(step.get().max(u[0].abs()));
        vec![0.0]
    };

    let origin = vec![0.0];
    if central {
        origin.central_jacobian(&record);
    } else {
        origin.forward_jacobian(&record);
    }
    step.get()
}

fn offset(x: &[f64], u: &[f64], scales: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(u)
        .zip(scales)
        .map(|((x, u), scale)| x + u * scale)
        .collect()
}

/// Finite differences of a fallible function.
///
/// Differences are central if every stencil is central. Otherwise, all coordinates are
/// differenced forwards in rescaled coordinates, which is backwards for coordinates with a
/// backward stencil. The first error stops further evaluations and is returned at the end.
struct Differences<F, E> {
    f: F,
    steps: Vec<f64>,
    central: bool,
    gradient_base: f64,
    jacobian_base: f64,
    error: RefCell<Option<E>>,
}

impl<F, E> Differences<F, E>
where
    F: Fn(&[f64]) -> Result<f64, E>,
{
    fn new(f: F, stencils: &[Stencil]) -> Self {
        let central = stencils.iter().all(|s| matches!(s, Stencil::Central(_)));

        Self {
            f,
            steps: stencils.iter().map(|s| s.signed_step()).collect(),
            central,
            gradient_base: gradient_base_step(central),
            jacobian_base: jacobian_base_step(central),
            error: RefCell::new(None),
        }
    }

    fn evaluate(&self, y: &[f64]) -> f64 {
        if self.error.borrow().is_some() {
            return f64::NAN;
        }

        match (self.f)(y) {
            Ok(value) => value,
            Err(e) => {
                self.error.replace(Some(e));
                f64::NAN
            }
        }
    }

    fn finish<T>(self, value: T) -> Result<T, E> {
        match self.error.into_inner() {
            Some(e) => Err(e),
            None => Ok(value),
        }
    }

    fn scales(&self, base: f64) -> Vec<f64> {
        self.steps.iter().map(|step| step / base).collect()
    }

    fn gradient_at(&self, x: &[f64]) -> Vec<f64> {
        let scales = self.scales(self.gradient_base);
        let f = |u: &Vec<f64>| self.evaluate(&offset(x, u, &scales));

        let origin = vec![0.0; x.len()];
        let rescaled = if self.central {
            origin.central_diff(&f)
        } else {
            origin.forward_diff(&f)
        };

        rescaled
            .iter()
            .zip(&scales)
            .map(|(g, scale)| g / scale)
            .collect()
    }

    fn hessian_at(&self, x: &[f64]) -> DMatrix<f64> {
        let n = x.len();
        let scales = self.scales(self.jacobian_base);
        let gradient = |v: &Vec<f64>| self.gradient_at(&offset(x, v, &scales));

        let origin = vec![0.0; n];
        let rescaled = if self.central {
            origin.central_jacobian(&gradient)
        } else {
            origin.forward_jacobian(&gradient)
        };

        // Row i is the gradient differentiated along rescaled coordinate i
        DMatrix::from_fn(n, n, |i, j| {
            0.5 * (rescaled[i][j] / scales[i] + rescaled[j][i] / scales[j])
        })
    }
}

/// Returns the gradient of `f` at `x`.
pub(super) fn gradient<F, E>(f: F, x: &[f64], stencils: &[Stencil]) -> Result<DVector<f64>, E>
where
    F: Fn(&[f64]) -> Result<f64, E>,
{
    let differences = Differences::new(f, stencils);
    let gradient = DVector::from_vec(differences.gradient_at(x));
    differences.finish(gradient)
}

/// Returns the Hessian of `f` at `x`.
pub(super) fn hessian<F, E>(f: F, x: &[f64], stencils: &[Stencil]) -> Result<DMatrix<f64>, E>
where
    F: Fn(&[f64]) -> Result<f64, E>,
{
    let differences = Differences::new(f, stencils);
    let hessian = differences.hessian_at(x);
    differences.finish(hessian)
}
