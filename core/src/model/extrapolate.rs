//! Extrapolation of expected spectra to infinitely fine grids.

use crate::{Array, Scs};

use super::ModelError;

/// Extrapolates spectra computed on grids of different spacing to zero spacing.
///
/// Each estimate is paired with the spacing of its grid. The extrapolation evaluates the
/// Lagrange polynomial through the estimates at zero spacing, entry by entry: a single estimate
/// is returned as-is, two estimates are extrapolated linearly, and three quadratically.
///
/// # Errors
///
/// If no estimates are provided, if spacings are repeated, or if spectra shapes differ.
pub fn to_zero_spacing(estimates: &[(f64, Scs)]) -> Result<Scs, ModelError> {
    let Some((_, first)) = estimates.first() else {
        return Err(ModelError::NoGrids);
    };

    if estimates.iter().any(|(_, scs)| scs.shape() != first.shape()) {
        return Err(ModelError::GridShapes);
    }

    let weights = estimates
        .iter()
        .enumerate()
        .map(|(i, (xi, _))| {
            estimates
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, (xj, _))| xj / (xj - xi))
                .product::<f64>()
        })
        .collect::<Vec<_>>();

    if weights.iter().any(|w| !w.is_finite()) {
        return Err(ModelError::GridSpacings);
    }

    let mut data = vec![0.0; first.elements()];
    for (weight, (_, scs)) in weights.iter().zip(estimates) {
        data.iter_mut()
            .zip(scs.inner().iter())
            .for_each(|(v, x)| *v += weight * x);
    }

    Ok(Scs::from(Array::new_unchecked(data, first.shape().clone())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(spacing: f64, f: impl Fn(f64) -> f64) -> (f64, Scs) {
        (spacing, Scs::from_vec([f(spacing), 2.0 * f(spacing)]))
    }

    #[test]
    fn test_single() {
        let estimates = [estimate(0.1, |x| 1.0 + x)];
        assert_eq!(
            to_zero_spacing(&estimates).unwrap(),
            Scs::from_vec([1.1, 2.2])
        );
    }

    #[test]
    fn test_linear() {
        let f = |x: f64| 3.0 - 2.0 * x;
        let estimates = [estimate(0.1, f), estimate(0.05, f)];

        assert_approx_eq!(
            to_zero_spacing(&estimates).unwrap(),
            Scs::from_vec([3.0, 6.0]),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_quadratic() {
        let f = |x: f64| 1.5 + 0.7 * x - 4.0 * x * x;
        let estimates = [estimate(0.03, f), estimate(0.02, f), estimate(0.015, f)];

        assert_approx_eq!(
            to_zero_spacing(&estimates).unwrap(),
            Scs::from_vec([1.5, 3.0]),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(to_zero_spacing(&[]), Err(ModelError::NoGrids)));

        let f = |x: f64| x;
        assert!(matches!(
            to_zero_spacing(&[estimate(0.1, f), estimate(0.1, f)]),
            Err(ModelError::GridSpacings)
        ));
        assert!(matches!(
            to_zero_spacing(&[estimate(0.1, f), (0.2, Scs::from_vec([1.0]))]),
            Err(ModelError::GridShapes)
        ));
    }
}
