//! Comparing expected spectra to data.
//!
//! Functions in this module take a model spectrum with the same shape as the data. Use [`align`]
//! to project and fold an expected spectrum to match the data first. Only entries that are not
//! masked in the data are considered.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    spectrum::{Counts, Masked},
    utils::ln_gamma,
    Scs,
};

use super::InferenceError;

static WARNED_NON_POSITIVE: AtomicBool = AtomicBool::new(false);

/// Returns the Akaike information criterion of a fit with `parameters` free parameters.
pub fn aic(parameters: usize, ll: f64) -> f64 {
    2.0 * parameters as f64 - 2.0 * ll
}

/// Returns a model spectrum aligned to the data.
///
/// The model is projected down to the shape of the data if larger, and folded if the data are
/// folded.
///
/// # Errors
///
/// If the model cannot be projected to the shape of the data.
pub fn align(model: &Scs, data: &Masked<Counts>) -> Result<Scs, InferenceError> {
    let projected = if model.shape() == data.shape() {
        model.clone()
    } else {
        model.project(data.shape().clone())?
    };

    Ok(if data.is_folded() {
        projected.fold().into_parts().0
    } else {
        projected
    })
}

/// Returns the Anscombe Poisson residuals of data against a model.
///
/// Masked entries and entries where the model is not positive have residual zero.
pub fn anscombe_residuals(model: &Scs, data: &Masked<Counts>) -> Masked<Counts> {
    let model = model.inner().as_slice();

    data.map_unmasked(|i, d| {
        let m = model[i];
        if m > 0.0 && m.is_finite() {
            1.5 * (d.powf(2. / 3.) - (m.powf(2. / 3.) - m.powf(-1. / 3.) / 9.)) / m.powf(1. / 6.)
        } else {
            0.0
        }
    })
}

/// Returns Pearson's chi-squared statistic of data against a model.
///
/// Entries where the model is not positive are ignored.
pub fn chi_squared(model: &Scs, data: &Masked<Counts>) -> f64 {
    usable(model, data)
        .map(|(m, d)| (d - m).powi(2) / m)
        .sum()
}

/// Returns the composite Poisson log-likelihood of data given a model scaled to the data.
///
/// This is `ln L(theta * model | data)` where `theta` is [`optimal_sfs_scaling`].
pub fn ll_multinom(model: &Scs, data: &Masked<Counts>) -> f64 {
    let theta = optimal_sfs_scaling(model, data);
    poisson_ll(&model.clone().scaled(theta), data)
}

/// Returns the optimal scaling of a model to data.
///
/// This is the ratio of the sum of the data to the sum of the model, over entries that are not
/// masked in the data.
pub fn optimal_sfs_scaling(model: &Scs, data: &Masked<Counts>) -> f64 {
    let model = model.inner().as_slice();
    let (data_sum, model_sum) = data
        .iter_unmasked()
        .fold((0.0, 0.0), |(d_sum, m_sum), (i, d)| (d_sum + d, m_sum + model[i]));

    data_sum / model_sum
}

/// Returns the composite Poisson log-likelihood of data given a model.
///
/// Each entry contributes `-m + d ln(m) - ln(d!)`. Entries where the model is not positive are
/// excluded, with a warning the first time this happens.
pub fn poisson_ll(model: &Scs, data: &Masked<Counts>) -> f64 {
    debug_assert_eq!(model.shape(), data.shape());

    let values = model.inner().as_slice();
    let (ll, excluded) = data.iter_unmasked().fold((0.0, 0), |(ll, excluded), (i, d)| {
        let m = values[i];
        if m > 0.0 && m.is_finite() {
            (ll - m + d * m.ln() - ln_gamma(d + 1.0), excluded)
        } else {
            (ll, excluded + 1)
        }
    });

    if excluded > 0 && !WARNED_NON_POSITIVE.swap(true, Ordering::Relaxed) {
        log::warn!(
            "Model is zero or negative in {excluded} entries where data is unmasked; \
            these entries are excluded from the likelihood"
        );
    }

    ll
}

fn usable<'a>(
    model: &'a Scs,
    data: &'a Masked<Counts>,
) -> impl Iterator<Item = (f64, f64)> + 'a {
    let values = model.inner().as_slice();
    data.iter_unmasked()
        .map(move |(i, d)| (values[i], d))
        .filter(|(m, _)| *m > 0.0 && m.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::utils::ln_factorial;

    fn data() -> Masked<Counts> {
        Scs::from_vec([0., 10., 4., 2., 0.]).into_masked()
    }

    #[test]
    fn test_optimal_sfs_scaling() {
        let model = Scs::from_vec([100., 1., 0.5, 0.5, 100.]);
        assert_approx_eq!(optimal_sfs_scaling(&model, &data()), 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_poisson_ll() {
        let model = Scs::from_vec([1., 8., 5., 2., 1.]);

        let expected = [(8., 10.), (5., 4.), (2., 2.)]
            .iter()
            .map(|&(m, d): &(f64, f64)| -m + d * m.ln() - ln_factorial(d as u64))
            .sum::<f64>();

        assert_approx_eq!(poisson_ll(&model, &data()), expected, epsilon = 1e-10);
    }

    #[test]
    fn test_poisson_ll_excludes_non_positive() {
        let full = Scs::from_vec([0., 8., 5., 2., 0.]);
        let partial = Scs::from_vec([0., 8., 0., 2., 0.]);

        let excluded = -5. + 4. * 5f64.ln() - ln_factorial(4);
        assert_approx_eq!(
            poisson_ll(&partial, &data()),
            poisson_ll(&full, &data()) - excluded,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_ll_multinom_invariant_to_scale() {
        let model = Scs::from_vec([1., 4., 2., 1., 1.]);
        let scaled = model.clone().scaled(17.0);

        assert_approx_eq!(
            ll_multinom(&model, &data()),
            ll_multinom(&scaled, &data()),
            epsilon = 1e-10
        );
        assert!(ll_multinom(&model, &data()) > poisson_ll(&model, &data()));
    }

    #[test]
    fn test_chi_squared_and_aic() {
        let model = Scs::from_vec([1., 8., 4., 4., 1.]);

        assert_approx_eq!(chi_squared(&model, &data()), 0.5 + 1.0, epsilon = 1e-12);
        assert_approx_eq!(aic(3, -10.0), 26.0, epsilon = 1e-12);
    }

    #[test]
    fn test_anscombe_residuals() {
        let model = Scs::from_vec([1., 10., 4., 2., 1.]);
        let residuals = anscombe_residuals(&model, &data());

        assert_eq!(residuals.mask(), data().mask());
        assert_eq!(residuals.spectrum()[[0]], 0.0);

        // Residuals are small but positive for data equal to the model
        let d: f64 = 10.0;
        let expected = 1.5 * (d.powf(-1. / 3.) / 9.) / d.powf(1. / 6.);
        assert_approx_eq!(residuals.spectrum()[[1]], expected, epsilon = 1e-12);

        let model = Scs::from_vec([1., 20., 4., 2., 1.]);
        assert!(anscombe_residuals(&model, &data()).spectrum()[[1]] < 0.0);
    }

    #[test]
    fn test_align_projects_and_folds() {
        let data = Scs::from_vec([0., 3., 1., 0.]).fold();
        let model = Scs::from_vec([0., 4., 2., 1., 1., 0.]);

        let aligned = align(&model, &data).unwrap();
        assert_eq!(aligned.shape(), data.shape());

        let unfolded = model.project(4).unwrap();
        assert_approx_eq!(aligned[[1]], unfolded[[1]] + unfolded[[2]], epsilon = 1e-12);
        assert_approx_eq!(aligned[[2]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_align_cannot_project_up() {
        let model = Scs::from_vec([0., 1., 0.]);
        assert!(align(&model, &data()).is_err());
    }
}
