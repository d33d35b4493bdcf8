//! Parameter uncertainties from the curvature of the composite likelihood.
//!
//! Since sites in a spectrum are linked, the composite likelihood overstates the information in
//! the data. The Godambe information matrix `G = H J⁻¹ H` corrects for this, where `H` is the
//! negated Hessian of the log-likelihood of the data and `J` is the variance of the score over
//! bootstrap replicates. Ignoring linkage, the Fisher information `H` may be used instead.
//!
//! The population scaled mutation rate θ is appended as the last parameter, scaling the expected
//! spectrum multiplicatively.

use std::{cell::RefCell, collections::HashMap, fmt};

use nalgebra::{DMatrix, DVector};

use crate::{
    array::Shape,
    inference::{align, optimal_sfs_scaling, poisson_ll, InferenceError},
    model::{Model, ModelError},
    spectrum::{Counts, Masked},
    Scs,
};

mod derivatives;
use derivatives::{gradient, hessian, Stencil};

/// The z-score of a two-sided 95% confidence interval under normality.
pub const Z_95: f64 = 1.96;

/// Step sizes used for finite differences by default.
pub const DEFAULT_STEPS: [f64; 5] = [0.1, 0.01, 0.001, 0.0001, 0.00001];

/// Uncertainty estimation for a model fitted to data.
pub struct Uncertainty<'a, M: ?Sized> {
    model: &'a M,
    data: &'a Masked<Counts>,
    grid_sizes: Vec<usize>,
    log: bool,
    cache: RefCell<HashMap<Vec<u64>, Scs>>,
}

impl<'a, M> Uncertainty<'a, M>
where
    M: Model + ?Sized,
{
    fn coordinates(&self, params: &[f64]) -> Vec<f64> {
        if self.log {
            params.iter().map(|p| p.ln()).collect()
        } else {
            params.to_vec()
        }
    }

    fn expected(&self, params: &[f64]) -> Result<Scs, UncertError> {
        let key = params.iter().map(|p| p.to_bits()).collect::<Vec<_>>();
        if let Some(spectrum) = self.cache.borrow().get(&key) {
            return Ok(spectrum.clone());
        }

        let sample_sizes = self.data.shape().sample_sizes();
        let expected = self
            .model
            .expected(params, &sample_sizes, &self.grid_sizes)
            .map_err(InferenceError::from)?;
        let aligned = align(&expected, self.data)?;

        self.cache.borrow_mut().insert(key, aligned.clone());
        Ok(aligned)
    }

    /// Returns the parameter uncertainties from the Fisher information.
    ///
    /// The returned vector holds the standard deviation of each parameter, followed by that of
    /// θ. With log parameters, these are standard deviations of the logarithms.
    ///
    /// # Errors
    ///
    /// If the model cannot be computed near the parameters, or if the Hessian is singular.
    pub fn fim(&self, params: &[f64], eps: f64) -> Result<Vec<f64>, UncertError> {
        let (point, stencils) = self.point(params, eps)?;

        let h = -self.hessian(&point, &stencils, self.data)?;
        let covariance = h.try_inverse().ok_or(UncertError::Singular)?;

        Ok(standard_deviations(&covariance))
    }

    /// Returns the parameter uncertainties from the Godambe information.
    ///
    /// The bootstrap spectra must have the shape of the data, and are masked with the mask of
    /// the data. See [`Uncertainty::fim`] for the returned vector.
    ///
    /// # Errors
    ///
    /// If there are no bootstraps, if bootstrap shapes differ from the data, if the model cannot
    /// be computed near the parameters, or if some information matrix is singular.
    pub fn godambe(
        &self,
        params: &[f64],
        bootstraps: &[Masked<Counts>],
        eps: f64,
    ) -> Result<Vec<f64>, UncertError> {
        if bootstraps.is_empty() {
            return Err(UncertError::NoBootstraps);
        }
        if let Some(bootstrap) = bootstraps.iter().find(|b| b.shape() != self.data.shape()) {
            return Err(UncertError::Shape {
                data: self.data.shape().clone(),
                bootstrap: bootstrap.shape().clone(),
            });
        }

        let (point, stencils) = self.point(params, eps)?;
        let h = -self.hessian(&point, &stencils, self.data)?;

        let n = point.len();
        let mut j = DMatrix::<f64>::zeros(n, n);
        for (i, bootstrap) in bootstraps.iter().enumerate() {
            let bootstrap = self
                .data
                .mask_like(bootstrap.spectrum().clone())
                .map_err(|_| UncertError::Shape {
                    data: self.data.shape().clone(),
                    bootstrap: bootstrap.shape().clone(),
                })?;

            let score = self.gradient(&point, &stencils, &bootstrap)?;
            j += &score * score.transpose();

            log::debug!("Computed score of bootstrap {}/{}", i + 1, bootstraps.len());
        }
        j /= bootstraps.len() as f64;

        let j_inverse = j.try_inverse().ok_or(UncertError::Singular)?;
        let g = &h * j_inverse * &h;
        let covariance = g.try_inverse().ok_or(UncertError::Singular)?;

        Ok(standard_deviations(&covariance))
    }

    fn gradient(
        &self,
        point: &[f64],
        stencils: &[Stencil],
        data: &Masked<Counts>,
    ) -> Result<DVector<f64>, UncertError> {
        gradient(|x| self.ll(x, data), point, stencils)
    }

    fn hessian(
        &self,
        point: &[f64],
        stencils: &[Stencil],
        data: &Masked<Counts>,
    ) -> Result<DMatrix<f64>, UncertError> {
        hessian(|x| self.ll(x, data), point, stencils)
    }

    /// Returns the log-likelihood of the data at coordinates with θ appended.
    fn ll(&self, coordinates: &[f64], data: &Masked<Counts>) -> Result<f64, UncertError> {
        let params = self.parameters(coordinates);

        let Some((&theta, params)) = params.split_last() else {
            return Err(UncertError::Inference(InferenceError::ParameterCount {
                expected: self.model.parameter_names().len() + 1,
                found: 0,
            }));
        };
        let model = self.expected(params)?.scaled(theta);

        Ok(poisson_ll(&model, data))
    }

    /// Creates a new uncertainty estimation for a model and data.
    ///
    /// # Errors
    ///
    /// If the data do not have the dimensions of the model.
    pub fn new(
        model: &'a M,
        data: &'a Masked<Counts>,
        grid_sizes: Vec<usize>,
    ) -> Result<Self, UncertError> {
        if data.dimensions() != model.dimensions() {
            return Err(InferenceError::Dimensions {
                model: model.dimensions(),
                data: data.dimensions(),
            }
            .into());
        }

        Ok(Self {
            model,
            data,
            grid_sizes,
            log: false,
            cache: RefCell::new(HashMap::new()),
        })
    }

    /// Returns the parameters with θ appended at coordinates.
    fn parameters(&self, coordinates: &[f64]) -> Vec<f64> {
        if self.log {
            coordinates.iter().map(|x| x.exp()).collect()
        } else {
            coordinates.to_vec()
        }
    }

    /// Returns true if the model accepts the parameters at coordinates, and θ is positive.
    fn is_valid(&self, coordinates: &[f64]) -> bool {
        match self.parameters(coordinates).split_last() {
            Some((&theta, params)) => {
                theta > 0.0 && self.model.check_parameters(params).is_ok()
            }
            None => false,
        }
    }

    /// Returns the point at which derivatives are taken, and the finite difference stencils.
    ///
    /// Coordinates are differenced to one side where a central step would leave the parameter
    /// values accepted by the model, such as an inbreeding coefficient of one.
    fn point(&self, params: &[f64], eps: f64) -> Result<(Vec<f64>, Vec<Stencil>), UncertError> {
        let names = self.model.parameter_names();
        if params.len() != names.len() {
            return Err(InferenceError::ParameterCount {
                expected: names.len(),
                found: params.len(),
            }
            .into());
        }

        let theta = self.theta(params)?;
        let mut full = params.to_vec();
        full.push(theta);

        if self.log {
            if let Some((&name, &value)) = names
                .iter()
                .chain(&["theta"])
                .zip(&full)
                .find(|(_, v)| **v <= 0.0)
            {
                let e = ModelError::InvalidParameter { name, value };
                return Err(InferenceError::from(e).into());
            }
        }

        let point = self.coordinates(&full);
        let stencils = Stencil::for_point(&point, eps, |x| self.is_valid(x));

        Ok((point, stencils))
    }

    /// Returns the confidence report for each step size.
    ///
    /// If `bootstraps` is `None`, the Fisher information is used.
    ///
    /// # Errors
    ///
    /// See [`Uncertainty::godambe`] and [`Uncertainty::fim`].
    pub fn report(
        &self,
        params: &[f64],
        bootstraps: Option<&[Masked<Counts>]>,
        steps: &[f64],
    ) -> Result<Vec<Report>, UncertError> {
        let theta = self.theta(params)?;

        steps
            .iter()
            .map(|&eps| {
                let sigma = match bootstraps {
                    Some(bootstraps) => self.godambe(params, bootstraps, eps)?,
                    None => self.fim(params, eps)?,
                };
                log::info!("Computed uncertainties with step size {eps}: {sigma:?}");

                let names = self
                    .model
                    .parameter_names()
                    .iter()
                    .map(|name| name.to_string())
                    .collect();

                Ok(Report {
                    eps,
                    names,
                    params: params.to_vec(),
                    theta,
                    sigma,
                    log: self.log,
                })
            })
            .collect()
    }

    /// Returns the optimal θ of the model at the parameters.
    ///
    /// # Errors
    ///
    /// If the model cannot be computed.
    pub fn theta(&self, params: &[f64]) -> Result<f64, UncertError> {
        Ok(optimal_sfs_scaling(&self.expected(params)?, self.data))
    }

    /// Sets whether derivatives are taken with respect to the logarithm of parameters.
    ///
    /// With log parameters, confidence intervals are multiplicative.
    pub fn with_log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }
}

fn standard_deviations(covariance: &DMatrix<f64>) -> Vec<f64> {
    covariance.diagonal().iter().map(|v| v.sqrt()).collect()
}

/// The uncertainties at a single step size.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    /// The finite difference step size.
    pub eps: f64,
    /// The parameter names.
    pub names: Vec<String>,
    /// The parameters.
    pub params: Vec<f64>,
    /// The optimal θ at the parameters.
    pub theta: f64,
    /// The standard deviations of the parameters followed by that of θ.
    pub sigma: Vec<f64>,
    /// Whether standard deviations are on the log scale.
    pub log: bool,
}

impl Report {
    /// Returns the 95% half-widths of the parameters, excluding θ.
    pub fn half_widths(&self) -> Vec<f64> {
        self.sigma[..self.params.len()]
            .iter()
            .map(|sigma| Z_95 * sigma)
            .collect()
    }

    /// Returns the lower and upper 95% confidence bounds of the parameters, excluding θ.
    ///
    /// On the log scale, bounds are transformed back to the parameter scale.
    pub fn intervals(&self) -> Vec<(f64, f64)> {
        self.params
            .iter()
            .zip(self.half_widths())
            .map(|(&p, w)| {
                if self.log {
                    (p * (-w).exp(), p * w.exp())
                } else {
                    (p - w, p + w)
                }
            })
            .collect()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = if self.log { "log" } else { "linear" };
        writeln!(f, "# step size {} ({scale} parameters)", self.eps)?;
        if self.log {
            writeln!(f, "# intervals are value * exp(-/+ {Z_95} * sd), sd on the log scale")?;
        } else {
            writeln!(f, "# intervals are value -/+ {Z_95} * sd")?;
        }
        writeln!(f, "parameter\tvalue\tsd\thalf_width\tlower\tupper")?;

        for (((name, p), sigma), (w, (lower, upper))) in self
            .names
            .iter()
            .zip(&self.params)
            .zip(&self.sigma)
            .zip(self.half_widths().into_iter().zip(self.intervals()))
        {
            writeln!(f, "{name}\t{p}\t{sigma}\t{w}\t{lower}\t{upper}")?;
        }

        let theta_sigma = self.sigma.last().copied().unwrap_or(f64::NAN);
        write!(f, "theta\t{}\t{theta_sigma}\t\t\t", self.theta)
    }
}

/// An error associated with estimating uncertainties.
#[derive(Debug)]
pub enum UncertError {
    /// Model could not be evaluated.
    Inference(InferenceError),
    /// No bootstrap spectra were provided.
    NoBootstraps,
    /// Bootstrap spectrum does not have the shape of the data.
    Shape {
        /// The shape of the data.
        data: Shape,
        /// The shape of the bootstrap.
        bootstrap: Shape,
    },
    /// Information matrix could not be inverted.
    Singular,
}

impl fmt::Display for UncertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UncertError::Inference(e) => write!(f, "{e}"),
            UncertError::NoBootstraps => f.write_str("at least one bootstrap must be provided"),
            UncertError::Shape { data, bootstrap } => write!(
                f,
                "bootstrap with shape {bootstrap} does not match data with shape {data}"
            ),
            UncertError::Singular => f.write_str("information matrix is singular"),
        }
    }
}

impl std::error::Error for UncertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UncertError::Inference(e) => Some(e),
            _ => None,
        }
    }
}

impl From<InferenceError> for UncertError {
    fn from(e: InferenceError) -> Self {
        Self::Inference(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::ModelKind;

    const GRIDS: [usize; 3] = [20, 25, 30];

    fn snm_data() -> Masked<Counts> {
        ModelKind::Snm
            .expected(&[], &[6], &GRIDS)
            .unwrap()
            .scaled(500.0)
            .into_masked()
    }

    #[test]
    fn test_fim_of_theta() {
        let data = snm_data();
        let uncertainty = Uncertainty::new(&ModelKind::Snm, &data, GRIDS.to_vec()).unwrap();

        // The second derivative of the log-likelihood in theta is minus the sum of the data
        // over theta squared
        let theta = uncertainty.theta(&[]).unwrap();
        let expected = theta / data.sum_unmasked().sqrt();

        let sigma = uncertainty.fim(&[], 1e-3).unwrap();
        assert_eq!(sigma.len(), 1);
        assert_approx_eq!(sigma[0], expected, relative = 1e-4);
    }

    #[test]
    fn test_godambe_of_theta() {
        let data = snm_data();
        let uncertainty = Uncertainty::new(&ModelKind::Snm, &data, GRIDS.to_vec()).unwrap();

        let bootstraps = [0.9, 1.1]
            .map(|f| data.spectrum().clone().scaled(f).into_masked())
            .to_vec();

        // Scores are plus or minus a tenth of the sum of the data over theta
        let theta = uncertainty.theta(&[]).unwrap();
        let sigma = uncertainty.godambe(&[], &bootstraps, 1e-3).unwrap();
        assert_approx_eq!(sigma[0], theta / 10.0, relative = 1e-3);
    }

    #[test]
    fn test_godambe_errors() {
        let data = snm_data();
        let uncertainty = Uncertainty::new(&ModelKind::Snm, &data, GRIDS.to_vec()).unwrap();

        assert!(matches!(
            uncertainty.godambe(&[], &[], 1e-2),
            Err(UncertError::NoBootstraps)
        ));

        let wrong = Scs::from_zeros(5).into_masked();
        assert!(matches!(
            uncertainty.godambe(&[], &[wrong], 1e-2),
            Err(UncertError::Shape { .. })
        ));

        assert!(matches!(
            uncertainty.fim(&[1.0], 1e-2),
            Err(UncertError::Inference(InferenceError::ParameterCount { .. }))
        ));
    }

    #[test]
    fn test_new_dimensions() {
        let data = snm_data();

        assert!(matches!(
            Uncertainty::new(&ModelKind::SplitMig, &data, GRIDS.to_vec()),
            Err(UncertError::Inference(InferenceError::Dimensions {
                model: 2,
                data: 1
            }))
        ));
    }

    #[test]
    fn test_two_epoch_report() {
        let data = ModelKind::TwoEpoch
            .expected(&[2.0, 0.2], &[8], &GRIDS)
            .unwrap()
            .scaled(10_000.0)
            .into_masked();
        let uncertainty = Uncertainty::new(&ModelKind::TwoEpoch, &data, GRIDS.to_vec()).unwrap();

        let reports = uncertainty.report(&[2.0, 0.2], None, &[1e-2, 1e-3]).unwrap();
        assert_eq!(reports.len(), 2);

        for report in reports.iter() {
            assert_eq!(report.sigma.len(), 3);
            assert!(report.sigma.iter().all(|s| s.is_finite() && *s > 0.0));

            let (lower, upper) = report.intervals()[0];
            assert_approx_eq!(upper - lower, 2.0 * Z_95 * report.sigma[0], epsilon = 1e-10);
            assert_approx_eq!(report.theta, 10_000.0, relative = 1e-8);
        }

        assert!(reports[0]
            .to_string()
            .contains("# intervals are value -/+ 1.96 * sd\n"));
    }

    #[test]
    fn test_expected_spectra_cached() {
        let data = snm_data();
        let uncertainty = Uncertainty::new(&ModelKind::TwoEpoch, &data, GRIDS.to_vec()).unwrap();

        let theta = uncertainty.theta(&[2.0, 0.2]).unwrap();
        assert_eq!(uncertainty.theta(&[2.0, 0.2]).unwrap(), theta);
        assert_eq!(uncertainty.cache.borrow().len(), 1);
    }

    #[test]
    fn test_inbreeding_at_one_differenced_backwards() {
        let params = [0.1, 1.0, 2.0, 1.0, 0.5];
        let data = ModelKind::IsoInbreeding
            .expected(&params, &[4, 4], &GRIDS)
            .unwrap()
            .scaled(10_000.0)
            .into_masked();
        let uncertainty =
            Uncertainty::new(&ModelKind::IsoInbreeding, &data, GRIDS.to_vec()).unwrap();

        let (_, stencils) = uncertainty.point(&params, 1e-3).unwrap();
        assert_eq!(stencils[3], Stencil::Backward(1e-3));
        assert!(matches!(stencils[4], Stencil::Central(_)));

        // Stepping F1 above one would be rejected by the model
        assert!(!matches!(
            uncertainty.fim(&params, 1e-3),
            Err(UncertError::Inference(_))
        ));
    }

    #[test]
    fn test_log_parameters() {
        let data = snm_data();
        let uncertainty = Uncertainty::new(&ModelKind::Snm, &data, GRIDS.to_vec())
            .unwrap()
            .with_log(true);

        // The standard deviation of log theta is the relative standard deviation of theta
        let sigma = uncertainty.fim(&[], 1e-3).unwrap();
        assert_approx_eq!(sigma[0], 1.0 / data.sum_unmasked().sqrt(), relative = 1e-3);

        let reports = uncertainty.report(&[], None, &[1e-3]).unwrap();
        assert!(reports[0].intervals().is_empty());
        let report = reports[0].to_string();
        assert!(report.starts_with("# step size 0.001 (log parameters)\n"));
        assert!(report.contains("exp(-/+ 1.96 * sd)"));
    }

    #[test]
    fn test_log_parameters_must_be_positive() {
        let data = ModelKind::TwoEpoch
            .expected(&[2.0, 0.2], &[8], &GRIDS)
            .unwrap()
            .into_masked();
        let uncertainty = Uncertainty::new(&ModelKind::TwoEpoch, &data, GRIDS.to_vec())
            .unwrap()
            .with_log(true);

        assert!(matches!(
            uncertainty.fim(&[2.0, 0.0], 1e-2),
            Err(UncertError::Inference(InferenceError::Model(
                ModelError::InvalidParameter { name: "T", .. }
            )))
        ));
    }
}
