//! Fitting demographic models to data.

use argmin::core::{CostFunction, Error as ArgminError};
use rand::Rng;

use crate::{
    model::{Model, ModelError},
    spectrum::{Counts, Masked},
    Scs,
};

use super::{
    likelihood::{aic, align, chi_squared, optimal_sfs_scaling, poisson_ll},
    optimize::Simplex,
    params::{perturb_params, Bounds},
    InferenceError,
};

/// A model evaluated against data.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    /// The model parameters.
    pub params: Vec<f64>,
    /// The composite log-likelihood of the data.
    pub ll: f64,
    /// The optimal scaling of the model to the data.
    pub theta: f64,
    /// Pearson's chi-squared statistic.
    pub chi_squared: f64,
    /// The Akaike information criterion.
    pub aic: f64,
    /// The expected spectrum aligned and scaled to the data.
    pub model: Scs,
}

/// The result of an optimization.
#[derive(Clone, Debug, PartialEq)]
pub struct Replicate {
    /// The optimized parameters.
    pub params: Vec<f64>,
    /// The composite log-likelihood of the data at the optimized parameters.
    pub ll: f64,
    /// The optimal scaling of the model to the data.
    pub theta: f64,
    /// Pearson's chi-squared statistic.
    pub chi_squared: f64,
    /// The Akaike information criterion.
    pub aic: f64,
    /// The number of model evaluations used.
    pub evaluations: usize,
    /// Whether the optimizer converged.
    pub converged: bool,
}

impl Replicate {
    /// Returns the replicate with the highest log-likelihood, ignoring non-finite values.
    pub fn best(replicates: &[Self]) -> Option<&Self> {
        replicates
            .iter()
            .filter(|replicate| replicate.ll.is_finite())
            .max_by(|a, b| a.ll.total_cmp(&b.ll))
    }
}

/// A round of optimization replicates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Round {
    /// The number of replicates.
    pub replicates: usize,
    /// The maximum number of optimizer iterations in each replicate.
    pub max_iterations: usize,
    /// The fold used to perturb starting parameters.
    pub fold: f64,
}

impl Round {
    /// Returns the default rounds.
    ///
    /// These are three rounds with 20, 30, and 50 replicates, at most 5, 10, and 20 iterations,
    /// and folds 3, 2, and 1.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(20, 5, 3.0),
            Self::new(30, 10, 2.0),
            Self::new(50, 20, 1.0),
        ]
    }

    /// Creates a new round.
    pub fn new(replicates: usize, max_iterations: usize, fold: f64) -> Self {
        Self {
            replicates,
            max_iterations,
            fold,
        }
    }
}

/// Fitting of a model to data.
#[derive(Debug)]
pub struct Fit<'a, M: ?Sized> {
    model: &'a M,
    data: &'a Masked<Counts>,
    grid_sizes: Vec<usize>,
    bounds: Bounds,
    max_iterations: usize,
}

impl<'a, M> Fit<'a, M>
where
    M: Model + ?Sized,
{
    /// Returns the bounds.
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Returns the model evaluated against the data.
    ///
    /// The expected spectrum is computed with the sample sizes of the data.
    ///
    /// # Errors
    ///
    /// If the model cannot be computed at the parameters.
    pub fn evaluate(&self, params: &[f64]) -> Result<Evaluation, InferenceError> {
        let sample_sizes = self.data.shape().sample_sizes();
        let expected = self
            .model
            .expected(params, &sample_sizes, &self.grid_sizes)?;

        let aligned = align(&expected, self.data)?;
        let theta = optimal_sfs_scaling(&aligned, self.data);
        let model = aligned.scaled(theta);
        let ll = poisson_ll(&model, self.data);

        Ok(Evaluation {
            params: params.to_vec(),
            ll,
            theta,
            chi_squared: chi_squared(&model, self.data),
            aic: aic(params.len(), ll),
            model,
        })
    }

    /// Returns the grid sizes.
    pub fn grid_sizes(&self) -> &[usize] {
        &self.grid_sizes
    }

    /// Creates a new fit.
    ///
    /// # Errors
    ///
    /// If the number of bounds does not match the model parameters, or if the data do not
    /// have the dimensions of the model.
    pub fn new(
        model: &'a M,
        data: &'a Masked<Counts>,
        grid_sizes: Vec<usize>,
        bounds: Bounds,
    ) -> Result<Self, InferenceError> {
        let parameters = model.parameter_names().len();
        if bounds.len() != parameters {
            return Err(InferenceError::ParameterCount {
                expected: parameters,
                found: bounds.len(),
            });
        }

        if data.dimensions() != model.dimensions() {
            return Err(InferenceError::Dimensions {
                model: model.dimensions(),
                data: data.dimensions(),
            });
        }

        Ok(Self {
            model,
            data,
            grid_sizes,
            bounds,
            max_iterations: 400,
        })
    }

    /// Optimizes the parameters from a starting point.
    ///
    /// Starting parameters are clamped to the bounds.
    ///
    /// # Errors
    ///
    /// If the number of starting parameters does not match the model, or if the model cannot
    /// be computed.
    pub fn optimize(&self, start: &[f64]) -> Result<Replicate, InferenceError> {
        self.optimize_with(start, None)
    }

    fn optimize_with(
        &self,
        start: &[f64],
        max_iterations: Option<usize>,
    ) -> Result<Replicate, InferenceError> {
        if start.len() != self.bounds.len() {
            return Err(InferenceError::ParameterCount {
                expected: self.bounds.len(),
                found: start.len(),
            });
        }

        let internal = self.bounds.to_internal(start);
        let steps = self.bounds.initial_steps(&internal);

        let minimum = Simplex::default()
            .with_max_iterations(max_iterations.unwrap_or(self.max_iterations))
            .minimize(Objective { fit: self }, &internal, &steps)
            .map_err(|e| match e.downcast::<InferenceError>() {
                Ok(e) => e,
                Err(e) => InferenceError::Optimization(e.to_string()),
            })?;

        let params = self.bounds.from_internal(&minimum.x);
        let evaluation = self.evaluate(&params)?;

        log::debug!(
            "Optimized {} to log-likelihood {:.4} at {params:?} in {} evaluations",
            self.model.name(),
            evaluation.ll,
            minimum.evaluations,
        );

        Ok(Replicate {
            params,
            ll: evaluation.ll,
            theta: evaluation.theta,
            chi_squared: evaluation.chi_squared,
            aic: evaluation.aic,
            evaluations: minimum.evaluations,
            converged: minimum.converged,
        })
    }

    /// Optimizes from randomly perturbed starting parameters a number of times.
    ///
    /// See [`perturb_params`] for details on perturbation.
    ///
    /// # Errors
    ///
    /// If any optimization fails.
    pub fn replicates<R>(
        &self,
        start: &[f64],
        replicates: usize,
        fold: f64,
        rng: &mut R,
    ) -> Result<Vec<Replicate>, InferenceError>
    where
        R: Rng,
    {
        self.replicates_with(start, replicates, fold, None, rng)
    }

    fn replicates_with<R>(
        &self,
        start: &[f64],
        replicates: usize,
        fold: f64,
        max_iterations: Option<usize>,
        rng: &mut R,
    ) -> Result<Vec<Replicate>, InferenceError>
    where
        R: Rng,
    {
        (0..replicates)
            .map(|i| {
                let perturbed = perturb_params(start, fold, &self.bounds, rng);
                log::info!("Replicate {}/{replicates} starting from {perturbed:?}", i + 1);
                self.optimize_with(&perturbed, max_iterations)
            })
            .collect()
    }

    /// Optimizes through successive rounds of replicates.
    ///
    /// The first round perturbs the starting parameters, and later rounds perturb the best
    /// parameters found in any previous round. Returns the replicates of each round.
    ///
    /// # Errors
    ///
    /// If any optimization fails.
    pub fn rounds<R>(
        &self,
        start: &[f64],
        rounds: &[Round],
        rng: &mut R,
    ) -> Result<Vec<Vec<Replicate>>, InferenceError>
    where
        R: Rng,
    {
        let mut best: Option<Replicate> = None;
        let mut results = Vec::with_capacity(rounds.len());

        for (i, round) in rounds.iter().enumerate() {
            let from = best.as_ref().map_or(start, |best| best.params.as_slice());

            let replicates = self.replicates_with(
                from,
                round.replicates,
                round.fold,
                Some(round.max_iterations),
                rng,
            )?;

            if let Some(round_best) = Replicate::best(&replicates) {
                if best.as_ref().map_or(true, |best| round_best.ll > best.ll) {
                    best = Some(round_best.clone());
                }
            }

            log::info!(
                "Round {}/{}: best log-likelihood so far {:?}",
                i + 1,
                rounds.len(),
                best.as_ref().map(|best| best.ll)
            );

            results.push(replicates);
        }

        Ok(results)
    }

    /// Sets the maximum number of optimizer iterations in each optimization, by default 400.
    ///
    /// Rounds use their own limit instead.
    pub fn set_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// The negative log-likelihood at a point in the internal parameter space of the bounds.
///
/// Parameters the model rejects have an infinite cost.
struct Objective<'a, 'b, M: ?Sized> {
    fit: &'b Fit<'a, M>,
}

impl<'a, 'b, M> CostFunction for Objective<'a, 'b, M>
where
    M: Model + ?Sized,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, internal: &Self::Param) -> Result<Self::Output, ArgminError> {
        let params = self.fit.bounds.from_internal(internal);

        match self.fit.evaluate(&params) {
            Ok(evaluation) => Ok(-evaluation.ll),
            Err(InferenceError::Model(ModelError::InvalidParameter { .. })) => Ok(f64::INFINITY),
            Err(e) => Err(ArgminError::new(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{rngs::StdRng, SeedableRng};

    use crate::model::ModelKind;

    const GRIDS: [usize; 3] = [20, 25, 30];

    fn simulated_data() -> Masked<Counts> {
        ModelKind::TwoEpoch
            .expected(&[2.0, 0.1], &[8], &GRIDS)
            .unwrap()
            .scaled(1000.0)
            .into_masked()
    }

    fn bounds() -> Bounds {
        Bounds::new(vec![1e-2, 1e-3], vec![100.0, 3.0]).unwrap()
    }

    #[test]
    fn test_new_errors() {
        let data = simulated_data();

        assert!(matches!(
            Fit::new(&ModelKind::TwoEpoch, &data, GRIDS.to_vec(), Bounds::unbounded(3)),
            Err(InferenceError::ParameterCount {
                expected: 2,
                found: 3
            })
        ));
        assert!(matches!(
            Fit::new(&ModelKind::SplitMig, &data, GRIDS.to_vec(), Bounds::unbounded(4)),
            Err(InferenceError::Dimensions { model: 2, data: 1 })
        ));
    }

    #[test]
    fn test_evaluate_at_truth() {
        let data = simulated_data();
        let fit = Fit::new(&ModelKind::TwoEpoch, &data, GRIDS.to_vec(), bounds()).unwrap();

        let evaluation = fit.evaluate(&[2.0, 0.1]).unwrap();
        assert_approx_eq!(evaluation.theta, 1000.0, epsilon = 1e-6);
        assert_approx_eq!(evaluation.chi_squared, 0.0, epsilon = 1e-10);
        assert_approx_eq!(evaluation.aic, 4.0 - 2.0 * evaluation.ll, epsilon = 1e-10);

        let worse = fit.evaluate(&[0.5, 0.5]).unwrap();
        assert!(worse.ll < evaluation.ll);
    }

    #[test]
    fn test_optimize_improves_and_stays_in_bounds() {
        let data = simulated_data();
        let fit = Fit::new(&ModelKind::TwoEpoch, &data, GRIDS.to_vec(), bounds())
            .unwrap()
            .set_max_iterations(20);

        let start = [1.0, 0.3];
        let initial = fit.evaluate(&start).unwrap();
        let replicate = fit.optimize(&start).unwrap();

        assert!(replicate.ll >= initial.ll);
        assert!(fit.bounds().contains(&replicate.params));
        assert!(replicate.evaluations > 0);
    }

    #[test]
    fn test_optimize_without_parameters() {
        let data = simulated_data();
        let fit = Fit::new(&ModelKind::Snm, &data, GRIDS.to_vec(), Bounds::unbounded(0)).unwrap();

        let replicate = fit.optimize(&[]).unwrap();
        assert!(replicate.params.is_empty());
        assert_eq!(replicate.evaluations, 1);
    }

    #[test]
    fn test_rounds() {
        let data = simulated_data();
        let fit = Fit::new(&ModelKind::TwoEpoch, &data, GRIDS.to_vec(), bounds()).unwrap();
        let mut rng = StdRng::seed_from_u64(1762);

        let rounds = [Round::new(2, 2, 1.0), Round::new(1, 2, 0.5)];
        let results = fit.rounds(&[1.0, 0.3], &rounds, &mut rng).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].len(), 2);
        assert_eq!(results[1].len(), 1);
        for replicate in results.iter().flatten() {
            assert!(fit.bounds().contains(&replicate.params));
        }
    }

    #[test]
    fn test_best_replicate() {
        let replicate = |ll| Replicate {
            params: vec![],
            ll,
            theta: 1.0,
            chi_squared: 0.0,
            aic: 0.0,
            evaluations: 1,
            converged: true,
        };
        let replicates = [replicate(-10.0), replicate(f64::NAN), replicate(-5.0)];

        assert_eq!(Replicate::best(&replicates).map(|r| r.ll), Some(-5.0));
        assert_eq!(Replicate::best(&[]), None);
    }

    #[test]
    fn test_default_rounds() {
        let rounds = Round::defaults();
        assert_eq!(rounds.len(), 3);
        assert_eq!(rounds[2], Round::new(50, 20, 1.0));
    }
}
