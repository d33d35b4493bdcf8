//! Derivative-free minimization using the Nelder-Mead solver from `argmin`.

use argmin::{
    core::{CostFunction, Error, Executor, State, TerminationReason, TerminationStatus},
    solver::neldermead::NelderMead,
};

/// The result of a minimization.
#[derive(Clone, Debug, PartialEq)]
pub struct Minimum {
    /// The best point found.
    pub x: Vec<f64>,
    /// The function value at the best point.
    pub value: f64,
    /// The number of function evaluations.
    pub evaluations: usize,
    /// The number of iterations.
    pub iterations: usize,
    /// Whether the simplex tolerance was reached before running out of iterations.
    pub converged: bool,
}

/// Settings for a simplex minimization.
#[derive(Clone, Debug, PartialEq)]
pub struct Simplex {
    max_iterations: usize,
    tolerance: f64,
}

impl Default for Simplex {
    fn default() -> Self {
        Self {
            max_iterations: 400,
            tolerance: 1e-4,
        }
    }
}

impl Simplex {
    /// Minimizes `cost` from `start`.
    ///
    /// The initial simplex consists of `start` and, for each coordinate `i`, `start` moved by
    /// `steps[i]` along that coordinate. Non-finite costs are treated as positive infinity,
    /// so a cost function may reject points by returning NaN.
    ///
    /// # Errors
    ///
    /// If the cost function fails, or if the solver cannot be set up.
    pub fn minimize<C>(&self, cost: C, start: &[f64], steps: &[f64]) -> Result<Minimum, Error>
    where
        C: CostFunction<Param = Vec<f64>, Output = f64>,
    {
        let cost = Finite(cost);

        if start.is_empty() {
            let value = cost.cost(&Vec::new())?;
            return Ok(Minimum {
                x: Vec::new(),
                value,
                evaluations: 1,
                iterations: 0,
                converged: true,
            });
        }

        let mut vertices = vec![start.to_vec()];
        vertices.extend(steps.iter().enumerate().map(|(i, step)| {
            let mut vertex = start.to_vec();
            vertex[i] += step;
            vertex
        }));

        let solver = NelderMead::new(vertices).with_sd_tolerance(self.tolerance)?;
        let result = Executor::new(cost, solver)
            .configure(|state| state.max_iters(self.max_iterations as u64))
            .run()?;

        let state = result.state();
        let evaluations = state
            .get_func_counts()
            .get("cost_count")
            .copied()
            .unwrap_or_default();

        Ok(Minimum {
            x: state.get_best_param().cloned().unwrap_or_else(|| start.to_vec()),
            value: state.get_best_cost(),
            evaluations: evaluations as usize,
            iterations: state.get_iter() as usize,
            converged: matches!(
                state.get_termination_status(),
                TerminationStatus::Terminated(TerminationReason::SolverConverged)
            ),
        })
    }

    /// Sets the maximum number of iterations, by default 400.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the tolerance on the standard deviation of costs over the simplex, by default `1e-4`.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Maps non-finite costs to positive infinity, since the solver orders vertices by cost.
struct Finite<C>(C);

impl<C> CostFunction for Finite<C>
where
    C: CostFunction<Param = Vec<f64>, Output = f64>,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        let value = self.0.cost(param)?;
        Ok(if value.is_finite() {
            value
        } else {
            f64::INFINITY
        })
    }
}
