//! Fitting demographic models to data.
//!
//! Data are compared to expected spectra using a composite Poisson likelihood, where the
//! expected spectrum is scaled optimally to the data (see [`likelihood`]). Parameters are
//! optimized within [`Bounds`] by the Nelder-Mead simplex method (see [`optimize`]), usually
//! from several perturbed starting points in successive rounds (see [`Fit::rounds`]).

use std::fmt;

pub mod fit;
pub use fit::{Evaluation, Fit, Replicate, Round};

pub mod likelihood;
pub use likelihood::{
    aic, align, anscombe_residuals, chi_squared, ll_multinom, optimal_sfs_scaling, poisson_ll,
};

pub mod optimize;

pub mod params;
pub use params::{perturb_params, Bounds};

use crate::{model::ModelError, spectrum::project::ProjectionError};

/// An error associated with fitting models.
#[derive(Debug, PartialEq)]
pub enum InferenceError {
    /// Lower and upper bounds differ in length.
    BoundsLength {
        /// The number of lower bounds.
        lower: usize,
        /// The number of upper bounds.
        upper: usize,
    },
    /// Lower bound is NaN or exceeds upper bound.
    InvalidBounds {
        /// The parameter index.
        index: usize,
        /// The lower bound.
        lower: f64,
        /// The upper bound.
        upper: f64,
    },
    /// Data do not have the dimensions of the model.
    Dimensions {
        /// The number of model populations.
        model: usize,
        /// The number of data populations.
        data: usize,
    },
    /// Number of parameters or bounds does not match the model.
    ParameterCount {
        /// The number of model parameters.
        expected: usize,
        /// The number of provided values.
        found: usize,
    },
    /// Model could not be computed.
    Model(ModelError),
    /// The optimizer failed for a reason other than the model.
    Optimization(String),
    /// Model could not be projected to the data.
    Projection(ProjectionError),
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceError::BoundsLength { lower, upper } => write!(
                f,
                "found {lower} lower bounds and {upper} upper bounds, but these must match"
            ),
            InferenceError::InvalidBounds {
                index,
                lower,
                upper,
            } => write!(
                f,
                "invalid bounds [{lower}, {upper}] for parameter at index {index}"
            ),
            InferenceError::Dimensions { model, data } => write!(
                f,
                "model has {model} populations, but data has {data} populations"
            ),
            InferenceError::ParameterCount { expected, found } => write!(
                f,
                "model takes {expected} parameters, but {found} were provided"
            ),
            InferenceError::Model(e) => write!(f, "{e}"),
            InferenceError::Optimization(e) => write!(f, "optimization failed: {e}"),
            InferenceError::Projection(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for InferenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InferenceError::Model(e) => Some(e),
            InferenceError::Projection(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ModelError> for InferenceError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<ProjectionError> for InferenceError {
    fn from(e: ProjectionError) -> Self {
        Self::Projection(e)
    }
}
