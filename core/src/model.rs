//! Expected spectra of demographic models.
//!
//! Expected spectra are computed by integrating the density of allele frequencies forward in
//! time under the diffusion approximation (see [`integrate`]), sampling the final density
//! (see [`sample`]), and extrapolating the results of several grids to an infinitely fine grid
//! (see [`extrapolate`]).
//!
//! All models are computed with a population scaled mutation rate `theta` of one, so that
//! expected spectra must be scaled to the data before comparison.

use std::fmt;

pub mod demographics;
pub use demographics::ModelKind;

pub mod extrapolate;

pub mod grid;
pub use grid::Grid;

pub mod integrate;
pub use integrate::{Integrator, Size};

pub mod phi;
pub use phi::Phi;

pub mod sample;

use crate::Scs;

/// A demographic model.
pub trait Model {
    /// Returns the number of populations in the model.
    fn dimensions(&self) -> usize;

    /// Returns the name of the model.
    fn name(&self) -> &str;

    /// Returns the names of the model parameters, in order.
    fn parameter_names(&self) -> &[&'static str];

    /// Checks that parameters are valid for the model.
    ///
    /// By default, the number of parameters must match the parameter names, and all parameters
    /// must be finite and non-negative.
    fn check_parameters(&self, params: &[f64]) -> Result<(), ModelError> {
        let names = self.parameter_names();
        if params.len() != names.len() {
            return Err(ModelError::ParameterCount {
                expected: names.len(),
                found: params.len(),
            });
        }

        match names
            .iter()
            .zip(params)
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            Some((&name, &value)) => Err(ModelError::InvalidParameter { name, value }),
            None => Ok(()),
        }
    }

    /// Returns the inbreeding coefficients of each population, if the model has inbreeding.
    fn inbreeding(&self, _params: &[f64]) -> Option<Vec<f64>> {
        None
    }

    /// Returns the allele frequency density at the present.
    ///
    /// Only the number of parameters is checked, see [`Model::check_parameters`] for full
    /// validation.
    ///
    /// # Errors
    ///
    /// If the number of parameters does not match the model.
    fn phi(&self, params: &[f64], grid: &Grid) -> Result<Phi, ModelError>;

    /// Returns the expected spectrum on a single grid.
    ///
    /// # Errors
    ///
    /// If parameters are invalid, or if the number of sample sizes does not match the model
    /// dimensions.
    fn spectrum(
        &self,
        params: &[f64],
        sample_sizes: &[usize],
        grid: &Grid,
    ) -> Result<Scs, ModelError> {
        self.check_parameters(params)?;
        if sample_sizes.len() != self.dimensions() {
            return Err(ModelError::Dimensions {
                expected: self.dimensions(),
                found: sample_sizes.len(),
            });
        }

        let phi = self.phi(params, grid)?;
        let inbreeding = self.inbreeding(params);

        sample::spectrum(&phi, grid, sample_sizes, inbreeding.as_deref())
    }

    /// Returns the expected spectrum extrapolated from the grids with the provided sizes.
    ///
    /// # Errors
    ///
    /// If parameters are invalid, if the number of sample sizes does not match the model
    /// dimensions, or if grid sizes are too small or repeated.
    fn expected(
        &self,
        params: &[f64],
        sample_sizes: &[usize],
        grid_sizes: &[usize],
    ) -> Result<Scs, ModelError> {
        let estimates = grid_sizes
            .iter()
            .map(|&size| {
                let grid = Grid::new(size)?;
                let spectrum = self.spectrum(params, sample_sizes, &grid)?;
                Ok((grid.spacing(), spectrum))
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        log::trace!(
            "Computed {} model at parameters {params:?} on grids {grid_sizes:?}",
            self.name()
        );

        extrapolate::to_zero_spacing(&estimates)
    }
}

/// An error associated with computing expected spectra.
#[derive(Debug, PartialEq)]
pub enum ModelError {
    /// Number of sample sizes or inbreeding coefficients does not match model dimensions.
    Dimensions {
        /// The number of model dimensions.
        expected: usize,
        /// The number of provided values.
        found: usize,
    },
    /// Spectra from different grids have different shapes.
    GridShapes,
    /// Grid is too small.
    GridSize {
        /// The provided grid size.
        size: usize,
    },
    /// Grids have the same spacing.
    GridSpacings,
    /// Parameter is outside its valid range.
    InvalidParameter {
        /// The parameter name.
        name: &'static str,
        /// The parameter value.
        value: f64,
    },
    /// No grids were provided.
    NoGrids,
    /// Sample size is odd where diploid individuals are sampled.
    OddSampleSize {
        /// The sample size.
        sample_size: usize,
    },
    /// Number of parameters does not match the model.
    ParameterCount {
        /// The number of model parameters.
        expected: usize,
        /// The number of provided parameters.
        found: usize,
    },
    /// Model name is not known.
    UnknownModel {
        /// The provided name.
        name: String,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Dimensions { expected, found } => write!(
                f,
                "model has {expected} populations, but {found} values were provided"
            ),
            ModelError::GridShapes => f.write_str("model spectra differ in shape between grids"),
            ModelError::GridSize { size } => write!(
                f,
                "grid must have at least {} points, found {size}",
                Grid::MIN_SIZE
            ),
            ModelError::GridSpacings => f.write_str("grid sizes must be distinct"),
            ModelError::InvalidParameter { name, value } => {
                write!(f, "invalid value {value} for model parameter '{name}'")
            }
            ModelError::NoGrids => f.write_str("at least one grid size must be provided"),
            ModelError::OddSampleSize { sample_size } => write!(
                f,
                "sample size {sample_size} must be even for a model with inbreeding"
            ),
            ModelError::ParameterCount { expected, found } => write!(
                f,
                "model takes {expected} parameters, but {found} were provided"
            ),
            ModelError::UnknownModel { name } => write!(f, "unknown model '{name}'"),
        }
    }
}

impl std::error::Error for ModelError {}
