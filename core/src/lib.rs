#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Demographic inference from allele frequency spectra.
//!
//! This serves as the core library implementation for the `demofit` CLI, but can also be used
//! as a free-standing library.
//!
//! # Overview
//!
//! Data enter as a [`Spectrum`], backed by an N-dimensional [`Array`]. A spectrum may either be
//! a *frequency* spectrum ([`Sfs`]), in which case we say that it is normalized, or it may be a
//! *count* spectrum ([`Scs`]). Spectra used for inference are [`Masked`](spectrum::Masked),
//! carrying a mask of entries to ignore along with population ids.
//!
//! Expected spectra are computed by numerically integrating the diffusion approximation to the
//! Wright-Fisher model for one or two populations (see [`model`]). Parameters are then fitted
//! by maximizing a Poisson composite likelihood (see [`inference`]), and uncertainties are
//! estimated using the Godambe information matrix over bootstrap replicates (see [`uncert`]
//! and [`bootstrap`]).
//!
//! # Example
//!
//! Compute the expected spectrum of the standard neutral model and compare it to data.
//!
//! ```
//! use demofit_core::{
//!     inference::{optimal_sfs_scaling, poisson_ll},
//!     model::{Grid, Model, ModelKind},
//!     Scs,
//! };
//!
//! let data = Scs::from_vec([0., 100., 50., 33., 25., 0.]).into_masked();
//!
//! let grids = Grid::default_sizes(&[5]);
//! let model = ModelKind::Snm.expected(&[], &[5], &grids).unwrap();
//!
//! let theta = optimal_sfs_scaling(&model, &data);
//! assert!((theta - 100.).abs() < 5.);
//!
//! let ll = poisson_ll(&model.scaled(theta), &data);
//! assert!(ll.is_finite());
//! ```

#[cfg(test)]
#[macro_use]
pub(crate) mod approx;

pub mod array;
pub use array::Array;

pub mod bootstrap;

pub mod inference;

pub mod input;
pub use input::Input;

pub mod model;

pub mod spectrum;
pub use spectrum::{Scs, Sfs, Spectrum};

pub mod uncert;

pub mod utils;
