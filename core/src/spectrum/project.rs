//! Hypergeometric projection of allele counts to smaller sample sizes.
//!
//! Drawing `m` out of `n` chromosomes, of which `k` carry the derived allele, gives a
//! hypergeometric number of derived alleles in the smaller sample. Populations are sampled
//! independently, so projecting a multi-dimensional count gives the outer product of the
//! one-dimensional probabilities.

use std::{collections::HashMap, fmt};

use crate::{
    array::{Array, Axis, Shape},
    utils::hypergeometric_pmf,
};

use super::{Count, Scs};

/// Cached hypergeometric probabilities for projecting a single population to a fixed size.
#[derive(Clone, Debug, PartialEq)]
struct Weights {
    to: usize,
    cache: HashMap<(usize, usize), Vec<f64>>,
}

impl Weights {
    fn new(to: usize) -> Self {
        Self {
            to,
            cache: HashMap::new(),
        }
    }

    fn fill(&mut self, from: usize, derived: usize) {
        let to = self.to;

        self.cache.entry((from, derived)).or_insert_with(|| {
            (0..=to)
                .map(|k| hypergeometric_pmf(from as u64, derived as u64, to as u64, k as u64))
                .collect()
        });
    }

    /// Returns the probabilities of observing `0..=to` derived alleles.
    ///
    /// Must be preceded by a call to `fill` with the same arguments.
    fn get(&self, from: usize, derived: usize) -> &[f64] {
        &self.cache[&(from, derived)]
    }

    fn get_or_fill(&mut self, from: usize, derived: usize) -> &[f64] {
        self.fill(from, derived);
        self.get(from, derived)
    }
}

/// A projection to fixed sample sizes from sample sizes that may vary between sites.
///
/// The number of called chromosomes differs between sites due to missing genotypes, so each
/// site is projected from its own totals.
#[derive(Clone, Debug, PartialEq)]
pub struct PartialProjection {
    weights: Vec<Weights>,
}

impl PartialProjection {
    /// Creates a new projection to the provided sample sizes.
    pub fn new_unchecked<C>(project_to: C) -> Self
    where
        C: Into<Count>,
    {
        Self {
            weights: project_to.into().iter().map(|&to| Weights::new(to)).collect(),
        }
    }

    /// Projects the derived allele count `from` out of a total of `project_from` chromosomes.
    ///
    /// The caller must ensure that `project_from` is at least the projection size in every
    /// population, and that both counts have the dimensions of the projection.
    pub fn project_unchecked(&mut self, project_from: &Count, from: &Count) -> Projected<'_> {
        for ((weights, &n), &k) in self.weights.iter_mut().zip(project_from.iter()).zip(from.iter())
        {
            weights.fill(n, k);
        }

        let factors = self
            .weights
            .iter()
            .zip(project_from.iter().zip(from.iter()))
            .map(|(weights, (&n, &k))| weights.get(n, k))
            .collect();

        Projected {
            factors,
            weight: 1.0,
        }
    }
}

/// A projection between two fixed sample sizes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Projection {
    project_from: Count,
    project_to: Count,
}

impl Projection {
    /// Returns a projection between the sample sizes of two spectrum shapes.
    pub fn from_shapes<S>(from: S, to: S) -> Result<Self, ProjectionError>
    where
        S: Into<Shape>,
    {
        match (
            Count::try_from_shape(from.into()),
            Count::try_from_shape(to.into()),
        ) {
            (Some(from), Some(to)) => Self::new(from, to),
            _ => Err(ProjectionError::Empty),
        }
    }

    /// Returns a projection between sample sizes, checking that no population is projected up.
    pub fn new<C>(from: C, to: C) -> Result<Self, ProjectionError>
    where
        C: Into<Count>,
    {
        let (from, to) = (from.into(), to.into());

        if from.dimensions() == 0 {
            return Err(ProjectionError::Empty);
        }
        if from.dimensions() != to.dimensions() {
            return Err(ProjectionError::UnequalDimensions {
                from: from.dimensions(),
                to: to.dimensions(),
            });
        }
        match from.iter().zip(to.iter()).position(|(n, m)| n < m) {
            Some(dimension) => Err(ProjectionError::InvalidProjection {
                dimension,
                from: from[dimension],
                to: to[dimension],
            }),
            None => Ok(Self {
                project_from: from,
                project_to: to,
            }),
        }
    }

    /// Projects an array of the source shape one population at a time.
    pub(crate) fn project_array(&self, array: &Array<f64>) -> Array<f64> {
        self.project_from
            .iter()
            .zip(self.project_to.iter())
            .enumerate()
            .fold(array.clone(), |array, (axis, (&from, &to))| {
                if from == to {
                    array
                } else {
                    project_axis(&array, Axis(axis), from, to)
                }
            })
    }
}

fn project_axis(array: &Array<f64>, axis: Axis, from: usize, to: usize) -> Array<f64> {
    let mut weights = Weights::new(to);

    let mut shape = array.shape().clone();
    shape.0[*axis] = to + 1;
    let mut projected = Array::from_zeros(shape);

    for (mut index, &value) in array.iter_indices().zip(array.iter()) {
        if value == 0.0 {
            continue;
        }

        let derived = index[*axis];
        for (k, p) in weights.get_or_fill(from, derived).iter().enumerate() {
            index[*axis] = k;
            projected[&index] += value * p;
        }
    }

    projected
}

/// The projection of a single allele count, as one probability vector per population.
#[derive(Debug)]
pub struct Projected<'a> {
    factors: Vec<&'a [f64]>,
    weight: f64,
}

impl<'a> Projected<'a> {
    /// Adds the weighted outer product of the probabilities onto a spectrum of the projected
    /// shape.
    pub fn add_unchecked(self, to: &mut Scs) {
        let outer = self.factors.iter().fold(vec![self.weight], |outer, factor| {
            outer
                .iter()
                .flat_map(|a| factor.iter().map(move |b| a * b))
                .collect()
        });

        to.inner_mut()
            .iter_mut()
            .zip(outer)
            .for_each(|(x, p)| *x += p);
    }

    /// Scales the projected probabilities.
    pub fn into_weighted(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// An error associated with projecting to a different sample size.
#[derive(Debug, Eq, PartialEq)]
pub enum ProjectionError {
    /// Projection from or to a spectrum without chromosomes.
    Empty,
    /// Projection to a larger sample size.
    InvalidProjection {
        /// The population projected up.
        dimension: usize,
        /// The sample size projected from.
        from: usize,
        /// The sample size projected to.
        to: usize,
    },
    /// Projection between different numbers of populations.
    UnequalDimensions {
        /// The populations projected from.
        from: usize,
        /// The populations projected to.
        to: usize,
    },
}

impl fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("cannot project a spectrum without chromosomes"),
            Self::InvalidProjection {
                dimension,
                from,
                to,
            } => write!(
                f,
                "cannot project population {dimension} up from {from} to {to} chromosomes"
            ),
            Self::UnequalDimensions { from, to } => write!(
                f,
                "cannot project {from} populations to {to} populations"
            ),
        }
    }
}

impl std::error::Error for ProjectionError {}
