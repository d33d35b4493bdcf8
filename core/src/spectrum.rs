use std::{
    collections::BTreeSet,
    fmt,
    marker::PhantomData,
    ops::{AddAssign, Index, IndexMut, Range},
};

mod count;
pub use count::Count;

mod fold;

pub mod io;

pub mod mask;
pub use mask::{Mask, Masked};

pub mod project;
use project::{Projection, ProjectionError};

use crate::array::{Array, Axis, Shape, ShapeError};

mod seal {
    pub trait Sealed {}
}

/// The state of a spectrum: either normalized frequencies or unnormalized counts.
///
/// This trait is sealed and cannot be implemented outside this crate.
pub trait State: seal::Sealed {
    #[doc(hidden)]
    const NAME: &'static str;
}

/// A normalized spectrum state.
#[derive(Copy, Clone, Debug)]
pub struct Frequencies;

/// A count spectrum state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Counts;

impl seal::Sealed for Frequencies {}
impl seal::Sealed for Counts {}

impl State for Frequencies {
    const NAME: &'static str = "Sfs";
}

impl State for Counts {
    const NAME: &'static str = "Scs";
}

/// A site frequency spectrum, normalized to sum to one.
pub type Sfs = Spectrum<Frequencies>;

/// A site count spectrum.
///
/// Expected spectra from demographic models are count spectra as well: they are scaled
/// by θ rather than normalized.
pub type Scs = Spectrum<Counts>;

/// An N-dimensional allele frequency spectrum.
///
/// Entry `[i, j, ...]` holds the (possibly fractional) number of sites with `i` derived alleles
/// in the first population, `j` in the second, and so on.
#[derive(PartialEq)]
pub struct Spectrum<S: State> {
    values: Array<f64>,
    state: PhantomData<S>,
}

impl<S: State> Spectrum<S> {
    pub fn dimensions(&self) -> usize {
        self.values.dimensions()
    }

    pub fn elements(&self) -> usize {
        self.values.elements()
    }

    /// Returns the folded spectrum.
    ///
    /// Folding does not apply any masking except for the folded-out entries. Use
    /// [`Masked::fold`] to fold a spectrum while keeping an existing mask.
    pub fn fold(&self) -> Masked<S> {
        Masked::new_unchecked(self.clone(), Mask::none(self.shape().clone())).fold()
    }

    pub fn inner(&self) -> &Array<f64> {
        &self.values
    }

    /// Returns the spectrum with the default data mask, masking the two corners corresponding to
    /// sites that are monomorphic across all populations.
    pub fn into_masked(self) -> Masked<S> {
        let mask = Mask::corners(self.shape().clone());
        Masked::new_unchecked(self, mask)
    }

    pub fn into_normalized(self) -> Sfs {
        let sum = self.sum();
        let mut sfs = self.with_state::<Frequencies>();
        sfs.values.iter_mut().for_each(|x| *x /= sum);
        sfs
    }

    fn with_state<R: State>(self) -> Spectrum<R> {
        Spectrum {
            values: self.values,
            state: PhantomData,
        }
    }

    /// Returns the spectrum summed over the provided populations.
    ///
    /// At least one population must remain.
    pub fn marginalize(&self, axes: &[Axis]) -> Result<Self, MarginalizationError> {
        let dimensions = self.dimensions();

        let mut removed = BTreeSet::new();
        for &axis in axes {
            if axis.0 >= dimensions {
                return Err(MarginalizationError::AxisOutOfBounds {
                    axis: axis.0,
                    dimensions,
                });
            }
            if !removed.insert(axis) {
                return Err(MarginalizationError::DuplicateAxis { axis: axis.0 });
            }
        }
        if removed.len() >= dimensions {
            return Err(MarginalizationError::TooManyAxes {
                axes: removed.len(),
                dimensions,
            });
        }

        // Highest axis first, so that lower axes keep their position
        let values = removed
            .iter()
            .rev()
            .fold(self.values.clone(), |values, &axis| values.sum(axis));

        Ok(Self {
            values,
            state: PhantomData,
        })
    }

    /// Returns the spectrum projected down to a smaller shape.
    ///
    /// Each entry is distributed over the entries of the new spectrum according to the
    /// hypergeometric probabilities of sampling fewer chromosomes, so the total is preserved.
    pub fn project<T>(&self, to: T) -> Result<Self, ProjectionError>
    where
        T: Into<Shape>,
    {
        let projection = Projection::from_shapes(self.shape().clone(), to.into())?;

        Ok(Self {
            values: projection.project_array(&self.values),
            state: PhantomData,
        })
    }

    /// Returns the number of sampled chromosomes in each population.
    pub fn sample_sizes(&self) -> Vec<usize> {
        self.shape().sample_sizes()
    }

    pub fn shape(&self) -> &Shape {
        self.values.shape()
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }
}

impl Scs {
    /// Creates a 1-dimensional spectrum from a vector of values.
    pub fn from_vec<V>(values: V) -> Self
    where
        Vec<f64>: From<V>,
    {
        let values = Vec::from(values);
        let shape = Shape::from(values.len());
        Self::from(Array::from_parts(values, shape))
    }

    pub fn inner_mut(&mut self) -> &mut Array<f64> {
        &mut self.values
    }

    pub fn new<D, S>(data: D, shape: S) -> Result<Self, ShapeError>
    where
        Vec<f64>: From<D>,
        Shape: From<S>,
    {
        Array::new(data, shape).map(Self::from)
    }

    /// Creates a spectrum filled with the values of a range in row-major order.
    pub fn from_range<S>(range: Range<usize>, shape: S) -> Result<Self, ShapeError>
    where
        Shape: From<S>,
    {
        Array::from_iter(range.map(|v| v as f64), shape).map(Self::from)
    }

    pub fn from_zeros<S>(shape: S) -> Self
    where
        Shape: From<S>,
    {
        Self::from(Array::from_zeros(shape))
    }

    /// Returns the spectrum with every entry multiplied by `factor`.
    pub fn scaled(mut self, factor: f64) -> Self {
        self.values.iter_mut().for_each(|x| *x *= factor);
        self
    }
}

impl<S: State> Clone for Spectrum<S> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            state: PhantomData,
        }
    }
}

impl<S: State> fmt::Debug for Spectrum<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(S::NAME).field(&self.values).finish()
    }
}

/// Adds a single site with the provided derived allele count.
impl AddAssign<&Count> for Scs {
    fn add_assign(&mut self, count: &Count) {
        self[count] += 1.0;
    }
}

impl From<Array<f64>> for Scs {
    fn from(values: Array<f64>) -> Self {
        Self {
            values,
            state: PhantomData,
        }
    }
}

impl<I, S: State> Index<I> for Spectrum<S>
where
    I: AsRef<[usize]>,
{
    type Output = f64;

    fn index(&self, index: I) -> &Self::Output {
        &self.values[index]
    }
}

impl<I, S: State> IndexMut<I> for Spectrum<S>
where
    I: AsRef<[usize]>,
{
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        &mut self.values[index]
    }
}

/// An error associated with marginalizing a spectrum.
#[derive(Debug, Eq, PartialEq)]
pub enum MarginalizationError {
    /// The same population was given more than once.
    DuplicateAxis { axis: usize },
    /// The population does not exist.
    AxisOutOfBounds { axis: usize, dimensions: usize },
    /// No population would remain.
    TooManyAxes { axes: usize, dimensions: usize },
}

impl fmt::Display for MarginalizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateAxis { axis } => {
                write!(f, "population {axis} given more than once for marginalization")
            }
            Self::AxisOutOfBounds { axis, dimensions } => write!(
                f,
                "cannot marginalize population {axis} of a {dimensions}-population spectrum"
            ),
            Self::TooManyAxes { axes, dimensions } => write!(
                f,
                "cannot marginalize {axes} populations of a {dimensions}-population spectrum, \
                 since at least one must remain"
            ),
        }
    }
}

impl std::error::Error for MarginalizationError {}
