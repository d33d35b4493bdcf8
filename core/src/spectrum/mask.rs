//! Masked spectra.
//!
//! Inference only considers entries that are not masked. Data spectra have the two corners
//! masked by default, since sites that are monomorphic in every population carry no information
//! about demography. Folded spectra additionally mask the folded-out part.

use std::fmt;

use crate::array::{Array, Shape};

use super::{project::ProjectionError, Spectrum, State};

/// A boolean mask over a spectrum, where `true` means that an entry is masked.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask(Array<bool>);

impl Mask {
    /// Returns a mask with only the corners masked.
    pub fn corners(shape: Shape) -> Self {
        let mut array = Array::from_element(false, shape);
        let data = array.as_mut_slice();
        if let Some(first) = data.first_mut() {
            *first = true;
        }
        if let Some(last) = data.last_mut() {
            *last = true;
        }
        Self(array)
    }

    /// Returns a mask with the entries removed by folding masked.
    ///
    /// These are the entries where the total allele count exceeds half the total sample size.
    pub fn folded(shape: Shape) -> Self {
        let half = shape.total_sample_size() / 2;
        let elements = shape.elements();

        let data = (0..elements)
            .map(|flat| shape.unravel_sum(flat) > half)
            .collect::<Vec<_>>();

        Self(Array::new_unchecked(data, shape))
    }

    /// Returns the inner array.
    pub fn inner(&self) -> &Array<bool> {
        &self.0
    }

    /// Returns a mask from a boolean array.
    pub fn new(array: Array<bool>) -> Self {
        Self(array)
    }

    /// Returns a mask with no entries masked.
    pub fn none(shape: Shape) -> Self {
        Self(Array::from_element(false, shape))
    }

    /// Returns the number of masked entries.
    pub fn number_masked(&self) -> usize {
        self.0.iter().filter(|&&x| x).count()
    }

    /// Returns the mask reversed along every axis.
    pub fn reversed(&self) -> Self {
        Self(self.0.reversed())
    }

    pub fn shape(&self) -> &Shape {
        self.0.shape()
    }

    /// Returns the union of two masks of the same shape.
    pub fn union(&self, other: &Self) -> Self {
        let data = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(&a, &b)| a || b)
            .collect::<Vec<_>>();

        Self(Array::new_unchecked(data, self.shape().clone()))
    }
}

/// A spectrum with a mask, along with metadata about folding and population names.
#[derive(Debug, PartialEq)]
pub struct Masked<S: State> {
    pub(super) spectrum: Spectrum<S>,
    pub(super) mask: Mask,
    pub(super) folded: bool,
    pub(super) populations: Option<Vec<String>>,
}

impl<S: State> Masked<S> {
    /// Returns the number of dimensions.
    pub fn dimensions(&self) -> usize {
        self.spectrum.dimensions()
    }

    /// Returns the spectrum and mask, discarding metadata.
    pub fn into_parts(self) -> (Spectrum<S>, Mask) {
        (self.spectrum, self.mask)
    }

    /// Returns true if the spectrum is folded.
    pub fn is_folded(&self) -> bool {
        self.folded
    }

    /// Returns an iterator over `(flat index, value)` for every entry that is not masked.
    pub fn iter_unmasked(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.spectrum
            .inner()
            .iter()
            .zip(self.mask.0.iter())
            .enumerate()
            .filter_map(|(i, (&v, &masked))| (!masked).then_some((i, v)))
    }

    /// Returns a copy with every unmasked entry replaced by `f(flat index, value)`, and every
    /// masked entry set to zero.
    pub(crate) fn map_unmasked<F>(&self, mut f: F) -> Self
    where
        F: FnMut(usize, f64) -> f64,
    {
        let mut mapped = self.clone();
        mapped
            .spectrum
            .values
            .iter_mut()
            .zip(self.mask.0.iter())
            .enumerate()
            .for_each(|(i, (x, &masked))| *x = if masked { 0.0 } else { f(i, *x) });
        mapped
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Returns another spectrum of the same shape with the mask, folding, and populations of
    /// this spectrum.
    ///
    /// # Errors
    ///
    /// If the spectrum shapes differ.
    pub fn mask_like<T: State>(&self, spectrum: Spectrum<T>) -> Result<Masked<T>, MaskError> {
        Masked::new(spectrum, self.mask.clone()).map(|mut masked| {
            masked.folded = self.folded;
            masked.populations = self.populations.clone();
            masked
        })
    }

    /// Creates a masked spectrum.
    ///
    /// # Errors
    ///
    /// If the mask and spectrum shapes differ.
    pub fn new(spectrum: Spectrum<S>, mask: Mask) -> Result<Self, MaskError> {
        if spectrum.shape() == mask.shape() {
            Ok(Self::new_unchecked(spectrum, mask))
        } else {
            Err(MaskError {
                spectrum: spectrum.shape().clone(),
                mask: mask.shape().clone(),
            })
        }
    }

    pub(crate) fn new_unchecked(spectrum: Spectrum<S>, mask: Mask) -> Self {
        Self {
            spectrum,
            mask,
            folded: false,
            populations: None,
        }
    }

    /// Returns the population names, if known.
    pub fn populations(&self) -> Option<&[String]> {
        self.populations.as_deref()
    }

    /// Returns the spectrum projected down to a smaller shape.
    ///
    /// Masked entries are zeroed before projecting. The projected spectrum has the default
    /// corner mask, and is folded again if the original was folded.
    pub fn project<T>(&self, to: T) -> Result<Self, ProjectionError>
    where
        T: Into<Shape>,
    {
        let projected = self.spectrum.clone().with_zeroed(&self.mask).project(to)?;

        let mut masked = projected.into_masked();
        masked.populations = self.populations.clone();

        Ok(if self.folded { masked.fold() } else { masked })
    }

    pub fn shape(&self) -> &Shape {
        self.spectrum.shape()
    }

    pub fn spectrum(&self) -> &Spectrum<S> {
        &self.spectrum
    }

    /// Returns the sum of unmasked entries.
    pub fn sum_unmasked(&self) -> f64 {
        self.iter_unmasked().map(|(_, v)| v).sum()
    }

    /// Sets the population names.
    pub fn with_populations(mut self, populations: Option<Vec<String>>) -> Self {
        self.populations = populations;
        self
    }
}

impl<S: State> Spectrum<S> {
    fn with_zeroed(mut self, mask: &Mask) -> Self {
        self.values
            .iter_mut()
            .zip(mask.0.iter())
            .filter(|(_, masked)| **masked)
            .for_each(|(x, _)| *x = 0.0);
        self
    }
}

impl<S: State> Clone for Masked<S> {
    fn clone(&self) -> Self {
        Self {
            spectrum: self.spectrum.clone(),
            mask: self.mask.clone(),
            folded: self.folded,
            populations: self.populations.clone(),
        }
    }
}

/// An error associated with a mask and spectrum of different shapes.
#[derive(Debug)]
pub struct MaskError {
    spectrum: Shape,
    mask: Shape,
}

impl fmt::Display for MaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let MaskError { spectrum, mask } = self;
        write!(
            f,
            "mask with shape {mask} does not match spectrum with shape {spectrum}"
        )
    }
}

impl std::error::Error for MaskError {}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::spectrum::Scs;

    #[test]
    fn test_corners() {
        let mask = Mask::corners(Shape(vec![2, 3]));
        assert_eq!(
            mask.inner().as_slice(),
            &[true, false, false, false, false, true]
        );
    }

    #[test]
    fn test_folded_2x3() {
        // Total sample size is 3, so entries with allele count 2 or 3 are folded out
        let mask = Mask::folded(Shape(vec![2, 3]));
        assert_eq!(
            mask.inner().as_slice(),
            &[false, false, true, false, true, true]
        );
    }

    #[test]
    fn test_iter_unmasked_skips_corners() {
        let masked = Scs::from_range(0..4, 4).unwrap().into_masked();
        assert_eq!(
            masked.iter_unmasked().collect::<Vec<_>>(),
            vec![(1, 1.), (2, 2.)]
        );
        assert_eq!(masked.sum_unmasked(), 3.);
    }

    #[test]
    fn test_new_shape_mismatch() {
        let scs = Scs::from_zeros([3, 3]);
        assert!(Masked::new(scs, Mask::none(Shape(vec![3, 2]))).is_err());
    }

    #[test]
    fn test_project_zeroes_masked_entries() {
        let scs = Scs::new([100., 1., 1., 1., 100.], 5).unwrap();
        let projected = scs.into_masked().project(3).unwrap();

        assert_approx_eq!(projected.spectrum().sum(), 3.0, epsilon = 1e-12);
        assert_eq!(projected.mask(), &Mask::corners(Shape(vec![3])));
    }

    #[test]
    fn test_union() {
        let a = Mask::corners(Shape(vec![3]));
        let b = Mask::folded(Shape(vec![3]));
        assert_eq!(b.inner().as_slice(), &[false, false, true]);
        assert_eq!(a.union(&b).inner().as_slice(), &[true, false, true]);
        assert_eq!(a.union(&b).number_masked(), 2);
    }

    #[test]
    fn test_mask_like() {
        let data = Scs::from_vec([0., 5., 3., 1., 0.])
            .fold()
            .with_populations(Some(vec![String::from("A")]));
        let model = data.mask_like(Scs::from_vec([1., 2., 3., 4., 5.])).unwrap();

        assert!(model.is_folded());
        assert_eq!(model.mask(), data.mask());
        assert_eq!(model.populations(), Some(&[String::from("A")][..]));
        assert!(data.mask_like(Scs::from_vec([1., 2.])).is_err());
    }
}
