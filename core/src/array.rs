//! N-dimensional arrays.

use std::{
    fmt,
    ops::{Index, IndexMut},
};

pub mod shape;
use shape::Strides;
pub use shape::{Axis, Shape};

/// An N-dimensional array stored contiguously in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct Array<T> {
    data: Vec<T>,
    shape: Shape,
    strides: Strides,
}

impl<T> Array<T> {
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn dimensions(&self) -> usize {
        self.shape.len()
    }

    pub fn elements(&self) -> usize {
        self.data.len()
    }

    /// Creates a new array with every element set to `element`.
    pub fn from_element<S>(element: T, shape: S) -> Self
    where
        T: Clone,
        Shape: From<S>,
    {
        let shape = Shape::from(shape);
        let data = vec![element; shape.elements()];

        Self::from_parts(data, shape)
    }

    /// Creates a new array by calling `f` with each index in row-major order.
    pub fn from_fn<S, F>(shape: S, mut f: F) -> Self
    where
        Shape: From<S>,
        F: FnMut(&[usize]) -> T,
    {
        let shape = Shape::from(shape);
        let data = (0..shape.elements())
            .map(|flat| f(&shape.unravel(flat)))
            .collect();

        Self::from_parts(data, shape)
    }

    pub fn from_iter<I, S>(iter: I, shape: S) -> Result<Self, ShapeError>
    where
        I: IntoIterator<Item = T>,
        Shape: From<S>,
    {
        Self::new(iter.into_iter().collect::<Vec<_>>(), shape)
    }

    pub(crate) fn from_parts(data: Vec<T>, shape: Shape) -> Self {
        let strides = shape.strides();

        Self {
            data,
            shape,
            strides,
        }
    }

    /// Returns the element at `index`, or `None` if the index is out of bounds or has the wrong
    /// number of dimensions.
    pub fn get<I>(&self, index: I) -> Option<&T>
    where
        I: AsRef<[usize]>,
    {
        let flat = self.strides.ravel(&self.shape, index)?;
        self.data.get(flat)
    }

    pub fn get_mut<I>(&mut self, index: I) -> Option<&mut T>
    where
        I: AsRef<[usize]>,
    {
        let flat = self.strides.ravel(&self.shape, index)?;
        self.data.get_mut(flat)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Returns an iterator over the multi-dimensional indices of the array in row-major order.
    pub fn iter_indices(&self) -> impl ExactSizeIterator<Item = Vec<usize>> + '_ {
        (0..self.elements()).map(|flat| self.shape.unravel(flat))
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    /// Returns a new array of the same shape with `f` applied to each element.
    pub fn map<U, F>(&self, f: F) -> Array<U>
    where
        F: FnMut(&T) -> U,
    {
        Array {
            data: self.data.iter().map(f).collect(),
            shape: self.shape.clone(),
            strides: self.strides.clone(),
        }
    }

    /// Creates a new array, checking that the number of elements matches the shape.
    pub fn new<D, S>(data: D, shape: S) -> Result<Self, ShapeError>
    where
        Vec<T>: From<D>,
        Shape: From<S>,
    {
        let data = Vec::from(data);
        let shape = Shape::from(shape);

        if data.len() != shape.elements() {
            return Err(ShapeError {
                shape,
                elements: data.len(),
            });
        }

        Ok(Self::from_parts(data, shape))
    }

    pub fn new_unchecked<D, S>(data: D, shape: S) -> Self
    where
        Vec<T>: From<D>,
        Shape: From<S>,
    {
        Self::from_parts(Vec::from(data), Shape::from(shape))
    }

    /// Returns a new array reversed along every axis.
    ///
    /// In row-major order, this is the same as reversing the flat data.
    pub fn reversed(&self) -> Self
    where
        T: Clone,
    {
        Self {
            data: self.data.iter().rev().cloned().collect(),
            shape: self.shape.clone(),
            strides: self.strides.clone(),
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

impl Array<f64> {
    pub fn from_zeros<S>(shape: S) -> Self
    where
        Shape: From<S>,
    {
        Self::from_element(0.0, shape)
    }

    /// Returns the array summed over the provided axis.
    ///
    /// The returned array has one dimension fewer than the input.
    pub fn sum(&self, axis: Axis) -> Self {
        let n = self.shape[*axis];
        let stride = self.strides[*axis];

        let mut smaller = self.shape.0.clone();
        smaller.remove(*axis);
        let mut summed = Array::from_zeros(smaller);

        // Position `outer * n * stride + i * stride + inner` maps to `outer * stride + inner`
        for (flat, &v) in self.data.iter().enumerate() {
            let outer = flat / (n * stride);
            let inner = flat % stride;
            summed.data[outer * stride + inner] += v;
        }

        summed
    }
}

impl<T, I> Index<I> for Array<T>
where
    I: AsRef<[usize]>,
{
    type Output = T;

    fn index(&self, index: I) -> &Self::Output {
        self.get(index).expect("array index out of bounds")
    }
}

impl<T, I> IndexMut<I> for Array<T>
where
    I: AsRef<[usize]>,
{
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        self.get_mut(index).expect("array index out of bounds")
    }
}

/// An error associated with constructing an array from data that does not fit its shape.
#[derive(Debug)]
pub struct ShapeError {
    shape: Shape,
    elements: usize,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shape {} requires {} elements, found {}",
            self.shape,
            self.shape.elements(),
            self.elements
        )
    }
}

impl std::error::Error for ShapeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_wrong_number_of_elements() {
        let error = Array::new(vec![0.0; 5], [2, 3]).unwrap_err();
        assert_eq!(error.to_string(), "shape 2/3 requires 6 elements, found 5");

        assert!(Array::new(vec![0.0; 6], [2, 3]).is_ok());
    }

    #[test]
    fn test_sum_2d() {
        let array = Array::from_iter((0..6).map(|x| x as f64), [2, 3]).unwrap();

        assert_eq!(array.sum(Axis(0)).as_slice(), &[3., 5., 7.]);
        assert_eq!(array.sum(Axis(1)).as_slice(), &[3., 12.]);
    }

    #[test]
    fn test_sum_3d_middle_axis() {
        let array = Array::from_iter((0..8).map(|x| x as f64), [2, 2, 2]).unwrap();

        assert_eq!(array.sum(Axis(1)).as_slice(), &[2., 4., 10., 12.]);
        assert_eq!(array.sum(Axis(1)).shape(), &Shape::from([2, 2]));
    }

    #[test]
    fn test_reversed_2d() {
        let array = Array::new(vec![0, 1, 2, 3, 4, 5], [2, 3]).unwrap();
        let reversed = array.reversed();

        assert_eq!(reversed[[0, 0]], 5);
        assert_eq!(reversed[[1, 2]], 0);
        assert_eq!(reversed[[0, 2]], 3);
    }

    #[test]
    fn test_get_out_of_bounds() {
        let array = Array::from_element(1u8, [2, 3]);

        assert_eq!(array.get([1, 2]), Some(&1));
        assert_eq!(array.get([2, 0]), None);
        assert_eq!(array.get([0, 0, 0]), None);
    }

    #[test]
    fn test_iter_indices_2d() {
        let array = Array::from_zeros([2, 3]);
        let mut iter = array.iter_indices();

        assert_eq!(iter.len(), 6);
        assert_eq!(iter.next(), Some(vec![0, 0]));
        assert_eq!(iter.nth(2), Some(vec![1, 0]));
        assert_eq!(iter.len(), 2);
        assert_eq!(iter.last(), Some(vec![1, 2]));
    }

    #[test]
    fn test_from_fn() {
        let array = Array::from_fn([2, 2], |index| index[0] * 10 + index[1]);

        assert_eq!(array.as_slice(), &[0, 1, 10, 11]);
    }
}
