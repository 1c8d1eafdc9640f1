// src/tensor/blob.rs
// Blob: the tensor the layers consume. A blob is a pair of equally shaped
// buffers, `data` for activations and `diff` for the gradient flowing back
// into them. Layers read shapes through the legacy (num, channels, height,
// width) accessors, where axes the blob does not have read as 1.

use crate::backend::Real;
use crate::error::{LayerError, Result};
use ndarray::{Array, ArrayD, ArrayView2, ArrayView4, ArrayViewMut2, ArrayViewMut4, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Highest rank the legacy accessors understand
pub const MAX_LEGACY_AXES: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Blob<T>
where
    T: Real,
{
    data: ArrayD<T>,
    diff: ArrayD<T>,
}

impl<T> Blob<T>
where
    T: Real,
{
    /// Zero-filled blob of the given shape
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(shape)),
            diff: ArrayD::zeros(IxDyn(shape)),
        }
    }

    /// Builds a blob from row-major values. The gradient starts at zero.
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let total_elements: usize = shape.iter().product();
        if data.len() != total_elements {
            return Err(LayerError::ShapeMismatch(format!(
                "Data length {} doesn't match shape {:?} (expected {})",
                data.len(),
                shape,
                total_elements
            )));
        }
        let data = Array::from_shape_vec(IxDyn(shape), data)?;
        Ok(Self::from_array(data))
    }

    /// Wraps an existing array. Non-contiguous inputs are copied into
    /// row-major order, which every kernel relies on.
    pub fn from_array(data: ArrayD<T>) -> Self {
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        let diff = ArrayD::zeros(data.raw_dim());
        Self { data, diff }
    }

    /// Blob filled with standard normal samples
    pub fn randn<R>(shape: &[usize], rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
        StandardNormal: Distribution<T>,
    {
        let data = ArrayD::from_shape_simple_fn(IxDyn(shape), || StandardNormal.sample(rng));
        Self::from_array(data)
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Total number of elements
    pub fn count(&self) -> usize {
        self.data.len()
    }

    /// Size of the axis at `index`, or 1 past the last axis
    pub fn legacy_shape(&self, index: usize) -> usize {
        self.data.shape().get(index).copied().unwrap_or(1)
    }

    pub fn num(&self) -> usize {
        self.legacy_shape(0)
    }

    pub fn channels(&self) -> usize {
        self.legacy_shape(1)
    }

    pub fn height(&self) -> usize {
        self.legacy_shape(2)
    }

    pub fn width(&self) -> usize {
        self.legacy_shape(3)
    }

    /// Number of elements per sample (`count / num`)
    pub fn sample_dim(&self) -> usize {
        match self.num() {
            0 => 0,
            n => self.count() / n,
        }
    }

    pub fn data(&self) -> &ArrayD<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ArrayD<T> {
        &mut self.data
    }

    pub fn diff(&self) -> &ArrayD<T> {
        &self.diff
    }

    pub fn diff_mut(&mut self) -> &mut ArrayD<T> {
        &mut self.diff
    }

    /// Borrows the activations immutably and the gradient mutably at once,
    /// which is what every backward kernel needs.
    pub fn data_and_diff_mut(&mut self) -> (&ArrayD<T>, &mut ArrayD<T>) {
        (&self.data, &mut self.diff)
    }

    /// Changes the shape. Values survive when the element count is unchanged;
    /// otherwise both buffers are reallocated and zeroed.
    pub fn reshape(&mut self, shape: &[usize]) -> Result<()> {
        if self.shape() == shape {
            return Ok(());
        }
        let total_elements: usize = shape.iter().product();
        if total_elements == self.count() {
            self.data = self.data.view().into_shape_with_order(IxDyn(shape))?.to_owned();
            self.diff = self.diff.view().into_shape_with_order(IxDyn(shape))?.to_owned();
        } else {
            self.data = ArrayD::zeros(IxDyn(shape));
            self.diff = ArrayD::zeros(IxDyn(shape));
        }
        Ok(())
    }

    pub fn reshape_like<U>(&mut self, other: &Blob<U>) -> Result<()>
    where
        U: Real,
    {
        self.reshape(other.shape())
    }

    /// Legacy (num, channels, height, width) extents, rejecting ranks the
    /// accessors cannot describe
    pub fn legacy_dims(&self) -> Result<(usize, usize, usize, usize)> {
        if self.ndim() == 0 || self.ndim() > MAX_LEGACY_AXES {
            return Err(LayerError::InvalidBatch(format!(
                "expected between 1 and {} axes, got shape {:?}",
                MAX_LEGACY_AXES,
                self.shape()
            )));
        }
        Ok((self.num(), self.channels(), self.height(), self.width()))
    }

    /// Data viewed as (N, C, H, W)
    pub fn batch_view(&self) -> Result<ArrayView4<'_, T>> {
        let dims = self.legacy_dims()?;
        Ok(self.data.view().into_shape_with_order(dims)?)
    }

    /// Data viewed as (N, C, H, W), mutably
    pub fn batch_view_mut(&mut self) -> Result<ArrayViewMut4<'_, T>> {
        let dims = self.legacy_dims()?;
        Ok(self.data.view_mut().into_shape_with_order(dims)?)
    }

    /// Data viewed as one flattened feature row per sample
    pub fn sample_rows(&self) -> Result<ArrayView2<'_, T>> {
        let dims = (self.num(), self.sample_dim());
        Ok(self.data.view().into_shape_with_order(dims)?)
    }

    /// Activations as sample rows plus the gradient as mutable sample rows
    pub fn sample_rows_with_diff(&mut self) -> Result<(ArrayView2<'_, T>, ArrayViewMut2<'_, T>)> {
        let dims = (self.num(), self.sample_dim());
        let data = self.data.view().into_shape_with_order(dims)?;
        let diff = self.diff.view_mut().into_shape_with_order(dims)?;
        Ok((data, diff))
    }

    /// Zeroes the gradient buffer
    pub fn clear_diff(&mut self) {
        self.diff.fill(T::from_f64(0.0));
    }
}
