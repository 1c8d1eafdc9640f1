// src/nn/layers/norm.rs
// Per-location L2 normalization over the channel axis.
// Every (n, h, w) position of an (N, C, H, W) blob is treated as one
// C-dimensional vector and scaled to unit length.

use crate::backend::Real;
use crate::error::{LayerError, Result};
use crate::nn::config::{NormGradient, NormParameter};
use crate::nn::layer::Layer;
use crate::tensor::Blob;
use log::info;
use ndarray::{ArrayView1, ArrayViewMut1, Axis, Zip};
use std::marker::PhantomData;

/// Registered type name
pub const TYPE_NAME: &str = "Norm";

/// L2 normalization layer
///
/// # Mathematical Definition
///
/// Forward, for the channel vector `x` at one spatial location:
/// ```text
/// y = x / (||x||₂ + ε)
/// ```
///
/// Backward with `s = Σ x²`:
/// ```text
/// Legacy:  s23 = s·√s + ε,  dx = s·dy / s23 − x · (x·dy) / s23
/// Exact:   d = √s + ε,      dx = dy / d − x · (x·dy) / (√s · d²)
/// ```
///
/// The two differ only in where ε enters the denominator; see [`NormGradient`].
#[derive(Debug, Clone)]
pub struct L2Norm<T>
where
    T: Real,
{
    param: NormParameter,
    _phantom: PhantomData<T>,
}

impl<T> L2Norm<T>
where
    T: Real,
{
    pub fn new(param: NormParameter) -> Result<Self> {
        param.validate()?;
        info!(
            "Setting up {} layer: eps={:e}, gradient={:?}",
            TYPE_NAME, param.eps, param.gradient
        );
        Ok(Self {
            param,
            _phantom: PhantomData,
        })
    }

    /// Layer with the default epsilon (1e-6) and the legacy gradient
    pub fn new_default() -> Self {
        Self {
            param: NormParameter::default(),
            _phantom: PhantomData,
        }
    }

    /// Layer using the exact gradient in backward
    pub fn new_exact(eps: f64) -> Result<Self> {
        Self::new(NormParameter {
            eps,
            gradient: NormGradient::Exact,
        })
    }

    pub fn param(&self) -> &NormParameter {
        &self.param
    }

    pub fn eps(&self) -> f64 {
        self.param.eps
    }

    /// Gives `top` the shape of `bottom`
    pub fn reshape(&self, bottom: &Blob<T>, top: &mut Blob<T>) -> Result<()> {
        bottom.legacy_dims()?;
        top.reshape_like(bottom)
    }

    pub fn forward(&self, bottom: &Blob<T>, top: &mut Blob<T>) -> Result<()> {
        self.reshape(bottom, top)?;
        let eps = T::from_f64(self.param.eps);

        let input = bottom.batch_view()?;
        let mut output = top.batch_view_mut()?;

        for (x, mut y) in input
            .lanes(Axis(1))
            .into_iter()
            .zip(output.lanes_mut(Axis(1)))
        {
            let norm = x.dot(&x).sqrt() + eps;
            Zip::from(&mut y).and(&x).for_each(|y, &x| *y = x / norm);
        }
        Ok(())
    }

    /// Writes dL/d(bottom) into `bottom.diff` from `top.diff`.
    /// Does nothing when `propagate_down` is false.
    pub fn backward(&self, top: &Blob<T>, propagate_down: bool, bottom: &mut Blob<T>) -> Result<()> {
        if !propagate_down {
            return Ok(());
        }
        if top.shape() != bottom.shape() {
            return Err(LayerError::ShapeMismatch(format!(
                "{} backward: top shape {:?} differs from bottom shape {:?}",
                TYPE_NAME,
                top.shape(),
                bottom.shape()
            )));
        }

        let dims = bottom.legacy_dims()?;
        let top_diff = top.diff().view().into_shape_with_order(dims)?;
        let (bottom_data, bottom_diff) = bottom.data_and_diff_mut();
        let input = bottom_data.view().into_shape_with_order(dims)?;
        let mut grad = bottom_diff.view_mut().into_shape_with_order(dims)?;

        let eps = T::from_f64(self.param.eps);
        for ((x, dy), dx) in input
            .lanes(Axis(1))
            .into_iter()
            .zip(top_diff.lanes(Axis(1)))
            .zip(grad.lanes_mut(Axis(1)))
        {
            match self.param.gradient {
                NormGradient::Legacy => legacy_lane_gradient(x, dy, dx, eps),
                NormGradient::Exact => exact_lane_gradient(x, dy, dx, eps),
            }
        }
        Ok(())
    }
}

fn legacy_lane_gradient<T: Real>(
    x: ArrayView1<'_, T>,
    dy: ArrayView1<'_, T>,
    mut dx: ArrayViewMut1<'_, T>,
    eps: T,
) {
    let s = x.dot(&x);
    let s23 = s * s.sqrt() + eps;
    let t = x.dot(&dy) / s23;
    Zip::from(&mut dx)
        .and(&x)
        .and(&dy)
        .for_each(|dx, &x, &dy| *dx = s * dy / s23 - x * t);
}

fn exact_lane_gradient<T: Real>(
    x: ArrayView1<'_, T>,
    dy: ArrayView1<'_, T>,
    mut dx: ArrayViewMut1<'_, T>,
    eps: T,
) {
    let norm = x.dot(&x).sqrt();
    let denom = norm + eps;
    if norm == T::from_f64(0.0) {
        // y = x / eps in a neighbourhood of the origin
        Zip::from(&mut dx).and(&dy).for_each(|dx, &dy| *dx = dy / eps);
        return;
    }
    let t = x.dot(&dy) / (norm * denom * denom);
    Zip::from(&mut dx)
        .and(&x)
        .and(&dy)
        .for_each(|dx, &x, &dy| *dx = dy / denom - x * t);
}

impl<T> Default for L2Norm<T>
where
    T: Real,
{
    fn default() -> Self {
        Self::new_default()
    }
}

impl<T> Layer<T> for L2Norm<T>
where
    T: Real,
{
    fn layer_type(&self) -> &'static str {
        TYPE_NAME
    }

    fn exact_num_bottom_blobs(&self) -> usize {
        1
    }

    fn exact_num_top_blobs(&self) -> usize {
        1
    }
}
