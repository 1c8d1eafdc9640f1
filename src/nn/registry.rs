// src/nn/registry.rs
// Builds layers from model-definition entries by registered type name.

use crate::backend::Real;
use crate::error::Result;
use crate::nn::config::LayerParameter;
use crate::nn::layer::Layer;
use crate::nn::layers::L2Norm;
use crate::nn::losses::RankHardLoss;

/// A layer built from a [`LayerParameter`]
#[derive(Debug, Clone)]
pub enum AnyLayer<T>
where
    T: Real,
{
    Norm(L2Norm<T>),
    RankHardLoss(RankHardLoss<T>),
}

impl<T> AnyLayer<T>
where
    T: Real,
{
    pub fn as_norm(&self) -> Option<&L2Norm<T>> {
        match self {
            AnyLayer::Norm(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_rank_hard_loss(&self) -> Option<&RankHardLoss<T>> {
        match self {
            AnyLayer::RankHardLoss(layer) => Some(layer),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn Layer<T> {
        match self {
            AnyLayer::Norm(layer) => layer,
            AnyLayer::RankHardLoss(layer) => layer,
        }
    }
}

impl<T> Layer<T> for AnyLayer<T>
where
    T: Real,
{
    fn layer_type(&self) -> &'static str {
        self.inner().layer_type()
    }

    fn exact_num_bottom_blobs(&self) -> usize {
        self.inner().exact_num_bottom_blobs()
    }

    fn exact_num_top_blobs(&self) -> usize {
        self.inner().exact_num_top_blobs()
    }

    fn is_loss(&self) -> bool {
        self.inner().is_loss()
    }

    fn allow_force_backward(&self, index: usize) -> bool {
        self.inner().allow_force_backward(index)
    }
}

/// Validates `param` and constructs the layer it describes
pub fn build_layer<T>(param: &LayerParameter) -> Result<AnyLayer<T>>
where
    T: Real,
{
    match param {
        LayerParameter::Norm { norm_param } => Ok(AnyLayer::Norm(L2Norm::new(*norm_param)?)),
        LayerParameter::RankHardLoss { rank_param } => {
            Ok(AnyLayer::RankHardLoss(RankHardLoss::new(*rank_param)?))
        }
    }
}

/// Builds a layer of the named type with default parameters.
/// Unregistered names fail with `UnknownLayerType`.
pub fn create_layer<T>(type_name: &str) -> Result<AnyLayer<T>>
where
    T: Real,
{
    build_layer(&LayerParameter::from_type_name(type_name)?)
}
