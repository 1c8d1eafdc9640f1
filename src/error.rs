// src/error.rs
// Error type shared by the tensor abstraction and both layers.
// Every variant is a programmer/configuration error surfaced immediately;
// nothing here is meant to be recovered from mid-computation.

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, LayerError>;

#[derive(Debug, Error)]
pub enum LayerError {
    /// Two tensors that must agree on shape do not
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A layer parameter is out of its valid range
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The batch contents do not fit the layer configuration
    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    /// Backward (or a fixed-mask evaluation) was requested before a forward
    /// pass populated the mining context
    #[error("mining context is empty: run forward on this batch first")]
    ContextNotReady,

    #[error("unknown layer type `{0}`")]
    UnknownLayerType(String),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

impl LayerError {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        LayerError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
