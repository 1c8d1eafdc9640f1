//! # hardneg
//!
//! Two layer primitives for metric learning, written against a small blob
//! abstraction backed by `ndarray`:
//!
//! - `Norm`: per-location L2 normalization over the channel axis, with its
//!   hand-derived gradient
//! - `RankHardLoss`: a margin ranking loss over (anchor, positive, negatives)
//!   groups that mines a mix of hard and random negatives every forward pass
//!
//! The loss keeps no hidden state between forward and backward. Its mining
//! result lives in a caller-owned [`MiningContext`] that forward fills and
//! backward consumes, and randomness comes from an injected [`RandomSource`].
//!
//! ```
//! use hardneg::{Blob, MiningContext, RankHardLoss, RankParameter, StdRandom};
//!
//! let loss = RankHardLoss::<f64>::new(RankParameter::default().with_margin(0.5)).unwrap();
//! let mut features = Blob::from_vec(vec![1.0, 0.0, 0.8, 0.6, 0.6, 0.8, 0.0, 1.0], &[4, 2]).unwrap();
//! let labels = Blob::from_vec(vec![0.0, 0.0, 1.0, 1.0], &[4]).unwrap();
//!
//! let mut ctx = MiningContext::new();
//! let mut rng = StdRandom::seeded(0);
//! let value = loss.forward(&features, &labels, &mut ctx, &mut rng).unwrap();
//! assert!(value >= 0.0);
//! loss.backward(&ctx, 1.0, &mut features).unwrap();
//! ```
pub mod backend;
pub mod error;
pub mod nn;
pub mod tensor;

// Re-export commonly used types for convenience
pub use backend::{RandomSource, Real, StdRandom};
pub use error::{LayerError, Result};
pub use nn::{
    EmbeddingHead, L2Norm, Layer, LayerParameter, MiningContext, NormGradient, NormParameter,
    RankHardLoss, RankParameter,
};
pub use tensor::Blob;
