// Neural Network Module
// Layer primitives for metric learning: L2 feature normalization and the
// hard-negative ranking loss, plus their parameters and a small registry.

pub mod config;
pub mod head;
pub mod layer;
pub mod layers;
pub mod losses;
pub mod registry;

// Re-export the main types and traits for convenience
pub use config::{LayerParameter, NormGradient, NormParameter, RankParameter};
pub use head::EmbeddingHead;
pub use layer::Layer;
pub use layers::L2Norm;
pub use losses::{MiningContext, PairTerms, RankHardLoss};
pub use registry::{AnyLayer, build_layer, create_layer};
