// src/nn/layers/mod.rs
// Module declaration for the feature layers

pub mod norm;

// Re-export commonly used layers for convenience
pub use norm::L2Norm;
