// src/nn/losses/mod.rs
// Loss layers. The ranking loss is split in two: `mining` selects negatives
// and owns the per-batch scratch, `ranking` turns the selection into a loss
// and its gradient.

pub mod mining;
pub mod ranking;

pub use mining::MiningContext;
pub use ranking::{PairTerms, RankHardLoss};
