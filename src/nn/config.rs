// src/nn/config.rs
// Layer parameters as they appear in a model definition.
// All of them deserialize with serde and fall back to the defaults below for
// any field a definition leaves out.

use crate::error::{LayerError, Result};
use serde::{Deserialize, Serialize};

/// Parameters of the hard-negative ranking loss
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankParameter {
    /// Maximum number of negatives selected per anchor
    pub neg_num: usize,
    /// Samples per group: slot 0 is the anchor, slot 1 its positive
    pub pair_size: usize,
    /// Share of `neg_num` drawn from the closest candidates
    pub hard_ratio: f32,
    /// Share of `neg_num` drawn uniformly from the remaining candidates
    pub rand_ratio: f32,
    pub margin: f32,
}

impl Default for RankParameter {
    fn default() -> Self {
        Self {
            neg_num: 4,
            pair_size: 2,
            hard_ratio: 0.5,
            rand_ratio: 0.5,
            margin: 1.0,
        }
    }
}

impl RankParameter {
    pub fn new(neg_num: usize, pair_size: usize, hard_ratio: f32, rand_ratio: f32, margin: f32) -> Self {
        Self {
            neg_num,
            pair_size,
            hard_ratio,
            rand_ratio,
            margin,
        }
    }

    pub fn with_neg_num(mut self, neg_num: usize) -> Self {
        self.neg_num = neg_num;
        self
    }

    pub fn with_pair_size(mut self, pair_size: usize) -> Self {
        self.pair_size = pair_size;
        self
    }

    pub fn with_ratios(mut self, hard_ratio: f32, rand_ratio: f32) -> Self {
        self.hard_ratio = hard_ratio;
        self.rand_ratio = rand_ratio;
        self
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    /// Number of hard negatives, truncated toward zero
    pub fn hard_num(&self) -> usize {
        (self.neg_num as f32 * self.hard_ratio) as usize
    }

    /// Number of random negatives, truncated toward zero
    pub fn rand_num(&self) -> usize {
        (self.neg_num as f32 * self.rand_ratio) as usize
    }

    /// Expected number of hinge terms in a batch of `num` samples.
    /// The summed loss is divided by this regardless of how many terms fired.
    pub fn normalizer(&self, num: usize) -> usize {
        self.neg_num * num / self.pair_size * 2
    }

    pub fn validate(&self) -> Result<()> {
        if self.pair_size < 2 {
            return Err(LayerError::invalid_parameter(
                "pair_size",
                format!("groups need an anchor and a positive, got {}", self.pair_size),
            ));
        }
        if self.neg_num == 0 {
            return Err(LayerError::invalid_parameter("neg_num", "must be at least 1"));
        }
        for (name, ratio) in [("hard_ratio", self.hard_ratio), ("rand_ratio", self.rand_ratio)] {
            if !ratio.is_finite() || ratio < 0.0 {
                return Err(LayerError::invalid_parameter(
                    name,
                    format!("must be a finite non-negative number, got {}", ratio),
                ));
            }
        }
        let selected = self.hard_num() + self.rand_num();
        if selected == 0 {
            return Err(LayerError::invalid_parameter(
                "hard_ratio",
                format!(
                    "hard_ratio {} and rand_ratio {} select no negatives out of neg_num {}",
                    self.hard_ratio, self.rand_ratio, self.neg_num
                ),
            ));
        }
        if selected > self.neg_num {
            return Err(LayerError::invalid_parameter(
                "rand_ratio",
                format!(
                    "hard ({}) plus random ({}) negatives exceed neg_num {}",
                    self.hard_num(),
                    self.rand_num(),
                    self.neg_num
                ),
            ));
        }
        if !self.margin.is_finite() {
            return Err(LayerError::invalid_parameter(
                "margin",
                format!("must be finite, got {}", self.margin),
            ));
        }
        Ok(())
    }
}

/// Which gradient formula the normalization layer uses in backward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormGradient {
    /// Adds epsilon to `s * sqrt(s)` rather than to the norm. This is not the
    /// exact derivative of the forward pass, but it is what existing trained
    /// models were optimised with.
    #[default]
    Legacy,
    /// Exact derivative of `x / (||x|| + eps)`
    Exact,
}

/// Parameters of the L2 normalization layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormParameter {
    pub eps: f64,
    pub gradient: NormGradient,
}

impl Default for NormParameter {
    fn default() -> Self {
        Self {
            eps: 1e-6,
            gradient: NormGradient::Legacy,
        }
    }
}

impl NormParameter {
    pub fn validate(&self) -> Result<()> {
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(LayerError::invalid_parameter(
                "eps",
                format!("must be a finite positive number, got {}", self.eps),
            ));
        }
        Ok(())
    }
}

/// One layer entry of a model definition, tagged by its registered type name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LayerParameter {
    #[serde(rename = "Norm")]
    Norm {
        #[serde(default)]
        norm_param: NormParameter,
    },
    #[serde(rename = "RankHardLoss")]
    RankHardLoss {
        #[serde(default)]
        rank_param: RankParameter,
    },
}

impl LayerParameter {
    /// Default parameters for a registered type name
    pub fn from_type_name(name: &str) -> Result<Self> {
        match name {
            crate::nn::layers::norm::TYPE_NAME => Ok(LayerParameter::Norm {
                norm_param: NormParameter::default(),
            }),
            crate::nn::losses::ranking::TYPE_NAME => Ok(LayerParameter::RankHardLoss {
                rank_param: RankParameter::default(),
            }),
            other => Err(LayerError::UnknownLayerType(other.to_string())),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            LayerParameter::Norm { .. } => crate::nn::layers::norm::TYPE_NAME,
            LayerParameter::RankHardLoss { .. } => crate::nn::losses::ranking::TYPE_NAME,
        }
    }
}
