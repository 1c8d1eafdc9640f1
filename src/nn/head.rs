// src/nn/head.rs
// Metric-learning head: optional L2 normalization followed by the ranking
// loss. This is the usual way the two layers are stacked on top of an
// embedding network, packaged with the intermediate blob and mining context
// it needs between forward and backward.

use crate::backend::{RandomSource, Real};
use crate::error::Result;
use crate::nn::layers::L2Norm;
use crate::nn::losses::{MiningContext, RankHardLoss};
use crate::tensor::Blob;

#[derive(Debug, Clone)]
pub struct EmbeddingHead<T>
where
    T: Real,
{
    norm: Option<L2Norm<T>>,
    loss: RankHardLoss<T>,
    /// Output of the normalization layer, input of the loss
    normalized: Blob<T>,
    ctx: MiningContext<T>,
}

impl<T> EmbeddingHead<T>
where
    T: Real,
{
    pub fn new(norm: Option<L2Norm<T>>, loss: RankHardLoss<T>) -> Self {
        Self {
            norm,
            loss,
            normalized: Blob::zeros(&[0]),
            ctx: MiningContext::new(),
        }
    }

    pub fn loss_layer(&self) -> &RankHardLoss<T> {
        &self.loss
    }

    pub fn norm_layer(&self) -> Option<&L2Norm<T>> {
        self.norm.as_ref()
    }

    /// Mining state of the last forward pass
    pub fn context(&self) -> &MiningContext<T> {
        &self.ctx
    }

    /// Runs normalization (if any) and the ranking loss
    pub fn forward<R>(&mut self, features: &Blob<T>, labels: &Blob<T>, rng: &mut R) -> Result<T>
    where
        R: RandomSource + ?Sized,
    {
        match &self.norm {
            Some(norm) => {
                norm.forward(features, &mut self.normalized)?;
                self.loss.forward(&self.normalized, labels, &mut self.ctx, rng)
            }
            None => self.loss.forward(features, labels, &mut self.ctx, rng),
        }
    }

    /// Loss of `features` under the selection of the last forward pass.
    ///
    /// Overwrites the normalized blob and the context distances with values
    /// computed from `features`; a later [`Self::backward`] replays against
    /// this input, not the one given to forward.
    pub fn evaluate(&mut self, features: &Blob<T>) -> Result<T> {
        match &self.norm {
            Some(norm) => {
                norm.forward(features, &mut self.normalized)?;
                self.loss.evaluate(&self.normalized, &mut self.ctx)
            }
            None => self.loss.evaluate(features, &mut self.ctx),
        }
    }

    /// Writes dL/d(features) into `features.diff`.
    ///
    /// `features` must hold the same values that were passed to the
    /// preceding forward call, and no [`Self::evaluate`] may run in between:
    /// evaluate replaces the cached normalized blob and distances.
    pub fn backward(&mut self, features: &mut Blob<T>) -> Result<()> {
        let one = T::from_f64(1.0);
        match &self.norm {
            Some(norm) => {
                self.loss.backward(&self.ctx, one, &mut self.normalized)?;
                norm.backward(&self.normalized, true, features)
            }
            None => self.loss.backward(&self.ctx, one, features),
        }
    }
}
