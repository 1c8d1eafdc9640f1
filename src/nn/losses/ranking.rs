// src/nn/losses/ranking.rs
// Ranking loss over (anchor, positive, negatives) groups with hard-negative
// mining. Input is a feature blob with one sample per row plus a label blob;
// output is a scalar. Samples come in contiguous groups of `pair_size`, the
// first two of each group being the anchor and its positive.

use crate::backend::{RandomSource, Real};
use crate::error::{LayerError, Result};
use crate::nn::config::RankParameter;
use crate::nn::layer::Layer;
use crate::nn::losses::mining::{MiningContext, select_negatives};
use crate::tensor::Blob;
use log::{debug, info};
use ndarray::{ArrayView1, ArrayViewMut1, Zip};
use std::marker::PhantomData;

/// Registered type name
pub const TYPE_NAME: &str = "RankHardLoss";

/// Hinge values of one (anchor, negative) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairTerms<T> {
    pub anchor: usize,
    pub negative: usize,
    /// `max(0, d(a, p) - d(a, n) + margin)`
    pub anchor_term: T,
    /// `max(0, d(a, p) - d(p, n) + margin)`
    pub positive_term: T,
}

/// Hard-negative ranking loss
///
/// # Mathematical Definition
///
/// With `d(i, j) = -⟨f_i, f_j⟩`, anchors `a` (every `pair_size`-th sample),
/// positives `p = a + 1` and the negatives `n` picked by mining:
/// ```text
/// L = Σ_a Σ_n [ max(0, d(a,p) - d(a,n) + m) + max(0, d(a,p) - d(p,n) + m) ] / cnt
/// cnt = neg_num · N / pair_size · 2
/// ```
/// `cnt` counts the hinge terms a full selection would produce, so the
/// normalizer does not depend on how many negatives were actually found.
///
/// The layer itself is immutable. Every forward pass writes its distances and
/// selection into a caller-supplied [`MiningContext`], and backward reads them
/// back from the same context.
#[derive(Debug, Clone)]
pub struct RankHardLoss<T>
where
    T: Real,
{
    param: RankParameter,
    _phantom: PhantomData<T>,
}

impl<T> RankHardLoss<T>
where
    T: Real,
{
    pub fn new(param: RankParameter) -> Result<Self> {
        param.validate()?;
        info!(
            "Setting up {} layer: neg_num={}, pair_size={}, hard_num={}, rand_num={}, margin={}",
            TYPE_NAME,
            param.neg_num,
            param.pair_size,
            param.hard_num(),
            param.rand_num(),
            param.margin
        );
        Ok(Self {
            param,
            _phantom: PhantomData,
        })
    }

    pub fn param(&self) -> &RankParameter {
        &self.param
    }

    /// The hinge-term count the summed loss is divided by for `num` samples
    pub fn normalizer(&self, num: usize) -> T {
        T::from_usize(self.param.normalizer(num))
    }

    /// Checks the batch against the configuration and sizes `ctx` for it
    pub fn reshape(&self, features: &Blob<T>, labels: &Blob<T>, ctx: &mut MiningContext<T>) -> Result<()> {
        let num = features.num();
        if features.ndim() == 0 || num == 0 {
            return Err(LayerError::InvalidBatch(format!(
                "{} needs at least one sample, got shape {:?}",
                TYPE_NAME,
                features.shape()
            )));
        }
        if num % self.param.pair_size != 0 {
            return Err(LayerError::InvalidBatch(format!(
                "batch of {} samples is not a whole number of groups of {}",
                num, self.param.pair_size
            )));
        }
        if labels.count() != num {
            return Err(LayerError::ShapeMismatch(format!(
                "{} labels for {} samples",
                labels.count(),
                num
            )));
        }
        ctx.reshape(num);
        Ok(())
    }

    /// Mines negatives for this batch and returns the loss.
    ///
    /// Leaves the distances and selection in `ctx` for [`Self::backward`].
    /// A failed call leaves `ctx` not ready, so a backward after it errors
    /// instead of replaying an older batch.
    pub fn forward<R>(
        &self,
        features: &Blob<T>,
        labels: &Blob<T>,
        ctx: &mut MiningContext<T>,
        rng: &mut R,
    ) -> Result<T>
    where
        R: RandomSource + ?Sized,
    {
        ctx.invalidate();
        self.reshape(features, labels, ctx)?;
        let labels: Vec<T> = labels.data().iter().copied().collect();
        self.check_groups(&labels)?;

        let rows = features.sample_rows()?;
        ctx.compute_distances(rows);
        let active_anchors = select_negatives(ctx, &labels, &self.param, rng);
        ctx.set_ready();

        let loss = self.summed_loss(ctx) / self.normalizer(ctx.num());
        debug!(
            "{} forward: {} samples, {}/{} anchors with candidates, {} negatives selected, loss={}",
            TYPE_NAME,
            ctx.num(),
            active_anchors,
            ctx.num() / self.param.pair_size,
            ctx.selected_count(),
            loss.to_f64()
        );
        Ok(loss)
    }

    /// Loss of `features` under the selection already stored in `ctx`.
    ///
    /// Distances are recomputed from `features` but no mining happens, which
    /// makes the loss a smooth function of the features away from hinge
    /// boundaries (finite-difference checks rely on this).
    pub fn evaluate(&self, features: &Blob<T>, ctx: &mut MiningContext<T>) -> Result<T> {
        self.check_context(features, ctx)?;
        ctx.compute_distances(features.sample_rows()?);
        Ok(self.summed_loss(ctx) / self.normalizer(ctx.num()))
    }

    /// Every selected (anchor, negative) pair with its two hinge values
    pub fn pair_terms(&self, ctx: &MiningContext<T>) -> Vec<PairTerms<T>> {
        let margin = T::from_f64(self.param.margin as f64);
        let mut terms = Vec::with_capacity(ctx.selected_count());
        for anchor in (0..ctx.num()).step_by(self.param.pair_size) {
            let positive = anchor + 1;
            let d_pos = ctx.distance(anchor, positive);
            for negative in ctx.negatives(anchor) {
                terms.push(PairTerms {
                    anchor,
                    negative,
                    anchor_term: (d_pos - ctx.distance(anchor, negative) + margin).positive_part(),
                    positive_term: (d_pos - ctx.distance(positive, negative) + margin).positive_part(),
                });
            }
        }
        terms
    }

    /// Writes dL/d(features) into `features.diff`, scaled by `loss_weight`
    /// (the gradient arriving at the scalar output, 1 for a plain objective).
    ///
    /// Replays the terms of the preceding forward on the same batch; `ctx`
    /// must be the context that forward filled.
    pub fn backward(&self, ctx: &MiningContext<T>, loss_weight: T, features: &mut Blob<T>) -> Result<()> {
        self.check_context(features, ctx)?;
        let terms = self.pair_terms(ctx);
        let zero = T::from_f64(0.0);
        let one = T::from_f64(1.0);

        features.clear_diff();
        let (feats, mut grad) = features.sample_rows_with_diff()?;

        for term in &terms {
            let a = term.anchor;
            let p = a + 1;
            let n = term.negative;
            let anchor = feats.row(a);
            let pos = feats.row(p);
            let neg = feats.row(n);

            if term.anchor_term > zero {
                // -<a,p> + <a,n>
                accumulate_difference(grad.row_mut(a), neg, pos);
                grad.row_mut(p).scaled_add(-one, &anchor);
                grad.row_mut(n).scaled_add(one, &anchor);
            }
            if term.positive_term > zero {
                // -<a,p> + <p,n>
                grad.row_mut(a).scaled_add(-one, &pos);
                accumulate_difference(grad.row_mut(p), neg, anchor);
                grad.row_mut(n).scaled_add(one, &pos);
            }
        }

        let scale = loss_weight / self.normalizer(ctx.num());
        grad.mapv_inplace(|g| g * scale);
        debug!(
            "{} backward: {} pair terms replayed over {} samples",
            TYPE_NAME,
            terms.len(),
            ctx.num()
        );
        Ok(())
    }

    fn summed_loss(&self, ctx: &MiningContext<T>) -> T {
        self.pair_terms(ctx)
            .iter()
            .map(|t| t.anchor_term + t.positive_term)
            .sum()
    }

    /// Every anchor's positive must share its label
    fn check_groups(&self, labels: &[T]) -> Result<()> {
        for anchor in (0..labels.len()).step_by(self.param.pair_size) {
            if labels[anchor] != labels[anchor + 1] {
                return Err(LayerError::InvalidBatch(format!(
                    "group at sample {}: positive label {} differs from anchor label {}",
                    anchor,
                    labels[anchor + 1],
                    labels[anchor]
                )));
            }
        }
        Ok(())
    }

    fn check_context(&self, features: &Blob<T>, ctx: &MiningContext<T>) -> Result<()> {
        if !ctx.is_ready() {
            return Err(LayerError::ContextNotReady);
        }
        if ctx.num() != features.num() {
            return Err(LayerError::ShapeMismatch(format!(
                "mining context holds {} samples, features have {}",
                ctx.num(),
                features.num()
            )));
        }
        Ok(())
    }
}

/// `target += lhs - rhs`
fn accumulate_difference<T: Real>(
    target: ArrayViewMut1<'_, T>,
    lhs: ArrayView1<'_, T>,
    rhs: ArrayView1<'_, T>,
) {
    Zip::from(target)
        .and(&lhs)
        .and(&rhs)
        .for_each(|t, &l, &r| *t += l - r);
}

impl<T> Layer<T> for RankHardLoss<T>
where
    T: Real,
{
    fn layer_type(&self) -> &'static str {
        TYPE_NAME
    }

    fn exact_num_bottom_blobs(&self) -> usize {
        2
    }

    fn exact_num_top_blobs(&self) -> usize {
        1
    }

    fn is_loss(&self) -> bool {
        true
    }

    /// Labels take no gradient
    fn allow_force_backward(&self, index: usize) -> bool {
        index != 1
    }
}
