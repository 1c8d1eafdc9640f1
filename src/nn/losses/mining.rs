// src/nn/losses/mining.rs
// Hard-negative mining for the ranking loss.
// The selection runs once per forward pass and leaves its result (pairwise
// distances plus a selection mask) in a MiningContext that the caller hands
// back to backward. Nothing about the selection lives inside the layer.

use crate::backend::{RandomSource, Real, shuffle};
use crate::nn::config::RankParameter;
use log::trace;
use ndarray::{Array2, ArrayView2};
use std::cmp::Ordering;

/// Per-batch scratch shared between forward and backward.
///
/// Holds the N×N distance matrix (`-dot(f_i, f_j)`, diagonal unused) and the
/// N×N selection mask (`mask[i][j]` set iff j is a negative of anchor i).
///
/// A context is plain data: one worker owns one context, and concurrent
/// forward/backward pairs need separate contexts.
#[derive(Debug, Clone)]
pub struct MiningContext<T>
where
    T: Real,
{
    distances: Array2<T>,
    mask: Array2<bool>,
    ready: bool,
}

impl<T> Default for MiningContext<T>
where
    T: Real,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MiningContext<T>
where
    T: Real,
{
    pub fn new() -> Self {
        Self {
            distances: Array2::zeros((0, 0)),
            mask: Array2::from_elem((0, 0), false),
            ready: false,
        }
    }

    /// Batch size the scratch is currently sized for
    pub fn num(&self) -> usize {
        self.distances.nrows()
    }

    /// Whether a forward pass has filled the context for its current size
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Resizes the scratch to `num`×`num`. A resize discards everything from
    /// the previous batch.
    pub fn reshape(&mut self, num: usize) {
        if self.num() != num {
            self.distances = Array2::zeros((num, num));
            self.mask = Array2::from_elem((num, num), false);
            self.ready = false;
        }
    }

    pub fn distances(&self) -> &Array2<T> {
        &self.distances
    }

    pub fn mask(&self) -> &Array2<bool> {
        &self.mask
    }

    pub fn distance(&self, i: usize, j: usize) -> T {
        self.distances[[i, j]]
    }

    pub fn is_selected(&self, anchor: usize, j: usize) -> bool {
        self.mask[[anchor, j]]
    }

    /// Indices selected as negatives for `anchor`, in ascending order
    pub fn negatives(&self, anchor: usize) -> impl Iterator<Item = usize> + '_ {
        self.mask
            .row(anchor)
            .into_iter()
            .enumerate()
            .filter_map(|(j, &selected)| selected.then_some(j))
    }

    /// Total number of selected (anchor, negative) pairs
    pub fn selected_count(&self) -> usize {
        self.mask.iter().filter(|&&selected| selected).count()
    }

    /// Recomputes the distance matrix from `features` (one row per sample).
    /// The mask is left untouched.
    pub(crate) fn compute_distances(&mut self, features: ArrayView2<'_, T>) {
        let num = features.nrows();
        let zero = T::from_f64(0.0);
        for i in 0..num {
            self.distances[[i, i]] = zero;
            for j in (i + 1)..num {
                let d = -features.row(i).dot(&features.row(j));
                self.distances[[i, j]] = d;
                self.distances[[j, i]] = d;
            }
        }
    }

    pub(crate) fn clear_mask(&mut self) {
        self.mask.fill(false);
    }

    pub(crate) fn mark(&mut self, anchor: usize, j: usize) {
        self.mask[[anchor, j]] = true;
    }

    pub(crate) fn set_ready(&mut self) {
        self.ready = true;
    }

    /// Marks the context stale. Distances and mask are kept but backward
    /// refuses them until the next successful forward.
    pub(crate) fn invalidate(&mut self) {
        self.ready = false;
    }
}

/// Fills the mask of `ctx` from its distance matrix.
///
/// For each anchor `i` (every `pair_size`-th sample, positive at `i + 1`),
/// candidates are samples with another label whose hinge
/// `d(i, i+1) - d(i, j) + margin` is positive. When there are at most
/// `neg_num` candidates all of them are taken. Otherwise the `neg_num` closest
/// form a pool from which `hard_num` are drawn at random, and `rand_num` more
/// are drawn from everything else.
///
/// Returns the number of anchors that had at least one candidate.
pub(crate) fn select_negatives<T, R>(
    ctx: &mut MiningContext<T>,
    labels: &[T],
    param: &RankParameter,
    rng: &mut R,
) -> usize
where
    T: Real,
    R: RandomSource + ?Sized,
{
    let num = ctx.num();
    let margin = T::from_f64(param.margin as f64);
    let hard_num = param.hard_num();
    let rand_num = param.rand_num();

    ctx.clear_mask();

    let mut candidates: Vec<(T, usize)> = Vec::with_capacity(num);
    let mut active_anchors = 0;

    for anchor in (0..num).step_by(param.pair_size) {
        let positive = anchor + 1;
        let d_pos = ctx.distance(anchor, positive);

        candidates.clear();
        candidates.extend((0..num).filter_map(|j| {
            if labels[j] == labels[anchor] {
                return None;
            }
            let d_neg = ctx.distance(anchor, j);
            let hinge = (d_pos - d_neg + margin).positive_part();
            (hinge > T::from_f64(0.0)).then_some((d_neg, j))
        }));

        if !candidates.is_empty() {
            active_anchors += 1;
        }

        if candidates.len() <= param.neg_num {
            trace!(
                "anchor {}: taking all {} candidates",
                anchor,
                candidates.len()
            );
            for &(_, j) in &candidates {
                ctx.mark(anchor, j);
            }
            continue;
        }

        // Stable, so equal distances keep ascending sample order
        candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let mut close: Vec<usize> = candidates[..param.neg_num].iter().map(|&(_, j)| j).collect();
        let mut far: Vec<usize> = candidates[param.neg_num..].iter().map(|&(_, j)| j).collect();

        shuffle(&mut close, rng);
        let hard_taken = hard_num.min(close.len());
        for &j in &close[..hard_taken] {
            ctx.mark(anchor, j);
        }
        far.extend_from_slice(&close[hard_taken..]);

        shuffle(&mut far, rng);
        let rand_taken = rand_num.min(far.len());
        for &j in &far[..rand_taken] {
            ctx.mark(anchor, j);
        }

        trace!(
            "anchor {}: {} candidates, {} hard + {} random selected",
            anchor,
            candidates.len(),
            hard_taken,
            rand_taken
        );
    }

    active_anchors
}
