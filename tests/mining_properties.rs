// tests/mining_properties.rs
// Property tests for negative mining over random batches.

use hardneg::{Blob, MiningContext, RankHardLoss, RankParameter, StdRandom};
use proptest::prelude::*;

/// A random batch: `groups` groups of `pair_size` samples with `dim` features.
/// Anchor and positive of a group share a label, the remaining members draw
/// theirs freely.
fn batch_strategy() -> impl Strategy<Value = (usize, usize, Vec<f64>, Vec<f64>)> {
    (2usize..=4, 1usize..=5, 1usize..=4).prop_flat_map(|(pair_size, groups, dim)| {
        let num = pair_size * groups;
        (
            Just(pair_size),
            Just(dim),
            prop::collection::vec(-2.0f64..2.0, num * dim),
            prop::collection::vec(prop::collection::vec(0u8..3, pair_size - 1), groups),
        )
            .prop_map(|(pair_size, dim, features, group_labels)| {
                let labels: Vec<f64> = group_labels
                    .iter()
                    .flat_map(|group| {
                        let mut members = vec![group[0] as f64];
                        members.extend(group.iter().map(|&l| l as f64));
                        members
                    })
                    .collect();
                (pair_size, dim, features, labels)
            })
    })
}

fn param_strategy() -> impl Strategy<Value = (usize, f32, f32, f32)> {
    (1usize..=6, 0.0f32..=1.0, 0.0f32..=4.0).prop_flat_map(|(neg_num, hard_ratio, margin)| {
        // Keep hard_num + rand_num within 1..=neg_num
        let hard_num = (neg_num as f32 * hard_ratio) as usize;
        let max_rand = (neg_num - hard_num) as f32 / neg_num as f32;
        let min_rand = if hard_num == 0 { 1.0 / neg_num as f32 } else { 0.0 };
        (
            Just(neg_num),
            Just(hard_ratio),
            min_rand..=max_rand,
            Just(margin),
        )
    })
}

fn run_forward(
    pair_size: usize,
    dim: usize,
    features: Vec<f64>,
    labels: Vec<f64>,
    param: RankParameter,
    seed: u64,
) -> (RankHardLoss<f64>, MiningContext<f64>, Vec<f64>, f64) {
    let num = labels.len();
    let features = Blob::from_vec(features, &[num, dim]).unwrap();
    let label_blob = Blob::from_vec(labels.clone(), &[num]).unwrap();
    let loss = RankHardLoss::new(param.with_pair_size(pair_size)).unwrap();
    let mut ctx = MiningContext::new();
    let value = loss
        .forward(&features, &label_blob, &mut ctx, &mut StdRandom::seeded(seed))
        .unwrap();
    (loss, ctx, labels, value)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_selection_respects_labels_and_anchor_rows(
        (pair_size, dim, features, labels) in batch_strategy(),
        (neg_num, hard_ratio, rand_ratio, margin) in param_strategy(),
        seed in any::<u64>(),
    ) {
        let param = RankParameter::new(neg_num, 2, hard_ratio, rand_ratio, margin);
        prop_assume!(param.validate().is_ok());
        let (_, ctx, labels, value) = run_forward(pair_size, dim, features, labels, param, seed);

        prop_assert!(value >= 0.0);
        for i in 0..labels.len() {
            let selected: Vec<usize> = ctx.negatives(i).collect();
            if i % pair_size != 0 {
                prop_assert!(selected.is_empty(), "row {} is not an anchor", i);
                continue;
            }
            prop_assert!(selected.len() <= neg_num);
            for j in selected {
                prop_assert_ne!(labels[j], labels[i]);
            }
        }
    }

    #[test]
    fn test_small_pools_are_taken_whole(
        (pair_size, dim, features, labels) in batch_strategy(),
        margin in 0.0f32..=4.0,
        seed in any::<u64>(),
    ) {
        // neg_num larger than any batch, so no anchor ever has too many candidates
        let param = RankParameter::new(32, 2, 0.5, 0.5, margin);
        let (_, ctx, labels, _) = run_forward(pair_size, dim, features, labels, param, seed);

        for anchor in (0..labels.len()).step_by(pair_size) {
            let d_pos = ctx.distance(anchor, anchor + 1);
            for j in 0..labels.len() {
                let qualifies = labels[j] != labels[anchor]
                    && d_pos - ctx.distance(anchor, j) + margin as f64 > 0.0;
                prop_assert_eq!(ctx.is_selected(anchor, j), qualifies);
            }
        }
    }

    #[test]
    fn test_selected_pairs_all_have_an_active_hinge(
        (pair_size, dim, features, labels) in batch_strategy(),
        (neg_num, hard_ratio, rand_ratio, margin) in param_strategy(),
        seed in any::<u64>(),
    ) {
        let param = RankParameter::new(neg_num, 2, hard_ratio, rand_ratio, margin);
        prop_assume!(param.validate().is_ok());
        let (loss, ctx, _, _) = run_forward(pair_size, dim, features, labels, param, seed);

        for terms in loss.pair_terms(&ctx) {
            prop_assert!(terms.anchor_term > 0.0);
        }
    }

    #[test]
    fn test_context_follows_batch_size(
        first in 1usize..=4,
        second in 1usize..=4,
        seed in any::<u64>(),
    ) {
        let loss = RankHardLoss::<f64>::new(RankParameter::default()).unwrap();
        let mut ctx = MiningContext::new();
        let mut rng = StdRandom::seeded(seed);

        for groups in [first, second] {
            let num = 2 * groups;
            let features = Blob::from_vec(
                (0..num * 3).map(|v| (v % 7) as f64 * 0.1).collect(),
                &[num, 3],
            )
            .unwrap();
            let labels = Blob::from_vec((0..num).map(|i| (i / 2) as f64).collect(), &[num]).unwrap();

            loss.forward(&features, &labels, &mut ctx, &mut rng).unwrap();
            prop_assert_eq!(ctx.num(), num);
            prop_assert_eq!(ctx.mask().dim(), (num, num));
            prop_assert!(ctx.is_ready());
        }
    }
}
