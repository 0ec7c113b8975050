//! Pairwise margin ranking loss between predicted and true per-sample losses.
//!
//! The loss-prediction head is trained to order samples by loss, not to
//! regress the loss value itself: the scale of the task loss changes a lot
//! during training, while its ordering is what the query step consumes.
//!
//! # Pairing
//!
//! Pairs are formed inside a minibatch by reversing it: sample `i` is paired
//! with sample `n - 1 - i` for the first `⌊n/2⌋` positions. The middle sample
//! of an odd batch is left unpaired.
//!
//! For a pair `(i, j)` with predicted losses `p` and true losses `l`:
//!
//! ```text
//! s    = +1 if l_i - l_j > 0, else -1
//! loss = max(0, margin - s · (p_i - p_j))
//! ```
//!
//! The batch loss is the mean over pairs. True losses are detached, so the
//! ranking loss never differentiates through the task loss targets.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Mean pairwise hinge between `predicted` and `target` orderings.
///
/// Both tensors have shape `[batch]`. Returns a `[1]` tensor; batches with
/// fewer than two samples produce zero.
pub fn margin_ranking_loss<B: Backend>(
    predicted: Tensor<B, 1>,
    target: Tensor<B, 1>,
    margin: f32,
) -> Tensor<B, 1> {
    let [batch] = predicted.dims();
    let pairs = batch / 2;
    if pairs == 0 {
        return Tensor::zeros([1], &predicted.device());
    }

    let target = target.detach();
    let predicted_diff = (predicted.clone() - predicted.flip([0])).slice([0..pairs]);
    let target_diff = (target.clone() - target.flip([0])).slice([0..pairs]);

    // sign(clamp(x, 0)) is 1 for a strictly larger first loss and 0 otherwise.
    let direction = target_diff.clamp_min(0.0).sign().mul_scalar(2.0).sub_scalar(1.0);

    let hinge = (direction * predicted_diff)
        .neg()
        .add_scalar(margin)
        .clamp_min(0.0);
    hinge.sum().div_scalar(pairs as f32)
}

#[cfg(all(test, feature = "ndarray"))]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::tensor::ElementConversion;

    type TestBackend = NdArray;

    fn scalar(t: Tensor<TestBackend, 1>) -> f32 {
        t.into_scalar().elem::<f32>()
    }

    fn loss(pred: [f32; 2], target: [f32; 2], margin: f32) -> f32 {
        let device = Default::default();
        let pred = Tensor::<TestBackend, 1>::from_floats(pred, &device);
        let target = Tensor::<TestBackend, 1>::from_floats(target, &device);
        scalar(margin_ranking_loss(pred, target, margin))
    }

    #[test]
    fn test_agreeing_by_more_than_margin_is_free() {
        // True a > b, predicted a - b = 2.5 > margin 1.0.
        assert!(loss([3.0, 0.5], [2.0, 1.0], 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_agreeing_within_margin_is_penalized_linearly() {
        // Predicted gap 0.25 -> violation 0.75; gap 0.5 -> violation 0.5.
        let small_gap = loss([1.25, 1.0], [2.0, 1.0], 1.0);
        let larger_gap = loss([1.5, 1.0], [2.0, 1.0], 1.0);
        assert!((small_gap - 0.75).abs() < 1e-6);
        assert!((larger_gap - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_disagreeing_order_exceeds_margin() {
        // True a > b but predicted b > a by 2 -> margin + 2.
        assert!((loss([0.0, 2.0], [2.0, 1.0], 1.0) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_reversed_truth_flips_direction() {
        // True b > a, predicted b > a by 3 -> satisfied.
        assert!(loss([0.0, 3.0], [1.0, 2.0], 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mean_over_pairs_and_unpaired_middle() {
        let device = Default::default();
        // Pairs (0,4) and (1,3); index 2 is unpaired.
        let pred = Tensor::<TestBackend, 1>::from_floats([0.0, 0.0, 100.0, 0.0, 0.0], &device);
        let target = Tensor::<TestBackend, 1>::from_floats([2.0, 2.0, -50.0, 1.0, 1.0], &device);
        let value = scalar(margin_ranking_loss(pred, target, 1.0));
        // Each pair has a zero predicted gap -> hinge of exactly the margin.
        assert!((value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_single_sample_is_zero() {
        let device = Default::default();
        let pred = Tensor::<TestBackend, 1>::from_floats([4.0], &device);
        let target = Tensor::<TestBackend, 1>::from_floats([1.0], &device);
        assert_eq!(scalar(margin_ranking_loss(pred, target, 1.0)), 0.0);
    }
}
