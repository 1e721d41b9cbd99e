// ============================================================
// Layer 5 — Multi-head Loss
// ============================================================
// Each head is an independent multi-label problem: every channel
// of every pixel is its own yes/no prediction. The loss per head
// is binary cross-entropy on logits averaged over all elements,
// and the objective is the plain sum of the three heads.
//
//   bce(x, t) = max(x, 0) - x*t + ln(1 + e^-|x|)
//
// This form never exponentiates a large positive number, so it
// stays finite for any logit magnitude.

use burn::prelude::*;

use crate::data::batcher::TargetBatch;
use crate::domain::loss_record::LossRecord;
use crate::ml::model::HeatmapLogits;

/// Mean binary cross-entropy between `logits` and `targets` in [0, 1].
pub fn bce_with_logits<B: Backend, const D: usize>(logits: Tensor<B, D>, targets: Tensor<B, D>) -> Tensor<B, 1> {
    let positive = logits.clone().clamp_min(0.0);
    let softplus = logits.clone().abs().neg().exp().log1p();
    (positive - logits * targets + softplus).mean()
}

/// Per-head losses of one step, still attached to the graph.
pub struct HeadLosses<B: Backend> {
    pub corner: Tensor<B, 1>,
    pub icon:   Tensor<B, 1>,
    pub room:   Tensor<B, 1>,
}

impl<B: Backend> HeadLosses<B> {
    pub fn compute(logits: HeatmapLogits<B>, targets: TargetBatch<B>) -> Self {
        Self {
            corner: bce_with_logits(logits.corner, targets.corner),
            icon:   bce_with_logits(logits.icon, targets.icon),
            room:   bce_with_logits(logits.room, targets.room),
        }
    }

    /// The scalar that gets back-propagated.
    pub fn objective(&self) -> Tensor<B, 1> {
        self.corner.clone() + self.icon.clone() + self.room.clone()
    }

    /// Read the three values back to the host.
    pub fn record(&self) -> LossRecord {
        LossRecord::new(
            self.corner.clone().into_scalar().elem::<f64>(),
            self.icon.clone().into_scalar().elem::<f64>(),
            self.room.clone().into_scalar().elem::<f64>(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use std::f64::consts::LN_2;

    type TestBackend = NdArray;

    fn scalar(t: Tensor<TestBackend, 1>) -> f64 {
        t.into_scalar().elem::<f64>()
    }

    #[test]
    fn test_zero_logits_give_ln2_for_any_target() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::zeros([3, 4], &device);
        let ones   = Tensor::<TestBackend, 2>::ones([3, 4], &device);
        let zeros  = Tensor::<TestBackend, 2>::zeros([3, 4], &device);

        assert!((scalar(bce_with_logits(logits.clone(), ones)) - LN_2).abs() < 1e-6);
        assert!((scalar(bce_with_logits(logits, zeros)) - LN_2).abs() < 1e-6);
    }

    #[test]
    fn test_matches_closed_form_for_constant_logit() {
        let device = Default::default();
        for x in [-3.0f64, -0.5, 0.7, 4.0] {
            for t in [0.0f64, 1.0] {
                let logits  = Tensor::<TestBackend, 1>::full([5], x, &device);
                let targets = Tensor::<TestBackend, 1>::full([5], t, &device);
                let p = 1.0 / (1.0 + (-x).exp());
                let expected = -(t * p.ln() + (1.0 - t) * (1.0 - p).ln());
                let got = scalar(bce_with_logits(logits, targets));
                assert!((got - expected).abs() < 1e-5, "x={x} t={t}: {got} vs {expected}");
            }
        }
    }

    #[test]
    fn test_objective_is_sum_of_recorded_heads() {
        let device = Default::default();
        let logits = HeatmapLogits {
            corner: Tensor::<TestBackend, 4>::full([2, 3, 3, 25], 0.3, &device),
            icon:   Tensor::<TestBackend, 4>::full([2, 3, 3, 4], -1.2, &device),
            room:   Tensor::<TestBackend, 4>::full([2, 3, 3, 6], 2.0, &device),
        };
        let targets = TargetBatch {
            corner: Tensor::<TestBackend, 4>::zeros([2, 3, 3, 25], &device),
            icon:   Tensor::<TestBackend, 4>::ones([2, 3, 3, 4], &device),
            room:   Tensor::<TestBackend, 4>::full([2, 3, 3, 6], 0.5, &device),
        };

        let losses = HeadLosses::compute(logits, targets);
        let record = losses.record();
        assert!(record.as_array().iter().all(|&l| l >= 0.0));
        assert!((scalar(losses.objective()) - record.total()).abs() < 1e-6);
    }

    #[test]
    fn test_large_logits_stay_finite() {
        let device = Default::default();
        let logits  = Tensor::<TestBackend, 1>::from_floats([200.0, -200.0], &device);
        let targets = Tensor::<TestBackend, 1>::from_floats([0.0, 1.0], &device);
        let got = scalar(bce_with_logits(logits, targets));
        assert!(got.is_finite());
        assert!((got - 200.0).abs() < 1e-3);
    }
}
