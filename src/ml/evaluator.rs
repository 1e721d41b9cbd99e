// ============================================================
// Layer 5 — Evaluation Orchestrator
// ============================================================
// One routine for every inference pass, parametrised by two
// strategy choices:
//
//   GroundTruth::Available   → also report the training loss
//   GroundTruth::Absent      → inference only
//
//   RoomSource::ModelPredicted         → sigmoid(room logits)
//   RoomSource::ExternallyPrecomputed  → <dir>/<stem>.npy, softmax
//
// Per sample:
//   sigmoid(corner), sigmoid(icon)
//   corner channels split by ChannelLayout → wall / door / icon corners
//   Reconstructor(<output_dir>/<stem or index>_, thresholds)
//
// The model's corner-channel count is validated against the layout
// on the first call, before anything is sliced. Runs on a plain
// (non-autodiff) backend, so no gradients are tracked.

use std::path::PathBuf;
use std::sync::Arc;

use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    prelude::*,
    tensor::activation::sigmoid,
};
use ndarray::Array4;

use crate::data::{
    batcher::{FloorplanBatch, FloorplanBatcher},
    dataset::FloorplanSample,
    prefetch::{epoch_order, PrefetchConfig, Prefetcher},
};
use crate::domain::{
    error::{OrchestratorError, OrchestratorResult},
    heatmap::{Heatmap, PlanHeatmaps},
    layout::ChannelLayout,
    loss_record::LossRecord,
    traits::{LabelMaps, ReconstructionThresholds, Reconstructor, VisualizationRequest, VisualizationSink},
};
use crate::infra::precomputed_rooms::PrecomputedRoomStore;
use crate::ml::{
    labels::{argmax_labels, label_maps},
    loss::HeadLosses,
    model::{HeadChannels, HeatmapModel},
    trainer::check_target_shapes,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundTruth {
    Available,
    Absent,
}

#[derive(Debug, Clone)]
pub enum RoomSource {
    ModelPredicted,
    ExternallyPrecomputed(PrecomputedRoomStore),
}

#[derive(Debug, Clone)]
pub struct EvaluationPlan {
    pub ground_truth:    GroundTruth,
    pub rooms:           RoomSource,
    pub output_dir:      PathBuf,
    pub thresholds:      ReconstructionThresholds,
    pub prefetch:        PrefetchConfig,
    /// Emit a visualization every this many batches; 0 disables.
    pub visualize_every: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    /// Samples handed to the Reconstructor.
    pub samples:   usize,
    /// Mean over batches, when ground truth was available.
    pub mean_loss: Option<LossRecord>,
}

pub struct EvaluationOrchestrator<'a, B: Backend, M: HeatmapModel<B>> {
    model:          M,
    declared:       HeadChannels,
    layout:         ChannelLayout,
    batcher:        FloorplanBatcher<B>,
    reconstructor:  &'a dyn Reconstructor,
    sink:           &'a dyn VisualizationSink,
    plan:           EvaluationPlan,
    layout_checked: bool,
}

impl<'a, B: Backend, M: HeatmapModel<B>> EvaluationOrchestrator<'a, B, M> {
    pub fn new(
        model:         M,
        layout:        ChannelLayout,
        device:        B::Device,
        reconstructor: &'a dyn Reconstructor,
        sink:          &'a dyn VisualizationSink,
        plan:          EvaluationPlan,
    ) -> Self {
        let declared = model.head_channels();
        Self {
            model,
            declared,
            layout,
            batcher: FloorplanBatcher::new(device),
            reconstructor,
            sink,
            plan,
            layout_checked: false,
        }
    }

    /// Run every sample of `dataset`, in dataset order.
    pub fn evaluate(&mut self, dataset: Arc<dyn Dataset<FloorplanSample>>) -> OrchestratorResult<EvaluationReport> {
        if !self.layout_checked {
            self.layout.validate(self.declared.corner)?;
            self.layout_checked = true;
        }

        let order    = epoch_order(dataset.len(), None, 0);
        let prefetch = Prefetcher::spawn(dataset, order, self.plan.prefetch);
        tracing::info!(
            "Evaluating {} batches ({:?} ground truth, {} rooms) into '{}'",
            prefetch.remaining(),
            self.plan.ground_truth,
            match self.plan.rooms {
                RoomSource::ModelPredicted => "predicted",
                RoomSource::ExternallyPrecomputed(_) => "precomputed",
            },
            self.plan.output_dir.display(),
        );

        let mut records = Vec::new();
        let mut samples = 0;
        for (batch_index, items) in prefetch.enumerate() {
            let batch = self.batcher.batch(items?);
            let (written, record) = self.evaluate_batch(batch_index, batch)?;
            samples += written;
            records.extend(record);
        }

        let mean_loss = LossRecord::mean(&records);
        match &mean_loss {
            Some(mean) => tracing::info!("Evaluated {} samples | {} | total={:.5}", samples, mean, mean.total()),
            None => tracing::info!("Evaluated {} samples", samples),
        }
        Ok(EvaluationReport { samples, mean_loss })
    }

    fn evaluate_batch(
        &self,
        batch_index: usize,
        batch:       FloorplanBatch<B>,
    ) -> OrchestratorResult<(usize, Option<LossRecord>)> {
        let first  = batch.indices.first().copied().unwrap_or_default();
        let logits = self.model.forward(batch.images);
        logits.check_channels(&self.declared)?;
        let [_, height, width, _] = logits.corner.dims();

        // ── Loss ──────────────────────────────────────────────────────────────
        let record = match self.plan.ground_truth {
            GroundTruth::Absent => None,
            GroundTruth::Available => {
                let targets = batch.targets.as_ref().ok_or_else(|| OrchestratorError::DataLoad {
                    index:  first,
                    reason: "validation sample has no ground truth".to_string(),
                })?;
                check_target_shapes(&logits, targets, first)?;
                Some(HeadLosses::compute(logits.clone(), targets.clone()).record())
            }
        };

        // ── Probabilities ─────────────────────────────────────────────────────
        let corner = sigmoid(logits.corner);
        let icon   = sigmoid(logits.icon);
        let room   = match self.plan.rooms {
            RoomSource::ModelPredicted => Some(sigmoid(logits.room)),
            RoomSource::ExternallyPrecomputed(_) => None,
        };

        if self.plan.visualize_every > 0 && batch_index % self.plan.visualize_every == 0 {
            let predicted = LabelMaps {
                corner: argmax_labels(&corner),
                icon:   argmax_labels(&icon),
                room:   room.as_ref().map(argmax_labels).unwrap_or_default(),
            };
            self.sink.submit(VisualizationRequest {
                name: format!("eval_b{batch_index}"),
                height,
                width,
                predicted,
                ground_truth: batch.targets.as_ref().map(|t| label_maps(&t.corner, &t.icon, &t.room)),
                loss: record,
            });
        }

        // ── Corner groups, sliced on the device ───────────────────────────────
        let [n, _, _, _] = corner.dims();
        let group = |range: std::ops::Range<usize>| corner.clone().slice([0..n, 0..height, 0..width, range]);
        let wall_maps = to_heatmaps(group(self.layout.wall_range()))?;
        let door_maps = to_heatmaps(group(self.layout.door_range()))?;
        let icon_corner_maps = to_heatmaps(group(self.layout.icon_range()))?;
        let icon_maps = to_heatmaps(icon)?;
        let mut room_maps = room.map(to_heatmaps).transpose()?.map(Vec::into_iter);

        // ── Reconstruction, one sample at a time ──────────────────────────────
        let per_sample = wall_maps.into_iter().zip(door_maps).zip(icon_corner_maps).zip(icon_maps);
        let mut written = 0;
        for (i, (((wall_corners, door_endpoints), icon_corners), icon_classes)) in per_sample.enumerate() {
            let index = batch.indices[i];
            let stem  = batch.stems[i].as_deref();

            let room_classes = match (&self.plan.rooms, room_maps.as_mut().and_then(Iterator::next)) {
                (RoomSource::ExternallyPrecomputed(store), _) => {
                    let stem = stem.ok_or_else(|| OrchestratorError::ExternalSource {
                        stem:   index.to_string(),
                        path:   store.dir().to_path_buf(),
                        reason: "sample has no source file to key the lookup".to_string(),
                    })?;
                    store.load(stem, height, width)?
                }
                (RoomSource::ModelPredicted, Some(map)) => map,
                (RoomSource::ModelPredicted, None) => {
                    return Err(OrchestratorError::InvalidState("room predictions missing".to_string()));
                }
            };

            let heatmaps = PlanHeatmaps { wall_corners, door_endpoints, icon_corners, icon_classes, room_classes };

            let name   = stem.map_or_else(|| index.to_string(), str::to_string);
            let prefix = self.plan.output_dir.join(format!("{name}_"));
            self.reconstructor
                .reconstruct(&heatmaps, &prefix, &self.plan.thresholds)
                .map_err(|e| OrchestratorError::Reconstruction { prefix: prefix.clone(), reason: format!("{e:#}") })?;
            written += 1;
        }

        Ok((written, record))
    }
}

/// [N, H, W, C] device tensor → one host heatmap per sample.
fn to_heatmaps<B: Backend>(scores: Tensor<B, 4>) -> OrchestratorResult<Vec<Heatmap>> {
    let [n, h, w, c] = scores.dims();
    let values = scores
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| OrchestratorError::InvalidState(format!("cannot read heatmaps back: {e:?}")))?;
    let stacked = Array4::from_shape_vec((n, h, w, c), values)
        .map_err(|e| OrchestratorError::InvalidState(format!("heatmap readback has the wrong length: {e}")))?;
    Ok(stacked.outer_iter().map(|sample| Heatmap::from(sample.to_owned())).collect())
}
