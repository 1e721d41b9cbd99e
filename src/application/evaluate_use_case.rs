// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Both evaluation commands run through the same pipeline:
//
//   Step 1: Rebuild the trained model from train_config.json
//           and the requested checkpoint                   (Layer 6 - infra)
//   Step 2: Index the split                                (Layer 4 - data)
//   Step 3: Pick the strategies for the task               (Layer 5 - ml)
//   Step 4: Run the EvaluationOrchestrator                 (Layer 5 - ml)
//
//   validation-test → "val" split, ground truth, loss reported
//   test-batch      → "test" split, no ground truth; rooms come from
//                     --rooms-dir when given, else from the model

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use burn::{data::dataset::Dataset, prelude::*};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{FloorplanDataset, SplitKind},
    prefetch::PrefetchConfig,
};
use crate::domain::{checkpoint_tag::CheckpointTag, traits::ReconstructionThresholds};
use crate::infra::{
    artifacts::NpyArtifactWriter,
    checkpoint::CheckpointManager,
    precomputed_rooms::PrecomputedRoomStore,
    visualization::ChannelSink,
};
use crate::ml::{
    evaluator::{EvaluationOrchestrator, EvaluationPlan, EvaluationReport, GroundTruth, RoomSource},
    model::FloorplanNet,
    InferenceBackend,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvalTask {
    /// Labelled validation split, loss reported.
    ValidationTest,
    /// Unlabelled test images, inference only.
    TestBatch,
}

impl EvalTask {
    fn split(&self) -> (&'static str, SplitKind) {
        match self {
            EvalTask::ValidationTest => ("val", SplitKind::Labelled),
            EvalTask::TestBatch      => ("test", SplitKind::Unlabelled),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    pub task:              EvalTask,
    pub data_dir:          String,
    pub checkpoint_dir:    String,
    pub checkpoint_tag:    String,
    pub test_dir:          String,
    pub visualization_dir: String,
    pub rooms_dir:         Option<String>,
    pub batch_size:        usize,
    pub num_workers:       usize,
    pub queue_capacity:    usize,
    pub visualize_every:   usize,
    pub thresholds:        ReconstructionThresholds,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            task:              EvalTask::TestBatch,
            data_dir:          "data".to_string(),
            checkpoint_dir:    "checkpoint".to_string(),
            checkpoint_tag:    "best".to_string(),
            test_dir:          "test".to_string(),
            visualization_dir: "visualization".to_string(),
            rooms_dir:         None,
            batch_size:        1,
            num_workers:       1,
            queue_capacity:    4,
            visualize_every:   500,
            thresholds:        ReconstructionThresholds::default(),
        }
    }
}

impl EvalConfig {
    /// Strategy choices for this task.
    pub fn plan(&self) -> EvaluationPlan {
        let ground_truth = match self.task {
            EvalTask::ValidationTest => GroundTruth::Available,
            EvalTask::TestBatch      => GroundTruth::Absent,
        };
        let rooms = match &self.rooms_dir {
            Some(dir) => RoomSource::ExternallyPrecomputed(PrecomputedRoomStore::new(dir)),
            None      => RoomSource::ModelPredicted,
        };
        EvaluationPlan {
            ground_truth,
            rooms,
            output_dir:      PathBuf::from(&self.test_dir),
            thresholds:      self.thresholds.clone(),
            prefetch:        PrefetchConfig {
                batch_size:  self.batch_size,
                num_workers: self.num_workers,
                capacity:    self.queue_capacity,
            },
            visualize_every: self.visualize_every,
        }
    }
}

pub struct EvaluateUseCase {
    config: EvalConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EvaluationReport> {
        let cfg = &self.config;

        // ── Step 1: Rebuild the trained model ────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir)?;
        let train_cfg   = checkpoints.load_config()?;
        let tag: CheckpointTag = cfg.checkpoint_tag.parse().map_err(|e: String| anyhow!(e))?;

        let device = <InferenceBackend as Backend>::Device::default();
        tracing::info!("Using device: {:?}", device);
        let template: FloorplanNet<InferenceBackend> = train_cfg.model_config().init(&device);
        let model = checkpoints
            .load_model::<InferenceBackend, _>(&tag, template, &device)
            .with_context(|| format!("Cannot load checkpoint '{tag}' from '{}'", cfg.checkpoint_dir))?;

        // ── Step 2: Split ────────────────────────────────────────────────────
        let (split, kind) = cfg.task.split();
        let dataset = FloorplanDataset::open(
            &cfg.data_dir,
            split,
            kind,
            train_cfg.image_height,
            train_cfg.image_width,
            train_cfg.head_channels(),
        )
        .with_context(|| format!("Cannot index '{split}' data under '{}'", cfg.data_dir))?;
        tracing::info!("Evaluating {} '{}' images with checkpoint '{}'", dataset.len(), split, tag);

        // ── Step 3 + 4: Strategies and run ───────────────────────────────────
        let reconstructor  = NpyArtifactWriter;
        let (sink, writer) = ChannelSink::to_png_dir(&cfg.visualization_dir, 4);
        let report = {
            let mut evaluator = EvaluationOrchestrator::new(
                model,
                train_cfg.layout(),
                device,
                &reconstructor,
                &sink,
                cfg.plan(),
            );
            evaluator.evaluate(Arc::new(dataset))?
        };

        drop(sink);
        if writer.join().is_err() {
            tracing::warn!("Visualization writer thread panicked");
        }
        Ok(report)
    }
}
