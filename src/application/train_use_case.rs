// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Wires the training pipeline together in order:
//
//   Step 1: Open checkpoint directory                (Layer 6 - infra)
//   Step 2: Index the training split                 (Layer 4 - data)
//   Step 3: Build model + Adam                       (Layer 5 - ml)
//   Step 4: Open loss log + visualization sink       (Layer 6 - infra)
//   Step 5: Resume if requested, then save config    (Layer 5 - ml)
//   Step 6: Run the epoch loop                       (Layer 5 - ml)
//
// train_config.json is only written once the checkpoint it will
// describe is known to fit, so a failed resume leaves the saved
// architecture untouched.
//
// Reference: Burn Book §5 (Training)

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use burn::{data::dataset::Dataset, optim::AdamConfig, prelude::*};
use serde::{Deserialize, Serialize};

use crate::data::dataset::{FloorplanDataset, SplitKind};
use crate::domain::{checkpoint_tag::CheckpointTag, layout::ChannelLayout, layout::DEFAULT_WALL_CORNERS};
use crate::infra::{
    checkpoint::CheckpointManager,
    loss_log::{LogMode, LossLog},
    visualization::ChannelSink,
};
use crate::ml::{
    model::{FloorplanNet, FloorplanNetConfig, HeadChannels},
    trainer::{TrainingOrchestrator, TrainingReport},
    TrainingBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved as train_config.json so evaluation rebuilds the same model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:          String,
    pub checkpoint_dir:    String,
    pub visualization_dir: String,
    pub epochs:            usize,
    pub batch_size:        usize,
    pub lr:                f64,
    pub num_workers:       usize,
    pub queue_capacity:    usize,
    pub seed:              u64,
    pub checkpoint_period: usize,
    pub visualize_every:   usize,
    pub image_height:      usize,
    pub image_width:       usize,
    pub wall_corners:      usize,
    pub icon_classes:      usize,
    pub room_classes:      usize,
    pub hidden:            usize,
    pub depth:             usize,
    pub resume:            bool,
    pub resume_tag:        String,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:          "data".to_string(),
            checkpoint_dir:    "checkpoint".to_string(),
            visualization_dir: "visualization".to_string(),
            epochs:            1000,
            batch_size:        16,
            lr:                2.5e-4,
            num_workers:       4,
            queue_capacity:    8,
            seed:              42,
            checkpoint_period: 100,
            visualize_every:   500,
            image_height:      256,
            image_width:       256,
            wall_corners:      DEFAULT_WALL_CORNERS,
            icon_classes:      15,
            room_classes:      12,
            hidden:            32,
            depth:             3,
            resume:            false,
            resume_tag:        "best".to_string(),
        }
    }
}

impl TrainConfig {
    pub fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(self.wall_corners)
    }

    pub fn head_channels(&self) -> HeadChannels {
        HeadChannels {
            corner: self.layout().total(),
            icon:   self.icon_classes,
            room:   self.room_classes,
        }
    }

    /// The baseline network this config describes.
    pub fn model_config(&self) -> FloorplanNetConfig {
        let heads = self.head_channels();
        FloorplanNetConfig::new(heads.corner, heads.icon, heads.room)
            .with_hidden(self.hidden)
            .with_depth(self.depth)
    }

    pub fn resume_tag(&self) -> Result<CheckpointTag> {
        self.resume_tag.parse().map_err(|e: String| anyhow!(e))
    }

    /// A resumed run must build the same network the checkpoints were
    /// saved from. Optimisation and data settings may change freely.
    pub fn ensure_same_architecture(&self, saved: &TrainConfig) -> Result<()> {
        let shape = |c: &TrainConfig| (c.head_channels(), c.hidden, c.depth);
        if shape(self) != shape(saved) {
            return Err(anyhow!(
                "Network settings differ from the saved run: heads {:?}, hidden {}, depth {} \
                 (saved: heads {:?}, hidden {}, depth {})",
                self.head_channels(),
                self.hidden,
                self.depth,
                saved.head_channels(),
                saved.hidden,
                saved.depth,
            ));
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingReport> {
        let cfg = &self.config;

        // ── Step 1: Checkpoint directory ─────────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir)?;
        if cfg.resume {
            if let Some(saved) = checkpoints.saved_config()? {
                cfg.ensure_same_architecture(&saved)
                    .with_context(|| format!("Cannot resume from '{}'", cfg.checkpoint_dir))?;
            }
        }

        // ── Step 2: Training split ───────────────────────────────────────────
        let dataset = FloorplanDataset::open(
            &cfg.data_dir,
            "train",
            SplitKind::Labelled,
            cfg.image_height,
            cfg.image_width,
            cfg.head_channels(),
        )
        .with_context(|| format!("Cannot index training data under '{}'", cfg.data_dir))?;
        if dataset.is_empty() {
            return Err(anyhow!("No training images found under '{}/train/images'", cfg.data_dir));
        }
        tracing::info!(
            "Training on {} images, batch size {}",
            dataset.len(),
            cfg.batch_size
        );

        // ── Step 3: Model + Adam ─────────────────────────────────────────────
        let device = <TrainingBackend as Backend>::Device::default();
        tracing::info!("Using device: {:?}", device);
        let model: FloorplanNet<TrainingBackend> = cfg.model_config().init(&device);
        let optim = AdamConfig::new().with_epsilon(1e-8).init::<TrainingBackend, FloorplanNet<TrainingBackend>>();

        // ── Step 4: Loss log + visualization ─────────────────────────────────
        let mode = if cfg.resume { LogMode::Append } else { LogMode::Truncate };
        let loss_log = LossLog::open(&cfg.checkpoint_dir, mode)?;
        tracing::info!("Logging step losses to '{}'", loss_log.csv_path().display());
        let (sink, writer) = ChannelSink::to_png_dir(&cfg.visualization_dir, 4);

        let report = {
            let mut trainer = TrainingOrchestrator::new(
                model,
                optim,
                Arc::new(dataset),
                device,
                &checkpoints,
                loss_log,
                &sink,
                cfg,
            );

            // ── Step 5: Resume + config ──────────────────────────────────────
            if cfg.resume {
                let tag = cfg.resume_tag()?;
                tracing::info!("Restoring from checkpoint '{}' in '{}'", tag, cfg.checkpoint_dir);
                trainer.resume(&tag).with_context(|| format!("Cannot resume from checkpoint '{tag}'"))?;
            }
            checkpoints.save_config(cfg)?;

            // ── Step 6: Epoch loop ───────────────────────────────────────────
            trainer.run(cfg.epochs)?
        };

        if sink.dropped() > 0 {
            tracing::warn!("{} visualization snapshots were dropped", sink.dropped());
        }
        drop(sink);
        if writer.join().is_err() {
            tracing::warn!("Visualization writer thread panicked");
        }

        Ok(report)
    }
}
