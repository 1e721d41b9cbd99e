// ============================================================
// Layer 5 — Training Orchestrator
// ============================================================
// Drives the epoch/step loop and the checkpoint state machine:
//
//   Idle ─► (Resuming) ─► Running(epoch, step) ─► Checkpointing ─► Running ─► … ─► Completed
//
// One step on the primary thread:
//   samples (Prefetcher) → FloorplanBatcher → model.forward
//   → three BCE-with-logits losses → sum → backward → Adam step
//   → one row in loss_log.csv
//
// Epoch end:
//   (epoch+1) % checkpoint_period == 0 → persist tag `epoch+1`
//   epoch mean < best so far           → persist/overwrite "best"
//
// The orchestrator is the only code that mutates the model and
// optimizer. Checkpoint writes block the loop.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use std::sync::Arc;

use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{FloorplanBatch, FloorplanBatcher, TargetBatch},
    dataset::FloorplanSample,
    prefetch::{epoch_order, PrefetchConfig, Prefetcher},
};
use crate::domain::{
    checkpoint_tag::CheckpointTag,
    error::{OrchestratorError, OrchestratorResult},
    loss_record::LossRecord,
    traits::{VisualizationRequest, VisualizationSink},
};
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointMeta},
    loss_log::LossLog,
};
use crate::ml::{
    labels::label_maps,
    loss::HeadLosses,
    model::{HeadChannels, HeatmapLogits, HeatmapModel},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingState {
    Idle,
    Resuming,
    Running { epoch: usize, step: usize },
    Checkpointing { epoch: usize },
    Completed,
}

/// Where a resumed run picks up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResumePoint {
    pub start_epoch:        usize,
    pub optimizer_restored: bool,
    pub best_loss:          Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochSummary {
    pub epoch: usize,
    pub steps: usize,
    pub mean:  Option<LossRecord>,
    pub saved: Vec<CheckpointTag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub epochs:    Vec<EpochSummary>,
    pub best_loss: Option<f64>,
}

pub struct TrainingOrchestrator<'a, B, M, O>
where
    B: AutodiffBackend,
    M: HeatmapModel<B> + AutodiffModule<B>,
    O: Optimizer<M, B> + Clone,
{
    model:       M,
    optim:       O,
    declared:    HeadChannels,
    dataset:     Arc<dyn Dataset<FloorplanSample>>,
    batcher:     FloorplanBatcher<B>,
    checkpoints: &'a CheckpointManager,
    loss_log:    LossLog,
    sink:        &'a dyn VisualizationSink,
    cfg:         &'a TrainConfig,
    state:       TrainingState,
    start_epoch: usize,
    best_loss:   f64,
}

impl<'a, B, M, O> TrainingOrchestrator<'a, B, M, O>
where
    B: AutodiffBackend,
    M: HeatmapModel<B> + AutodiffModule<B>,
    O: Optimizer<M, B> + Clone,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model:       M,
        optim:       O,
        dataset:     Arc<dyn Dataset<FloorplanSample>>,
        device:      B::Device,
        checkpoints: &'a CheckpointManager,
        loss_log:    LossLog,
        sink:        &'a dyn VisualizationSink,
        cfg:         &'a TrainConfig,
    ) -> Self {
        let declared = model.head_channels();
        Self {
            model,
            optim,
            declared,
            dataset,
            batcher: FloorplanBatcher::new(device),
            checkpoints,
            loss_log,
            sink,
            cfg,
            state: TrainingState::Idle,
            start_epoch: 0,
            best_loss: f64::INFINITY,
        }
    }

    pub fn state(&self) -> TrainingState {
        self.state
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Lowest epoch-mean loss seen so far, if any was finite.
    pub fn best_loss(&self) -> Option<f64> {
        self.best_loss.is_finite().then_some(self.best_loss)
    }

    pub fn start_epoch(&self) -> usize {
        self.start_epoch
    }

    // ── Resume ────────────────────────────────────────────────────────────────
    /// Restore model and optimizer from `tag`. Only legal before the
    /// first epoch runs. A missing optimizer artifact keeps the
    /// freshly initialised optimizer.
    pub fn resume(&mut self, tag: &CheckpointTag) -> OrchestratorResult<ResumePoint> {
        if self.state != TrainingState::Idle {
            return Err(OrchestratorError::InvalidState(format!(
                "resume from '{tag}' requested while {:?}",
                self.state
            )));
        }

        self.state = TrainingState::Resuming;
        match self.restore(tag) {
            Ok(point) => {
                self.state = TrainingState::Running { epoch: point.start_epoch, step: 0 };
                tracing::info!(
                    "Resumed from '{}': next epoch {}, optimizer {}",
                    tag,
                    point.start_epoch,
                    if point.optimizer_restored { "restored" } else { "fresh" },
                );
                Ok(point)
            }
            Err(e) => {
                self.state = TrainingState::Idle;
                Err(e)
            }
        }
    }

    fn restore(&mut self, tag: &CheckpointTag) -> OrchestratorResult<ResumePoint> {
        let device = self.batcher.device.clone();
        let loaded = self.checkpoints.load::<B, M, O::Record>(tag, self.model.clone(), &device)?;
        self.model = loaded.model;

        let optimizer_restored = match loaded.optimizer {
            Some(record) => {
                self.optim = self.optim.clone().load_record(record);
                true
            }
            None => {
                tracing::warn!("Checkpoint '{}' has no optimizer state, continuing with a fresh optimizer", tag);
                false
            }
        };

        let start_epoch = match loaded.meta {
            Some(meta) => meta.epoch,
            None => {
                tracing::warn!("Checkpoint '{}' has no metadata, restarting the epoch count at 0", tag);
                0
            }
        };
        self.start_epoch = start_epoch;

        // "best" must keep its meaning across the restart
        let best_loss = self.checkpoints.meta(&CheckpointTag::Best).and_then(|m| m.mean_loss);
        if let Some(best) = best_loss {
            self.best_loss = best;
        }

        Ok(ResumePoint { start_epoch, optimizer_restored, best_loss })
    }

    // ── Epoch loop ────────────────────────────────────────────────────────────
    /// Train epochs `start_epoch..epochs`.
    pub fn run(&mut self, epochs: usize) -> OrchestratorResult<TrainingReport> {
        match self.state {
            TrainingState::Idle | TrainingState::Running { .. } => {}
            other => {
                return Err(OrchestratorError::InvalidState(format!("cannot start training while {other:?}")));
            }
        }

        tracing::info!(
            "Training epochs {}..{} on {} samples (batch size {})",
            self.start_epoch,
            epochs,
            self.dataset.len(),
            self.cfg.batch_size,
        );

        let mut summaries = Vec::new();
        for epoch in self.start_epoch..epochs {
            let records = self.run_epoch(epoch)?;
            summaries.push(self.finish_epoch(epoch, &records)?);
            self.start_epoch = epoch + 1;
        }

        self.state = TrainingState::Completed;
        tracing::info!("Training complete! Best epoch-mean loss: {:?}", self.best_loss());
        Ok(TrainingReport { epochs: summaries, best_loss: self.best_loss() })
    }

    /// One pass over the dataset in seeded shuffled order. Returns the
    /// loss record of every step.
    pub fn run_epoch(&mut self, epoch: usize) -> OrchestratorResult<Vec<LossRecord>> {
        self.state = TrainingState::Running { epoch, step: 0 };

        let order    = epoch_order(self.dataset.len(), Some(self.cfg.seed), epoch);
        let prefetch = Prefetcher::spawn(Arc::clone(&self.dataset), order, self.prefetch_config());
        let mut records = Vec::with_capacity(prefetch.remaining());

        for (step, samples) in prefetch.enumerate() {
            let batch  = self.batcher.batch(samples?);
            let record = self.train_step(epoch, step, batch)?;
            self.loss_log.log(&record)?;
            records.push(record);
            self.state = TrainingState::Running { epoch, step: step + 1 };
        }

        Ok(records)
    }

    fn train_step(&mut self, epoch: usize, step: usize, batch: FloorplanBatch<B>) -> OrchestratorResult<LossRecord> {
        let first   = batch.indices.first().copied().unwrap_or_default();
        let targets = batch.targets.ok_or_else(|| OrchestratorError::DataLoad {
            index:  first,
            reason: "training sample has no ground truth".to_string(),
        })?;

        let logits = self.model.forward(batch.images);
        logits.check_channels(&self.declared)?;
        check_target_shapes(&logits, &targets, first)?;

        let visualize = self.cfg.visualize_every > 0 && step % self.cfg.visualize_every == 0;
        let snapshot = visualize.then(|| {
            (
                label_maps(&logits.corner, &logits.icon, &logits.room),
                label_maps(&targets.corner, &targets.icon, &targets.room),
            )
        });
        let [_, height, width, _] = logits.corner.dims();

        // ── Loss + backward + Adam update ─────────────────────────────────────
        let losses = HeadLosses::compute(logits, targets);
        let record = losses.record();
        let grads  = losses.objective().backward();
        let grads  = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optim.step(self.cfg.lr, self.model.clone(), grads);

        tracing::debug!("epoch {} step {} | {}", epoch, step, record);

        if let Some((predicted, ground_truth)) = snapshot {
            self.sink.submit(VisualizationRequest {
                name: format!("train_e{epoch}_s{step}"),
                height,
                width,
                predicted,
                ground_truth: Some(ground_truth),
                loss: Some(record),
            });
        }

        Ok(record)
    }

    /// Epoch-end checkpoint policy.
    pub fn finish_epoch(&mut self, epoch: usize, records: &[LossRecord]) -> OrchestratorResult<EpochSummary> {
        let mean      = LossRecord::mean(records);
        let mean_loss = mean.map(|m| m.total()).filter(|l| l.is_finite());
        let next      = epoch + 1;
        let meta      = CheckpointMeta { epoch: next, mean_loss };
        let mut saved = Vec::new();

        if self.cfg.checkpoint_period > 0 && next % self.cfg.checkpoint_period == 0 {
            self.state = TrainingState::Checkpointing { epoch };
            let tag = CheckpointTag::Epoch(next);
            if self.checkpoints.exists(&tag) {
                // a run resumed from an earlier "best" replays epochs it already numbered
                tracing::warn!("Checkpoint '{}' already exists, keeping the earlier one", tag);
            } else {
                self.persist(&tag, &meta)?;
                saved.push(tag);
            }
        }

        // NaN never compares less, so it never becomes best
        if let Some(loss) = mean_loss.filter(|&l| l < self.best_loss) {
            self.state = TrainingState::Checkpointing { epoch };
            self.persist(&CheckpointTag::Best, &meta)?;
            self.best_loss = loss;
            saved.push(CheckpointTag::Best);
        }

        match mean {
            Some(m) => tracing::info!(
                "Epoch {:>4} | {} steps | corner={:.5} icon={:.5} room={:.5} | total={:.5}{}",
                next,
                records.len(),
                m.corner,
                m.icon,
                m.room,
                m.total(),
                if saved.contains(&CheckpointTag::Best) { " (best)" } else { "" },
            ),
            None => tracing::warn!("Epoch {} produced no steps", next),
        }

        self.state = TrainingState::Running { epoch: next, step: 0 };
        Ok(EpochSummary { epoch, steps: records.len(), mean, saved })
    }

    fn persist(&self, tag: &CheckpointTag, meta: &CheckpointMeta) -> OrchestratorResult<()> {
        self.checkpoints
            .persist::<B, _, _>(tag, self.model.clone().into_record(), self.optim.to_record(), meta)?;
        tracing::info!("Checkpoint '{}' saved", tag);
        Ok(())
    }

    fn prefetch_config(&self) -> PrefetchConfig {
        PrefetchConfig {
            batch_size:  self.cfg.batch_size,
            num_workers: self.cfg.num_workers,
            capacity:    self.cfg.queue_capacity,
        }
    }
}

/// Ground truth must have the exact shape of the predictions it is
/// compared with.
pub fn check_target_shapes<B: Backend>(
    logits:  &HeatmapLogits<B>,
    targets: &TargetBatch<B>,
    index:   usize,
) -> OrchestratorResult<()> {
    let pairs = [
        ("corner", logits.corner.dims(), targets.corner.dims()),
        ("icon", logits.icon.dims(), targets.icon.dims()),
        ("room", logits.room.dims(), targets.room.dims()),
    ];
    for (head, predicted, truth) in pairs {
        if predicted != truth {
            return Err(OrchestratorError::DataLoad {
                index,
                reason: format!("{head} ground truth has shape {truth:?}, predictions have {predicted:?}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::heatmap::{Heatmap, HeatmapTargets, Image};
    use crate::ml::model::{FloorplanNet, FloorplanNetConfig};
    use burn::backend::{Autodiff, NdArray};
    use burn::data::dataset::InMemDataset;
    use burn::module::Param;
    use burn::optim::AdamConfig;
    use std::f64::consts::LN_2;
    use std::fs;
    use std::sync::Mutex;

    pub type TestBackend = Autodiff<NdArray>;

    /// Emits a learned per-channel bias everywhere, ignoring the image.
    /// Starts at zero, so the first step sees all-zero logits.
    #[derive(Module, Debug)]
    pub struct ConstantHeads<B: Backend> {
        pub corner: Param<Tensor<B, 1>>,
        pub icon:   Param<Tensor<B, 1>>,
        pub room:   Param<Tensor<B, 1>>,
    }

    impl<B: Backend> ConstantHeads<B> {
        pub fn new(channels: HeadChannels, device: &B::Device) -> Self {
            Self {
                corner: Param::from_tensor(Tensor::zeros([channels.corner], device)),
                icon:   Param::from_tensor(Tensor::zeros([channels.icon], device)),
                room:   Param::from_tensor(Tensor::zeros([channels.room], device)),
            }
        }

        fn broadcast(bias: &Param<Tensor<B, 1>>, n: usize, h: usize, w: usize) -> Tensor<B, 4> {
            let c = bias.dims()[0];
            Tensor::zeros([n, h, w, c], &bias.device()) + bias.val().reshape([1, 1, 1, c])
        }
    }

    impl<B: Backend> HeatmapModel<B> for ConstantHeads<B> {
        fn forward(&self, images: Tensor<B, 4>) -> HeatmapLogits<B> {
            let [n, _, h, w] = images.dims();
            HeatmapLogits {
                corner: Self::broadcast(&self.corner, n, h, w),
                icon:   Self::broadcast(&self.icon, n, h, w),
                room:   Self::broadcast(&self.room, n, h, w),
            }
        }

        fn head_channels(&self) -> HeadChannels {
            HeadChannels {
                corner: self.corner.dims()[0],
                icon:   self.icon.dims()[0],
                room:   self.room.dims()[0],
            }
        }
    }

    #[derive(Default)]
    pub struct RecordingSink {
        pub names: Mutex<Vec<String>>,
    }

    impl VisualizationSink for RecordingSink {
        fn submit(&self, request: VisualizationRequest) {
            self.names.lock().unwrap().push(request.name);
        }
    }

    pub const CHANNELS: HeadChannels = HeadChannels { corner: 25, icon: 3, room: 4 };

    pub fn sample(value: f32) -> FloorplanSample {
        let (h, w) = (4, 4);
        FloorplanSample::labelled(
            Image::new(h, w, vec![value - 0.5; 3 * h * w]).unwrap(),
            HeatmapTargets {
                corner: Heatmap::filled(h, w, CHANNELS.corner, value),
                icon:   Heatmap::filled(h, w, CHANNELS.icon, value),
                room:   Heatmap::filled(h, w, CHANNELS.room, value),
            },
        )
    }

    fn dataset(samples: Vec<FloorplanSample>) -> Arc<dyn Dataset<FloorplanSample>> {
        Arc::new(InMemDataset::new(samples))
    }

    fn config(checkpoint_dir: &std::path::Path) -> TrainConfig {
        TrainConfig {
            checkpoint_dir:    checkpoint_dir.display().to_string(),
            batch_size:        2,
            lr:                1e-2,
            num_workers:       2,
            queue_capacity:    2,
            checkpoint_period: 2,
            visualize_every:   1,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_zero_logits_give_ln2_per_head() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let manager = CheckpointManager::new(tmp.path()).unwrap();
        let log = LossLog::open(tmp.path(), crate::infra::loss_log::LogMode::Truncate).unwrap();
        let sink = RecordingSink::default();
        let device = Default::default();

        let model = ConstantHeads::<TestBackend>::new(CHANNELS, &device);
        let optim = AdamConfig::new().init::<TestBackend, ConstantHeads<TestBackend>>();
        let mut trainer = TrainingOrchestrator::new(
            model,
            optim,
            dataset(vec![sample(0.0), sample(1.0)]),
            device,
            &manager,
            log,
            &sink,
            &cfg,
        );

        let records = trainer.run_epoch(0).unwrap();
        assert_eq!(records.len(), 1);
        for loss in records[0].as_array() {
            assert!((loss - LN_2).abs() < 1e-5, "{loss}");
        }
        assert_eq!(trainer.state(), TrainingState::Running { epoch: 0, step: 1 });
        assert_eq!(*sink.names.lock().unwrap(), vec!["train_e0_s0".to_string()]);

        let rows = fs::read_to_string(tmp.path().join("loss_log.csv")).unwrap();
        assert_eq!(rows.lines().count(), 2);
        assert!(rows.lines().nth(1).unwrap().starts_with("0.693147,"));
    }

    #[test]
    fn test_best_never_exceeds_any_epoch_mean() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let manager = CheckpointManager::new(tmp.path()).unwrap();
        let log = LossLog::open(tmp.path(), crate::infra::loss_log::LogMode::Truncate).unwrap();
        let sink = RecordingSink::default();
        let device = Default::default();

        let model: FloorplanNet<TestBackend> =
            FloorplanNetConfig::new(CHANNELS.corner, CHANNELS.icon, CHANNELS.room).with_hidden(4).with_depth(1).init(&device);
        let optim = AdamConfig::new().init::<TestBackend, FloorplanNet<TestBackend>>();
        let samples = vec![sample(0.0), sample(1.0), sample(0.0), sample(1.0), sample(1.0)];
        let mut trainer =
            TrainingOrchestrator::new(model, optim, dataset(samples), device, &manager, log, &sink, &cfg);

        let report = trainer.run(4).unwrap();
        assert_eq!(trainer.state(), TrainingState::Completed);
        assert_eq!(report.epochs.len(), 4);

        let best = report.best_loss.unwrap();
        for summary in &report.epochs {
            assert_eq!(summary.steps, 3);
            assert!(best <= summary.mean.unwrap().total());
        }
        assert_eq!(manager.meta(&CheckpointTag::Best).and_then(|m| m.mean_loss), Some(best));

        // period 2 ⇒ numbered snapshots after the 2nd and 4th epoch only
        assert!(manager.exists(&CheckpointTag::Epoch(2)));
        assert!(manager.exists(&CheckpointTag::Epoch(4)));
        assert!(!manager.exists(&CheckpointTag::Epoch(1)));
        assert!(!manager.exists(&CheckpointTag::Epoch(3)));
    }

    #[test]
    fn test_resume_without_optimizer_state_uses_fresh_optimizer() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let manager = CheckpointManager::new(tmp.path()).unwrap();
        let sink = RecordingSink::default();
        let device: <TestBackend as Backend>::Device = Default::default();
        // all-positive targets so the first step has a non-zero gradient
        let samples = vec![sample(1.0), sample(1.0)];

        {
            let log = LossLog::open(tmp.path(), crate::infra::loss_log::LogMode::Truncate).unwrap();
            let model = ConstantHeads::<TestBackend>::new(CHANNELS, &device);
            let optim = AdamConfig::new().init::<TestBackend, ConstantHeads<TestBackend>>();
            let mut trainer =
                TrainingOrchestrator::new(model, optim, dataset(samples.clone()), device.clone(), &manager, log, &sink, &cfg);
            trainer.run(2).unwrap();
        }
        fs::remove_file(manager.optimizer_file(&CheckpointTag::Epoch(2))).unwrap();

        let log = LossLog::open(tmp.path(), crate::infra::loss_log::LogMode::Append).unwrap();
        let model = ConstantHeads::<TestBackend>::new(CHANNELS, &device);
        let optim = AdamConfig::new().init::<TestBackend, ConstantHeads<TestBackend>>();
        let mut trainer = TrainingOrchestrator::new(model, optim, dataset(samples), device, &manager, log, &sink, &cfg);

        let point = trainer.resume(&CheckpointTag::Epoch(2)).unwrap();
        assert_eq!(point.start_epoch, 2);
        assert!(!point.optimizer_restored);
        assert!(point.best_loss.is_some());
        assert_eq!(trainer.state(), TrainingState::Running { epoch: 2, step: 0 });

        // resumed weights are the trained ones, not zeros
        let bias = trainer.model().corner.val().into_data().to_vec::<f32>().unwrap();
        assert!(bias.iter().all(|&b| b != 0.0));

        let report = trainer.run(3).unwrap();
        assert_eq!(report.epochs.len(), 1);
        assert_eq!(report.epochs[0].epoch, 2);

        // a second resume is refused
        assert!(matches!(trainer.resume(&CheckpointTag::Best), Err(OrchestratorError::InvalidState(_))));
    }

    #[test]
    fn test_replayed_epoch_keeps_existing_numbered_checkpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let manager = CheckpointManager::new(tmp.path()).unwrap();
        let sink = RecordingSink::default();
        let device: <TestBackend as Backend>::Device = Default::default();

        for mode in [crate::infra::loss_log::LogMode::Truncate, crate::infra::loss_log::LogMode::Append] {
            let log = LossLog::open(tmp.path(), mode).unwrap();
            let model = ConstantHeads::<TestBackend>::new(CHANNELS, &device);
            let optim = AdamConfig::new().init::<TestBackend, ConstantHeads<TestBackend>>();
            let samples = dataset(vec![sample(1.0), sample(0.0)]);
            let mut trainer =
                TrainingOrchestrator::new(model, optim, samples, device.clone(), &manager, log, &sink, &cfg);

            let report = trainer.run(2).unwrap();
            let numbered = report.epochs[1].saved.contains(&CheckpointTag::Epoch(2));
            assert_eq!(numbered, mode == crate::infra::loss_log::LogMode::Truncate);
        }
        assert!(manager.exists(&CheckpointTag::Epoch(2)));
    }

    #[test]
    fn test_resume_with_incompatible_checkpoint_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let manager = CheckpointManager::new(tmp.path()).unwrap();
        let sink = RecordingSink::default();
        let device: <TestBackend as Backend>::Device = Default::default();

        let narrow = HeadChannels { corner: 21, ..CHANNELS };
        let optim = AdamConfig::new().init::<TestBackend, ConstantHeads<TestBackend>>();
        let meta = CheckpointMeta { epoch: 1, mean_loss: Some(1.0) };
        manager
            .persist::<TestBackend, _, _>(
                &CheckpointTag::Best,
                ConstantHeads::<TestBackend>::new(narrow, &device).into_record(),
                optim.to_record(),
                &meta,
            )
            .unwrap();

        let log = LossLog::open(tmp.path(), crate::infra::loss_log::LogMode::Append).unwrap();
        let model = ConstantHeads::<TestBackend>::new(CHANNELS, &device);
        let mut trainer =
            TrainingOrchestrator::new(model, optim, dataset(vec![sample(0.0)]), device, &manager, log, &sink, &cfg);

        let err = trainer.resume(&CheckpointTag::Best).unwrap_err();
        assert!(matches!(err, OrchestratorError::ShapeMismatch { .. }), "{err}");
        assert_eq!(trainer.state(), TrainingState::Idle);
    }

    #[test]
    fn test_missing_ground_truth_aborts_epoch() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let manager = CheckpointManager::new(tmp.path()).unwrap();
        let log = LossLog::open(tmp.path(), crate::infra::loss_log::LogMode::Truncate).unwrap();
        let sink = RecordingSink::default();
        let device = Default::default();

        let unlabelled = FloorplanSample::unlabelled(Image::new(4, 4, vec![0.0; 48]).unwrap(), "plan.png");
        let model = ConstantHeads::<TestBackend>::new(CHANNELS, &device);
        let optim = AdamConfig::new().init::<TestBackend, ConstantHeads<TestBackend>>();
        let mut trainer =
            TrainingOrchestrator::new(model, optim, dataset(vec![unlabelled]), device, &manager, log, &sink, &cfg);

        assert!(matches!(trainer.run_epoch(0), Err(OrchestratorError::DataLoad { index: 0, .. })));
    }
}
