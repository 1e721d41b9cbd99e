// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores tagged model + optimizer snapshots with
// Burn's BinFileRecorder at full precision, so a reload gives
// back exactly the bits that were saved.
//
// File naming convention (one set per tag):
//   checkpoints/
//     checkpoint_best.bin   ← model weights, overwritten on improvement
//     optim_best.bin        ← optimizer state for the same snapshot
//     meta_best.json        ← epoch index + epoch-mean loss
//     checkpoint_100.bin    ← numbered snapshots, written once
//     optim_100.bin
//     meta_100.json
//     train_config.json     ← hyperparameters to rebuild the model
//
// A missing model file is an error on load. A missing optimizer
// file is not: the caller gets `None` and starts a fresh optimizer.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    module::{ModuleVisitor, ParamId},
    prelude::*,
    record::{BinFileRecorder, FullPrecisionSettings, Record, Recorder},
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::domain::checkpoint_tag::CheckpointTag;
use crate::domain::error::{OrchestratorError, OrchestratorResult};

type ArtifactRecorder = BinFileRecorder<FullPrecisionSettings>;

const RECORD_EXTENSION: &str = "bin";

/// Sidecar stored next to every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Next epoch to run when resuming from this snapshot.
    pub epoch:     usize,
    /// Epoch-mean training objective at save time; `None` when
    /// the epoch produced no finite mean.
    pub mean_loss: Option<f64>,
}

/// What `load` hands back.
pub struct LoadedCheckpoint<M, OR> {
    pub model:     M,
    pub optimizer: Option<OR>,
    pub meta:      Option<CheckpointMeta>,
}

/// Manages saving and loading of tagged checkpoints.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir:      PathBuf,
    recorder: ArtifactRecorder,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> OrchestratorResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| OrchestratorError::io(&dir, e))?;
        Ok(Self { dir, recorder: ArtifactRecorder::new() })
    }

    /// Path of the model artifact for `tag`, extension included.
    pub fn model_file(&self, tag: &CheckpointTag) -> PathBuf {
        self.base("checkpoint", tag).with_extension(RECORD_EXTENSION)
    }

    /// Path of the optimizer artifact for `tag`, extension included.
    pub fn optimizer_file(&self, tag: &CheckpointTag) -> PathBuf {
        self.base("optim", tag).with_extension(RECORD_EXTENSION)
    }

    fn meta_file(&self, tag: &CheckpointTag) -> PathBuf {
        self.dir.join(format!("meta_{tag}.json"))
    }

    // The recorder appends the extension itself.
    fn base(&self, kind: &str, tag: &CheckpointTag) -> PathBuf {
        self.dir.join(format!("{kind}_{tag}"))
    }

    pub fn exists(&self, tag: &CheckpointTag) -> bool {
        self.model_file(tag).exists()
    }

    /// Write model + optimizer records and the sidecar under `tag`.
    /// Blocks until everything is on disk.
    pub fn persist<B, MR, OR>(
        &self,
        tag:       &CheckpointTag,
        model:     MR,
        optimizer: OR,
        meta:      &CheckpointMeta,
    ) -> OrchestratorResult<()>
    where
        B:  Backend,
        MR: Record<B>,
        OR: Record<B>,
    {
        if !tag.is_overwritable() && self.exists(tag) {
            return Err(OrchestratorError::CheckpointExists {
                tag:  tag.to_string(),
                path: self.model_file(tag),
            });
        }

        let model_base = self.base("checkpoint", tag);
        Recorder::<B>::record(&self.recorder, model, model_base.clone())
            .map_err(|e| OrchestratorError::Record { path: model_base, reason: format!("{e:?}") })?;

        let optim_base = self.base("optim", tag);
        Recorder::<B>::record(&self.recorder, optimizer, optim_base.clone())
            .map_err(|e| OrchestratorError::Record { path: optim_base, reason: format!("{e:?}") })?;

        let meta_path = self.meta_file(tag);
        let json = serde_json::to_string_pretty(meta).map_err(|e| OrchestratorError::Record {
            path:   meta_path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&meta_path, json).map_err(|e| OrchestratorError::io(&meta_path, e))?;

        tracing::debug!("Saved checkpoint '{}' (epoch {}, loss {:?})", tag, meta.epoch, meta.mean_loss);
        Ok(())
    }

    /// Restore only the model weights of `tag` into `template`.
    ///
    /// Every parameter shape of the restored model is compared with
    /// the template's; any difference is a `ShapeMismatch`.
    pub fn load_model<B, M>(&self, tag: &CheckpointTag, template: M, device: &B::Device) -> OrchestratorResult<M>
    where
        B: Backend,
        M: Module<B>,
    {
        let model_file = self.model_file(tag);
        if !model_file.exists() {
            return Err(OrchestratorError::CheckpointNotFound { tag: tag.to_string(), path: model_file });
        }

        let record: M::Record = Recorder::<B>::load(&self.recorder, self.base("checkpoint", tag), device)
            .map_err(|e| OrchestratorError::Record { path: model_file.clone(), reason: format!("{e:?}") })?;

        let expected = param_shapes::<B, M>(&template);
        let model    = template.load_record(record);
        let found    = param_shapes::<B, M>(&model);
        if let Some(param) = first_difference(&expected, &found) {
            return Err(OrchestratorError::ShapeMismatch {
                tag:      tag.to_string(),
                param,
                expected: expected.get(param).cloned().unwrap_or_default(),
                found:    found.get(param).cloned().unwrap_or_default(),
            });
        }
        Ok(model)
    }

    /// Restore model, optimizer record and sidecar of `tag`.
    /// The optimizer and sidecar are `None` when their files are absent.
    pub fn load<B, M, OR>(
        &self,
        tag:      &CheckpointTag,
        template: M,
        device:   &B::Device,
    ) -> OrchestratorResult<LoadedCheckpoint<M, OR>>
    where
        B:  Backend,
        M:  Module<B>,
        OR: Record<B>,
    {
        let model = self.load_model::<B, M>(tag, template, device)?;

        let optim_file = self.optimizer_file(tag);
        let optimizer = if optim_file.exists() {
            let record: OR = Recorder::<B>::load(&self.recorder, self.base("optim", tag), device)
                .map_err(|e| OrchestratorError::Record { path: optim_file.clone(), reason: format!("{e:?}") })?;
            Some(record)
        } else {
            tracing::warn!("No optimizer state at '{}'", optim_file.display());
            None
        };

        let meta_path = self.meta_file(tag);
        let meta = match fs::read_to_string(&meta_path) {
            Ok(json) => Some(serde_json::from_str(&json).map_err(|e| OrchestratorError::Record {
                path:   meta_path.clone(),
                reason: e.to_string(),
            })?),
            Err(_) => None,
        };

        tracing::info!("Loaded checkpoint '{}' from '{}'", tag, self.dir.display());
        Ok(LoadedCheckpoint { model, optimizer, meta })
    }

    /// Read only the sidecar of `tag`, if present and readable.
    pub fn meta(&self, tag: &CheckpointTag) -> Option<CheckpointMeta> {
        let json = fs::read_to_string(self.meta_file(tag)).ok()?;
        serde_json::from_str(&json).ok()
    }

    /// Save the training configuration to JSON so evaluation
    /// can rebuild the exact model that was trained.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.config_path();
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        self.saved_config()?.with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'train' with this checkpoint directory.",
                self.config_path().display()
            )
        })
    }

    /// The saved configuration, or `None` if no run has saved one yet.
    pub fn saved_config(&self) -> Result<Option<TrainConfig>> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        let cfg = serde_json::from_str(&json)
            .with_context(|| format!("Cannot parse config '{}'", path.display()))?;
        Ok(Some(cfg))
    }

    fn config_path(&self) -> PathBuf {
        self.dir.join("train_config.json")
    }
}

// ─── Parameter shapes ─────────────────────────────────────────────────────────
struct ShapeCollector {
    shapes: Vec<Vec<usize>>,
}

impl<B: Backend> ModuleVisitor<B> for ShapeCollector {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        self.shapes.push(tensor.dims().to_vec());
    }
}

/// Shapes of every float parameter, in module visiting order.
pub fn param_shapes<B: Backend, M: Module<B>>(module: &M) -> Vec<Vec<usize>> {
    let mut collector = ShapeCollector { shapes: Vec::new() };
    module.visit(&mut collector);
    collector.shapes
}

fn first_difference(expected: &[Vec<usize>], found: &[Vec<usize>]) -> Option<usize> {
    (0..expected.len().max(found.len())).find(|&i| expected.get(i) != found.get(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::{FloorplanNet, FloorplanNetConfig, HeatmapModel};
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::{AdamConfig, GradientsParams, Optimizer};

    type TestBackend = Autodiff<NdArray>;
    type TestNet = FloorplanNet<TestBackend>;

    fn net(corner: usize) -> TestNet {
        FloorplanNetConfig::new(corner, 3, 2).with_hidden(4).with_depth(1).init(&Default::default())
    }

    struct ParamValues {
        values: Vec<Vec<f32>>,
    }

    impl<B: Backend> ModuleVisitor<B> for ParamValues {
        fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
            self.values.push(tensor.to_data().to_vec::<f32>().unwrap());
        }
    }

    fn values(model: &TestNet) -> Vec<Vec<f32>> {
        let mut v = ParamValues { values: Vec::new() };
        model.visit(&mut v);
        v.values
    }

    fn grads_for(model: &TestNet) -> GradientsParams {
        let images = Tensor::<TestBackend, 4>::ones([1, 3, 4, 4], &Default::default());
        let loss = model.forward(images).corner.mean();
        GradientsParams::from_grads(loss.backward(), model)
    }

    fn load_like<O: Optimizer<TestNet, TestBackend>>(
        manager:  &CheckpointManager,
        tag:      &CheckpointTag,
        template: TestNet,
        _optim:   &O,
    ) -> OrchestratorResult<LoadedCheckpoint<TestNet, O::Record>> {
        manager.load::<TestBackend, TestNet, O::Record>(tag, template, &Default::default())
    }

    #[test]
    fn test_persist_then_load_is_bit_identical() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(tmp.path()).unwrap();

        // one optimizer step so Adam has non-trivial moments
        let mut optim = AdamConfig::new().init::<TestBackend, TestNet>();
        let model = net(25);
        let grads = grads_for(&model);
        let model = optim.step(1e-2, model, grads);

        let tag = CheckpointTag::Epoch(1);
        let meta = CheckpointMeta { epoch: 1, mean_loss: Some(0.5) };
        manager.persist::<TestBackend, _, _>(&tag, model.clone().into_record(), optim.to_record(), &meta).unwrap();

        let loaded = load_like(&manager, &tag, net(25), &optim).unwrap();
        assert_eq!(values(&loaded.model), values(&model));
        assert_eq!(loaded.meta, Some(meta));

        // same state, same next update, bit for bit
        let mut restored_optim = AdamConfig::new()
            .init::<TestBackend, TestNet>()
            .load_record(loaded.optimizer.expect("optimizer saved"));
        let next_original = optim.step(1e-2, model.clone(), grads_for(&model));
        let next_restored = restored_optim.step(1e-2, loaded.model.clone(), grads_for(&loaded.model));
        assert_eq!(values(&next_restored), values(&next_original));
    }

    #[test]
    fn test_missing_model_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(tmp.path()).unwrap();
        let optim = AdamConfig::new().init::<TestBackend, TestNet>();
        match load_like(&manager, &CheckpointTag::Best, net(25), &optim) {
            Err(OrchestratorError::CheckpointNotFound { tag, .. }) => assert_eq!(tag, "best"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected CheckpointNotFound"),
        }
    }

    #[test]
    fn test_missing_optimizer_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(tmp.path()).unwrap();
        let optim = AdamConfig::new().init::<TestBackend, TestNet>();
        let tag = CheckpointTag::Best;
        let meta = CheckpointMeta { epoch: 3, mean_loss: Some(1.0) };
        manager.persist::<TestBackend, _, _>(&tag, net(25).into_record(), optim.to_record(), &meta).unwrap();
        fs::remove_file(manager.optimizer_file(&tag)).unwrap();

        let loaded = load_like(&manager, &tag, net(25), &optim).unwrap();
        assert!(loaded.optimizer.is_none());
        assert_eq!(loaded.meta, Some(meta));
    }

    #[test]
    fn test_shape_mismatch_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(tmp.path()).unwrap();
        let optim = AdamConfig::new().init::<TestBackend, TestNet>();
        let tag = CheckpointTag::Best;
        let meta = CheckpointMeta { epoch: 1, mean_loss: Some(1.0) };
        manager.persist::<TestBackend, _, _>(&tag, net(21).into_record(), optim.to_record(), &meta).unwrap();

        match load_like(&manager, &tag, net(25), &optim) {
            Err(OrchestratorError::ShapeMismatch { expected, found, .. }) => {
                assert_ne!(expected, found);
                assert!(expected.contains(&25));
                assert!(found.contains(&21));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected ShapeMismatch"),
        }
    }

    #[test]
    fn test_epoch_tags_are_never_overwritten() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(tmp.path()).unwrap();
        let optim = AdamConfig::new().init::<TestBackend, TestNet>();
        let meta = CheckpointMeta { epoch: 100, mean_loss: Some(1.0) };

        let epoch = CheckpointTag::Epoch(100);
        manager.persist::<TestBackend, _, _>(&epoch, net(25).into_record(), optim.to_record(), &meta).unwrap();
        let again = manager.persist::<TestBackend, _, _>(&epoch, net(25).into_record(), optim.to_record(), &meta);
        assert!(matches!(again, Err(OrchestratorError::CheckpointExists { .. })));

        // "best" is a single slot and is replaced in place
        let best = CheckpointTag::Best;
        manager.persist::<TestBackend, _, _>(&best, net(25).into_record(), optim.to_record(), &meta).unwrap();
        let better = CheckpointMeta { epoch: 101, mean_loss: Some(0.5) };
        manager.persist::<TestBackend, _, _>(&best, net(25).into_record(), optim.to_record(), &better).unwrap();
        assert_eq!(manager.meta(&best), Some(better));
    }

    #[test]
    fn test_first_difference() {
        assert_eq!(first_difference(&[vec![1, 2]], &[vec![1, 2]]), None);
        assert_eq!(first_difference(&[vec![1], vec![2]], &[vec![1], vec![3]]), Some(1));
        assert_eq!(first_difference(&[vec![1]], &[vec![1], vec![2]]), Some(1));
    }
}
