// ============================================================
// Layer 6 — Precomputed Room Heatmaps
// ============================================================
// Room-class maps produced outside this crate by a dedicated
// segmentation model. One file per sample:
//
//   <dir>/<stem>.npy   [channels, height, width] float32 scores
//
// Loaded maps are transposed to [height, width, channels] and
// normalised with a softmax over channels. A missing, unreadable
// or mis-sized file is an error; there is no zero fallback.

use std::path::{Path, PathBuf};

use ndarray::Axis;

use crate::domain::error::{OrchestratorError, OrchestratorResult};
use crate::domain::heatmap::Heatmap;
use crate::infra::npy;

#[derive(Debug, Clone)]
pub struct PrecomputedRoomStore {
    dir: PathBuf,
}

impl PrecomputedRoomStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.npy"))
    }

    /// Load the room heatmap for `stem`, requiring the given spatial size.
    pub fn load(&self, stem: &str, height: usize, width: usize) -> OrchestratorResult<Heatmap> {
        let path = self.path_for(stem);
        let fail = |reason: String| OrchestratorError::ExternalSource {
            stem: stem.to_string(),
            path: path.clone(),
            reason,
        };

        if !path.exists() {
            return Err(fail("file not found".to_string()));
        }
        let mut map = npy::read_chw_as_hwc(&path).map_err(|e| fail(format!("{e:#}")))?;
        let [h, w, _] = map.shape();
        if (h, w) != (height, width) {
            return Err(fail(format!(
                "spatial size {h}x{w} does not match model output {height}x{width}"
            )));
        }
        if map.channels() == 0 {
            return Err(fail("array has no channels".to_string()));
        }

        softmax_channels(&mut map);
        tracing::debug!("Loaded precomputed rooms for '{}' ({} classes)", stem, map.channels());
        Ok(map)
    }
}

/// Per-pixel softmax over the channel axis.
pub fn softmax_channels(map: &mut Heatmap) {
    for mut pixel in map.array_mut().lanes_mut(Axis(2)) {
        let max = pixel.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        pixel.mapv_inplace(|v| (v - max).exp());
        let sum = pixel.sum();
        pixel /= sum;
    }
}
