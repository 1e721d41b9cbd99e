// ============================================================
// Layer 6 — Reconstruction Artifact Writer
// ============================================================
// The Reconstructor this binary ships with. It does not vectorise
// anything itself; it persists the five post-processed heatmap
// stacks plus the threshold settings so an external reconstruction
// tool can pick them up:
//
//   <prefix>wall_corners.npy     [H, W, wall slots]
//   <prefix>door_endpoints.npy   [H, W, 8]
//   <prefix>icon_corners.npy     [H, W, 4]
//   <prefix>icon_classes.npy     [H, W, icon classes]
//   <prefix>room_classes.npy     [H, W, room classes]
//   <prefix>reconstruction.json  thresholds

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::domain::heatmap::PlanHeatmaps;
use crate::domain::traits::{ReconstructionThresholds, Reconstructor};
use crate::infra::npy;

#[derive(Debug, Default, Clone, Copy)]
pub struct NpyArtifactWriter;

/// `<prefix><name>`, appended to the file name rather than joined.
pub fn prefixed(prefix: &Path, name: &str) -> PathBuf {
    let mut path = OsString::from(prefix.as_os_str());
    path.push(name);
    PathBuf::from(path)
}

impl Reconstructor for NpyArtifactWriter {
    fn reconstruct(
        &self,
        heatmaps:      &PlanHeatmaps,
        output_prefix: &Path,
        thresholds:    &ReconstructionThresholds,
    ) -> Result<()> {
        if let Some(parent) = output_prefix.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create output directory '{}'", parent.display()))?;
        }

        let stacks = [
            ("wall_corners", &heatmaps.wall_corners),
            ("door_endpoints", &heatmaps.door_endpoints),
            ("icon_corners", &heatmaps.icon_corners),
            ("icon_classes", &heatmaps.icon_classes),
            ("room_classes", &heatmaps.room_classes),
        ];
        for (name, map) in stacks {
            let path = prefixed(output_prefix, &format!("{name}.npy"));
            npy::write_hwc(&path, map)?;
        }

        let path = prefixed(output_prefix, "reconstruction.json");
        fs::write(&path, serde_json::to_string_pretty(thresholds)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::debug!("Wrote reconstruction inputs with prefix '{}'", output_prefix.display());
        Ok(())
    }
}
