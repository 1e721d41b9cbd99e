// ============================================================
// Layer 3 — Core Traits (Collaborator Seams)
// ============================================================
// The orchestrator talks to its downstream collaborators only
// through these traits:
//
//   Reconstructor     → turns post-processed heatmaps into
//                       floor-plan artifacts on disk
//   VisualizationSink → receives periodic debug snapshots;
//                       must never hold up a training step
//
// Implementations live in the infra layer (NpyArtifactWriter,
// ChannelSink) or in tests (recording fakes).

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::heatmap::PlanHeatmaps;
use crate::domain::loss_record::LossRecord;

// ─── Reconstruction ──────────────────────────────────────────────────────────
/// Tuning knobs forwarded verbatim to the reconstruction stage.
///
/// `None` thresholds and negative distances mean "use the
/// reconstructor's own default".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionThresholds {
    pub wall_heatmap:       Option<f32>,
    pub door_heatmap:       Option<f32>,
    pub icon_heatmap:       Option<f32>,
    pub gap:                f32,
    pub distance:           f32,
    pub length:             f32,
    pub enable_augmentation: bool,
}

impl Default for ReconstructionThresholds {
    fn default() -> Self {
        Self {
            wall_heatmap:        None,
            door_heatmap:        None,
            icon_heatmap:        None,
            gap:                 -1.0,
            distance:            -1.0,
            length:              -1.0,
            enable_augmentation: true,
        }
    }
}

pub trait Reconstructor {
    /// Write the floor-plan artifacts for one sample. Every file
    /// produced is named `<output_prefix><artifact>`.
    fn reconstruct(
        &self,
        heatmaps:      &PlanHeatmaps,
        output_prefix: &Path,
        thresholds:    &ReconstructionThresholds,
    ) -> Result<()>;
}

// ─── Visualization ───────────────────────────────────────────────────────────
/// Argmax label maps for one batch, one `Vec` per sample,
/// each of length height * width.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabelMaps {
    pub corner: Vec<Vec<u32>>,
    pub icon:   Vec<Vec<u32>>,
    pub room:   Vec<Vec<u32>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationRequest {
    /// Output name stem, e.g. "train_e3_s500" or a sample stem.
    pub name:         String,
    pub height:       usize,
    pub width:        usize,
    pub predicted:    LabelMaps,
    pub ground_truth: Option<LabelMaps>,
    pub loss:         Option<LossRecord>,
}

pub trait VisualizationSink: Send {
    /// Hand off a request. Implementations must return after a
    /// bounded amount of work and may drop the request.
    fn submit(&self, request: VisualizationRequest);
}

/// Sink that drops every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl VisualizationSink for DiscardSink {
    fn submit(&self, _request: VisualizationRequest) {}
}
