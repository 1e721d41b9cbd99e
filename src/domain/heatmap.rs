// ============================================================
// Layer 3 — Heatmap Domain Types
// ============================================================
// Plain host-side arrays that cross the boundaries of the
// orchestrator: ground truth coming in from the dataset and
// probability maps going out to reconstruction.
//
// Heatmaps wrap an ndarray in [height, width, channels] order,
// so all channels of one pixel are adjacent in logical order.

use ndarray::Array3;

/// A [height, width, channels] array of per-pixel scores.
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap(Array3<f32>);

impl Heatmap {
    pub fn filled(height: usize, width: usize, channels: usize, value: f32) -> Self {
        Self(Array3::from_elem((height, width, channels), value))
    }

    /// Build from a channel-first [channels, height, width] array.
    pub fn from_chw(chw: Array3<f32>) -> Self {
        Self(chw.permuted_axes([1, 2, 0]).as_standard_layout().into_owned())
    }

    pub fn shape(&self) -> [usize; 3] {
        let (h, w, c) = self.0.dim();
        [h, w, c]
    }

    pub fn channels(&self) -> usize {
        self.0.dim().2
    }

    pub fn array(&self) -> &Array3<f32> {
        &self.0
    }

    pub fn array_mut(&mut self) -> &mut Array3<f32> {
        &mut self.0
    }
}

impl From<Array3<f32>> for Heatmap {
    fn from(values: Array3<f32>) -> Self {
        Self(values)
    }
}

/// Normalised RGB image in [channels, height, width] order.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub height: usize,
    pub width:  usize,
    pub pixels: Vec<f32>,
}

impl Image {
    pub const CHANNELS: usize = 3;

    pub fn new(height: usize, width: usize, pixels: Vec<f32>) -> Option<Self> {
        if pixels.len() != Self::CHANNELS * height * width {
            return None;
        }
        Some(Self { height, width, pixels })
    }
}

/// Ground truth for the three heads of one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapTargets {
    pub corner: Heatmap,
    pub icon:   Heatmap,
    pub room:   Heatmap,
}

/// Everything reconstruction needs for one floor plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanHeatmaps {
    pub wall_corners:   Heatmap,
    pub door_endpoints: Heatmap,
    pub icon_corners:   Heatmap,
    pub icon_classes:   Heatmap,
    pub room_classes:   Heatmap,
}
