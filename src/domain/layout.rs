// ============================================================
// Layer 3 — Channel Layout Contract
// ============================================================
// The corner head emits one channel per corner "slot". The slots
// are grouped into three contiguous blocks that the reconstruction
// stage reads by position:
//
//   [0 .. W)          wall-corner slots      (W = wall_corners)
//   [W .. W+8)        door/window endpoints  (always 8)
//   [W+8 .. W+12)     icon corners           (always 4)
//
// If the model's corner head does not have exactly W + 12 channels,
// slicing by position would hand the wrong maps to reconstruction
// without any visible failure, so the count is checked up front.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::domain::error::OrchestratorError;

/// Number of door/window endpoint slots.
pub const DOOR_ENDPOINT_SLOTS: usize = 8;

/// Number of icon corner slots.
pub const ICON_CORNER_SLOTS: usize = 4;

/// Default number of wall-corner slots.
pub const DEFAULT_WALL_CORNERS: usize = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLayout {
    wall_corners: usize,
}

impl ChannelLayout {
    pub fn new(wall_corners: usize) -> Self {
        Self { wall_corners }
    }

    pub fn wall_corners(&self) -> usize {
        self.wall_corners
    }

    /// Total corner channels the model must declare.
    pub fn total(&self) -> usize {
        self.wall_corners + DOOR_ENDPOINT_SLOTS + ICON_CORNER_SLOTS
    }

    pub fn wall_range(&self) -> Range<usize> {
        0..self.wall_corners
    }

    pub fn door_range(&self) -> Range<usize> {
        self.wall_corners..self.wall_corners + DOOR_ENDPOINT_SLOTS
    }

    pub fn icon_range(&self) -> Range<usize> {
        let start = self.wall_corners + DOOR_ENDPOINT_SLOTS;
        start..start + ICON_CORNER_SLOTS
    }

    /// The three slices in channel order.
    pub fn slices(&self) -> [Range<usize>; 3] {
        [self.wall_range(), self.door_range(), self.icon_range()]
    }

    /// Fails with `Layout` unless `declared_corner_channels == W + 12`.
    pub fn validate(&self, declared_corner_channels: usize) -> Result<(), OrchestratorError> {
        if declared_corner_channels != self.total() {
            return Err(OrchestratorError::Layout {
                wall_corners: self.wall_corners,
                expected: self.total(),
                declared: declared_corner_channels,
            });
        }
        Ok(())
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self::new(DEFAULT_WALL_CORNERS)
    }
}
