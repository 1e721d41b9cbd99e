// ============================================================
// Layer 3 — LossRecord
// ============================================================
// One row of per-head losses for a single step. The training
// objective is always the plain sum of the three entries.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LossRecord {
    pub corner: f64,
    pub icon:   f64,
    pub room:   f64,
}

impl LossRecord {
    pub fn new(corner: f64, icon: f64, room: f64) -> Self {
        Self { corner, icon, room }
    }

    /// Sum of the three head losses.
    pub fn total(&self) -> f64 {
        self.corner + self.icon + self.room
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.corner, self.icon, self.room]
    }

    /// Element-wise mean over `records`, or `None` when empty.
    pub fn mean(records: &[LossRecord]) -> Option<LossRecord> {
        if records.is_empty() {
            return None;
        }
        let n = records.len() as f64;
        let sum = records.iter().fold(LossRecord::default(), |acc, r| LossRecord {
            corner: acc.corner + r.corner,
            icon:   acc.icon + r.icon,
            room:   acc.room + r.room,
        });
        Some(LossRecord::new(sum.corner / n, sum.icon / n, sum.room / n))
    }
}

impl std::fmt::Display for LossRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5} {:.5} {:.5}", self.corner, self.icon, self.room)
    }
}
