use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Key under which a model/optimizer snapshot is stored.
///
/// `Best` is a single slot that is overwritten whenever the epoch-mean
/// loss improves. `Epoch(n)` slots are written once and never touched
/// again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckpointTag {
    Best,
    Epoch(usize),
}

impl CheckpointTag {
    pub fn is_overwritable(&self) -> bool {
        matches!(self, CheckpointTag::Best)
    }
}

impl fmt::Display for CheckpointTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointTag::Best => write!(f, "best"),
            CheckpointTag::Epoch(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for CheckpointTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "best" {
            return Ok(CheckpointTag::Best);
        }
        s.parse::<usize>()
            .map(CheckpointTag::Epoch)
            .map_err(|_| format!("checkpoint tag must be 'best' or an epoch number, got '{s}'"))
    }
}
