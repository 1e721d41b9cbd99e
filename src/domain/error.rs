// ============================================================
// Layer 3 — Orchestrator Errors
// ============================================================
// Every failure the training/evaluation core can report.
// None of these are retried: the application layer attaches
// context with anyhow and the run terminates.

use std::path::PathBuf;

use thiserror::Error;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("failed to load sample {index}: {reason}")]
    DataLoad { index: usize, reason: String },

    #[error("checkpoint '{tag}' not found at {}", path.display())]
    CheckpointNotFound { tag: String, path: PathBuf },

    #[error("checkpoint '{tag}' already exists at {} and epoch checkpoints are never overwritten", path.display())]
    CheckpointExists { tag: String, path: PathBuf },

    #[error(
        "checkpoint '{tag}' does not fit the current model: parameter #{param} has shape {found:?}, model declares {expected:?}"
    )]
    ShapeMismatch {
        tag: String,
        param: usize,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error(
        "channel layout mismatch: {wall_corners} wall corners + 12 fixed slots = {expected} corner channels, model declares {declared}"
    )]
    Layout {
        wall_corners: usize,
        expected: usize,
        declared: usize,
    },

    #[error("{head} head produced {found} channels, model declares {declared}")]
    HeadChannelMismatch {
        head: &'static str,
        declared: usize,
        found: usize,
    },

    #[error("precomputed room heatmap for '{stem}' unusable ({}): {reason}", path.display())]
    ExternalSource {
        stem: String,
        path: PathBuf,
        reason: String,
    },

    #[error("reconstruction failed for output prefix {}: {reason}", prefix.display())]
    Reconstruction { prefix: PathBuf, reason: String },

    #[error("recorder error at {}: {reason}", path.display())]
    Record { path: PathBuf, reason: String },

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid orchestrator state: {0}")]
    InvalidState(String),
}

impl OrchestratorError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
