// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem on behalf of the
// orchestrators:
//
//   checkpoint.rs        — Tagged model + optimizer snapshots
//                          (BinFileRecorder, full precision),
//                          epoch sidecars and train_config.json.
//
//   loss_log.rs          — Per-step head losses as CSV rows,
//                          flushed after every step.
//
//   npy.rs               — NumPy array I/O shared by the modules
//                          below and the dataset.
//
//   precomputed_rooms.rs — Externally produced room heatmaps,
//                          keyed by sample file stem.
//
//   artifacts.rs         — The shipped Reconstructor: writes the
//                          post-processed heatmap stacks to disk.
//
//   visualization.rs     — Non-blocking visualization sink with
//                          a PNG writer thread.
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Per-step loss CSV
pub mod loss_log;

/// NumPy `.npy` helpers
pub mod npy;

/// Precomputed room-class heatmaps
pub mod precomputed_rooms;

/// Heatmap artifacts for external reconstruction
pub mod artifacts;

/// Bounded-queue visualization sink
pub mod visualization;
