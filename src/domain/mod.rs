// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits that describe what the orchestrator
// works with, independent of the tensor framework.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain structs, enums, and traits
//
// Everything here can be unit tested without a device.

// Fixed partition of the corner channel axis
pub mod layout;

// Per-step (corner, icon, room) losses
pub mod loss_record;

// "best" or epoch-numbered checkpoint keys
pub mod checkpoint_tag;

// Host-side heatmaps, images and ground truth
pub mod heatmap;

// Reconstructor and visualization seams
pub mod traits;

// Error taxonomy shared by every layer below the CLI
pub mod error;
