// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between files on disk and device tensors:
//
//   <split>/images/*.png + <split>/targets/*.npy
//       │
//       ▼
//   FloorplanDataset  → implements Burn's Dataset trait
//       │
//       ▼
//   Prefetcher        → worker pool, bounded queue of sample batches
//       │
//       ▼
//   FloorplanBatcher  → stacks samples into tensors (primary thread)
//
// Augmentation is not done here; the dataset only decodes,
// resizes and normalises.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Directory-backed floor-plan samples
pub mod dataset;

/// Implements Burn's Batcher trait for floor-plan samples
pub mod batcher;

/// Worker pool feeding the training loop through a bounded queue
pub mod prefetch;
