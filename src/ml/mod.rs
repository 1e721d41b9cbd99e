// ============================================================
// Layer 5 — ML Layer (Burn)
// ============================================================
// Everything that runs tensors through the model:
//
//   model.rs     — HeatmapModel seam + FloorplanNet baseline
//   loss.rs      — Stable BCE-with-logits per head, summed
//   labels.rs    — Argmax label maps for visualization
//   trainer.rs   — TrainingOrchestrator: epochs, steps,
//                  resume and checkpoint policy
//   evaluator.rs — EvaluationOrchestrator: probabilities,
//                  layout slicing, reconstruction hand-off
//
// Training runs on TrainingBackend (autodiff); evaluation runs on
// InferenceBackend so no graph is recorded.
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

#[cfg(feature = "wgpu")]
pub type InferenceBackend = burn::backend::Wgpu;
#[cfg(not(feature = "wgpu"))]
pub type InferenceBackend = burn::backend::NdArray;

pub type TrainingBackend = burn::backend::Autodiff<InferenceBackend>;

/// Model seam and baseline architecture
pub mod model;

/// Multi-head loss
pub mod loss;

/// Argmax label maps
pub mod labels;

/// Training orchestrator
pub mod trainer;

/// Evaluation orchestrator
pub mod evaluator;
