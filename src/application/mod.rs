// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer wires the other layers together for one command:
// it builds datasets, models and infra handles from a config
// and hands them to an orchestrator.
//
// Rules for this layer:
//   - No tensor math here
//   - No printing here (that's Layer 1)
//   - Errors carry context via anyhow
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// Validation and test-batch evaluation
pub mod evaluate_use_case;
