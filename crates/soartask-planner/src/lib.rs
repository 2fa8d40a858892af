/*
[INPUT]:  Public API exports for soartask-planner crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod aat;
pub mod abort;
pub mod config;
pub mod error;
pub mod flight;
pub mod persistence;
pub mod planner;
pub mod task;

// Re-export main types for convenience
pub use abort::{AbortRequest, TaskMode};
pub use config::{PlannerConfig, TaskSettings};
pub use error::{Result, TaskError};
pub use flight::{EditSessionFlag, GlidePolarSettings, GlideSettings, TargetEditSession};
pub use planner::Planner;
pub use task::{MutationOutcome, TaskState, TaskStore};
