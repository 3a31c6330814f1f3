//! Conductor
//!
//! Runs the fixed sequence of reasoning steps over a transcript, threading
//! an accumulating [`Context`] from one step to the next.

pub mod context;
pub mod orchestrator;
pub mod pipeline;
pub mod types;

pub use context::{Context, ContextValue, TRANSCRIPT_KEY};
pub use orchestrator::Orchestrator;
pub use pipeline::{default_pipeline, PipelineStep};
pub use types::{ResultSet, RunState, StepReport};
