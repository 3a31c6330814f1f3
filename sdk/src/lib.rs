//! Scribe SDK
//!
//! Shared error taxonomy and step payload types. The engine depends on
//! this crate, and so can anything that consumes its result sets.

/// Error types and handling
pub mod errors;

/// Step payload types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, ScribeErrorExt};
pub use types::{
    ArticleOutline, DegradedPayload, MeetingNotes, OutlineSection, PayloadKind, Priority,
    RepoPlan, StepPayload, TodoItem, TodoList,
};
