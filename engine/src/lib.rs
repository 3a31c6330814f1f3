//! Scribe Engine Library
//!
//! Turns a meeting transcript into a set of structured artifacts by running
//! a fixed pipeline of bounded reasoning steps. Used by the `scribe` binary
//! and by the integration tests.

/// Configuration management module
pub mod config;

/// Database persistence module
pub mod db;

/// Reasoning engine abstraction layer
pub mod llm;

/// Reasoning loop module
pub mod agent;

/// Per-step decision strategies
pub mod strategies;

/// Pipeline orchestration module
pub mod conductor;

/// Report writer
pub mod report;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
