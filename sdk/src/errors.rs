//! Error types and handling
//!
//! This module provides the error taxonomy shared by the Scribe engine and
//! anything built on top of it. All errors implement the `ScribeErrorExt`
//! trait which provides user-friendly hints and indicates whether errors
//! are recoverable.
//!
//! Only `InvalidConfiguration` (and the file/database errors of the outer
//! application) ever escape a pipeline run. Engine and parsing failures are
//! folded into error-marked payloads by the reasoning loop.

use thiserror::Error;

/// Trait for Scribe error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information.
pub trait ScribeErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain
    /// secrets or raw engine output.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors require the caller to change its input or configuration.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: invalid pipeline definitions, bad config files
/// - **Reasoning engine**: transport failures and malformed output
/// - **Pipeline**: exhausted steps, payloads that fail validation
/// - **Storage**: run history and report output
///
/// # Examples
///
/// ```
/// use scribe_sdk::errors::{EngineError, ScribeErrorExt};
///
/// let error = EngineError::EngineUnavailable("connection refused".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::InvalidConfiguration("max_iterations must be >= 1".into());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Reasoning engine errors
    #[error("Reasoning engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    // Pipeline errors
    #[error("Step '{step}' exhausted after {iterations} iterations without completing")]
    StepExhausted { step: String, iterations: u32 },

    #[error("Invalid payload for '{field}': {reason}")]
    InvalidPayload { field: String, reason: String },

    // Storage errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScribeErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            // Configuration errors
            Self::InvalidConfiguration(_) => "Fix the pipeline settings before starting a run",
            Self::Config(_) => "Check your config.toml file for errors",

            // Reasoning engine errors
            Self::EngineUnavailable(_) => {
                "Reasoning engine unavailable. Check your API key, provider and network"
            }
            Self::MalformedResponse(_) => "The model returned output that could not be read",

            // Pipeline errors
            Self::StepExhausted { .. } => {
                "Step did not finish within its iteration cap. Try raising max_iterations"
            }
            Self::InvalidPayload { .. } => "The model returned a result with the wrong shape",

            // Storage errors
            Self::Serialization(_) => "Failed to encode or decode a result",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::InvalidConfiguration(_) | Self::Config(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}
