//! Reasoning Loop
//!
//! This module implements the bounded Sense-Plan-Act-Observe-Reflect loop
//! that runs a single pipeline step. The loop is generic over a
//! [`DecisionStrategy`]; the strategy is the only part that talks to the
//! reasoning engine.

pub mod action;
pub mod core;
pub mod interpreter;
pub mod reflector;

pub use action::{Action, Completion, DecisionStrategy, Fallback, PriorIteration, Signal, Snapshot};
pub use core::{Phase, ReasoningRecord, ReasoningStep, StepOutput, StepResult, StepState};
pub use interpreter::{InterpretationError, Record, ResponseInterpreter};
pub use reflector::{Reflector, Verdict};
