//! Engine error taxonomy
//!
//! Every error is bounded to the smallest unit that can proceed without it
//! (one handler, one rule, one file); an analysis run always returns a
//! complete report plus a sidecar diagnostics list.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The source did not parse; no rules run on that file.
    #[error("parse error in {file}: {message}")]
    Parse { file: String, message: String },

    /// An AST kind the transformer does not recognize. A generic Action is
    /// emitted and analysis continues.
    #[error("transform: unrecognized syntax kind `{kind}`")]
    Transform { kind: String },

    /// Interpreter safety cap exceeded or an unhandled throw escaped a
    /// top-level evaluation; the owning rule skips that handler.
    #[error("interpreter: {0}")]
    Interpreter(#[from] InterpreterError),

    /// A handler selector resolved to zero elements in document scope.
    /// Surfaced as an `orphaned-event-handler` finding, not an engine error.
    #[error("unresolved reference: {selector}")]
    Reference { selector: String },

    /// Internal invariant violation; escalated as a single validator
    /// diagnostic with the offending span.
    #[error("model invariant violated: {message}")]
    Model { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpreterError {
    #[error("loop iteration limit of {limit} exceeded")]
    IterationLimit { limit: usize },

    #[error("call depth limit of {limit} exceeded")]
    CallDepth { limit: usize },

    #[error("uncaught exception: {message}")]
    UncaughtThrow { message: String },

    #[error("evaluation cancelled")]
    Cancelled,
}
