//! Execution interpreter
//!
//! Strictly synchronous tree-walking evaluator over the Action IR with a
//! simulated host (console, standard objects, and an optional
//! deterministic mock DOM with recorded timers and effects). Used by rules
//! that must observe behavior rather than syntax.

pub mod host;
pub mod machine;
pub mod outcome;
pub mod scope;
pub mod value;

pub use machine::{DomEffect, Interpreter, ScheduledTimer, TimerKind};
pub use outcome::EvalOutcome;
pub use scope::{Binding, BindingKind, Scope, ScopeRef};
pub use value::{FunctionValue, ObjectData, Value};
