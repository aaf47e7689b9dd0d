//! Action IR
//!
//! Language-neutral semantic tree of program behavior. Scripts are lowered
//! into this representation so every downstream consumer (interpreter,
//! integrator, rules) is independent of the source language.

pub mod ir;
pub mod patterns;
pub mod transform;

pub use ir::{Action, ActionChild, ActionKind, ActionSchema, ActionTree, AttrValue, ChildRole};
pub use patterns::CallPattern;
pub use transform::lower_program;
