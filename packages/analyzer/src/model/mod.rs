//! DocumentModel integrator
//!
//! Joins DOM fragments with extracted script handler bindings and CSS
//! rules, derives per-element contexts and scores how complete and
//! reference-resolved the merged model is.

pub mod context;
pub mod document;
pub mod handler;

pub use context::ElementContext;
pub use document::{DocumentModel, ElementKey};
pub use handler::{ActionLanguageModel, ActionType, HandlerBinding, Timing};
