/**
 * Static accessibility analyzer for web front-end sources.
 *
 * Parses HTML/JSX, a JavaScript subset and CSS, lowers scripts into a
 * language-neutral Action IR, joins everything into a DocumentModel and
 * runs WCAG-mapped detectors over the merged model.
 */

// Core modules (root level)
pub mod chars;
pub mod config;
pub mod engine;
pub mod error;
pub mod parse_util;

// Parser modules
pub mod css;
pub mod dom;
pub mod script;

// Semantic modules
pub mod action;
pub mod interp;
pub mod model;

// Analysis modules
pub mod analyzer;

// Re-exports
pub use analyzer::finding::{
    AnalysisScope, Confidence, ConfidenceLevel, Finding, Fix, Location, Severity,
};
pub use config::AnalyzerConfig;
pub use engine::{AnalysisEngine, AnalysisReport, CancellationToken, SourceBundle, SourceText};
pub use error::{EngineError, Result};
pub use model::document::DocumentModel;
