//! CSS model
//!
//! Cascade-aware rule sets parsed from stylesheets: specificity-ordered
//! matching, pseudo-class extraction and derived accessibility impact
//! flags (focus, visibility, contrast, interaction).

pub mod model;
pub mod parser;

pub use model::{CssModel, CssRule, PseudoClass, RuleImpact, RuleType, Specificity};
pub use parser::CssParser;
