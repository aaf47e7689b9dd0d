//! Per-run analyzer configuration

use serde::Deserialize;

use crate::analyzer::finding::Severity;

/// Options accepted for one analysis run. Loadable from JSON by front-ends.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Interpreter cap: iterations allowed for a single loop.
    pub max_iterations: usize,
    /// Interpreter cap: call-stack depth.
    pub max_call_depth: usize,
    /// Bind the mock DOM host (`window`, `document`, timers) at root scope.
    pub enable_dom_simulation: bool,
    /// Findings below this severity are dropped from the report.
    pub min_severity: Severity,
    /// Globs selecting project files; empty means everything.
    pub include_patterns: Vec<String>,
    /// Globs removing project files after inclusion.
    pub exclude_patterns: Vec<String>,
    /// Hard cap on files considered by a workspace crawl.
    pub max_project_files: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            max_iterations: 100_000,
            max_call_depth: 1_000,
            enable_dom_simulation: true,
            min_severity: Severity::Info,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            max_project_files: 2_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_use_documented_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.max_iterations, 100_000);
        assert_eq!(config.max_call_depth, 1_000);
        assert!(config.enable_dom_simulation);
        assert_eq!(config.min_severity, Severity::Info);
    }

    #[test]
    fn should_deserialize_partial_json() {
        let config: AnalyzerConfig =
            serde_json::from_str(r#"{"max_iterations": 50, "min_severity": "warning"}"#).unwrap();
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.min_severity, Severity::Warning);
        assert_eq!(config.max_call_depth, 1_000);
    }
}
