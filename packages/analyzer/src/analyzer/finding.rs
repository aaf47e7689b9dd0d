//! Finding records
//!
//! The analyzer's output shape: WCAG-mapped issues with source locations,
//! severity, confidence and an optional suggested fix. Serialization
//! follows the published wire format field for field.

use serde::{Deserialize, Serialize};

use crate::parse_util::Span;

/// Which model backed the analysis that produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisScope {
    File,
    Page,
    Workspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub level: ConfidenceLevel,
    pub reason: String,
    pub scope: AnalysisScope,
}

impl Confidence {
    pub fn new(level: ConfidenceLevel, reason: impl Into<String>, scope: AnalysisScope) -> Self {
        Confidence {
            level,
            reason: reason.into(),
            scope,
        }
    }

    /// Document-scope confidence derived from tree completeness.
    pub fn from_completeness(completeness: f64, scope: AnalysisScope) -> Self {
        let (level, reason) = if completeness >= 0.9 {
            (
                ConfidenceLevel::High,
                format!("document model is {:.0}% complete", completeness * 100.0),
            )
        } else if completeness >= 0.5 {
            (
                ConfidenceLevel::Medium,
                format!("document model is only {:.0}% complete", completeness * 100.0),
            )
        } else {
            (
                ConfidenceLevel::Low,
                format!("document model is fragmented ({:.0}% complete)", completeness * 100.0),
            )
        };
        Confidence::new(level, reason, scope)
    }

    /// File-scope fallback when no document model is available.
    pub fn file_scope_fallback() -> Self {
        Confidence::new(
            ConfidenceLevel::Medium,
            "single-file analysis without document context",
            AnalysisScope::File,
        )
    }

    pub fn heuristic(reason: impl Into<String>) -> Self {
        Confidence::new(ConfidenceLevel::Low, reason, AnalysisScope::File)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Location {
            file: file.into(),
            line,
            column,
            length: None,
        }
    }

    pub fn from_span(span: &Span) -> Self {
        let (line, column) = span.start_line_col();
        Location {
            file: span.file.path.clone(),
            line,
            column,
            length: Some(span.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub description: String,
    pub code: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    pub related_locations: Vec<Location>,
    pub wcag_criteria: Vec<String>,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
}

impl Finding {
    pub fn new(
        kind: &str,
        severity: Severity,
        message: impl Into<String>,
        location: Location,
        confidence: Confidence,
    ) -> Self {
        Finding {
            kind: kind.to_string(),
            severity,
            message: message.into(),
            location,
            related_locations: Vec::new(),
            wcag_criteria: Vec::new(),
            confidence,
            fix: None,
        }
    }

    pub fn with_wcag(mut self, criteria: &[&str]) -> Self {
        self.wcag_criteria = criteria.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_related(mut self, location: Location) -> Self {
        self.related_locations.push(location);
        self
    }

    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self
    }
}

/// Stable ordering within a run: source file, then primary location
/// ascending, ties broken by kind.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        a.location
            .file
            .cmp(&b.location.file)
            .then(a.location.line.cmp(&b.location.line))
            .then(a.location.column.cmp(&b.location.column))
            .then(a.kind.cmp(&b.kind))
    });
}

/// Closed catalogue of finding kinds.
pub mod kinds {
    pub const MOUSE_ONLY_CLICK: &str = "mouse-only-click";
    pub const MISSING_ESCAPE_HANDLER: &str = "missing-escape-handler";
    pub const INCOMPLETE_ACTIVATION_KEYS: &str = "incomplete-activation-keys";
    pub const TOUCH_WITHOUT_CLICK: &str = "touch-without-click";
    pub const STATIC_ARIA_STATE: &str = "static-aria-state";
    pub const ARIA_REFERENCE_NOT_FOUND: &str = "aria-reference-not-found";
    pub const MISSING_LIVE_REGION: &str = "missing-live-region";
    pub const UNEXPECTED_FORM_SUBMIT: &str = "unexpected-form-submit";
    pub const UNEXPECTED_NAVIGATION: &str = "unexpected-navigation";
    pub const UNANNOUNCED_TIMEOUT: &str = "unannounced-timeout";
    pub const UNCONTROLLED_AUTO_UPDATE: &str = "uncontrolled-auto-update";
    pub const NON_SEMANTIC_BUTTON: &str = "non-semantic-button";
    pub const NON_SEMANTIC_LINK: &str = "non-semantic-link";
    pub const ORPHANED_EVENT_HANDLER: &str = "orphaned-event-handler";
    pub const MISSING_ARIA_CONNECTION: &str = "missing-aria-connection";
    pub const FOCUS_ORDER_CONFLICT: &str = "focus-order-conflict";
    pub const VISIBILITY_FOCUS_CONFLICT: &str = "visibility-focus-conflict";
    pub const FOCUS_MANAGEMENT_ISSUE: &str = "focus-management-issue";
    pub const KEYBOARD_NAVIGATION_ISSUE: &str = "keyboard-navigation-issue";
    pub const VALIDATOR: &str = "validator";

    /// `incomplete-<pattern>-pattern` kind for a widget pattern name.
    pub fn incomplete_pattern(pattern: &str) -> String {
        format!("incomplete-{}-pattern", pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_wire_shape() {
        let finding = Finding::new(
            kinds::MOUSE_ONLY_CLICK,
            Severity::Warning,
            "Click handler without keyboard support",
            Location::new("app.js", 3, 1),
            Confidence::new(ConfidenceLevel::High, "complete model", AnalysisScope::Page),
        )
        .with_wcag(&["2.1.1"]);
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["kind"], "mouse-only-click");
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["confidence"]["level"], "HIGH");
        assert_eq!(json["confidence"]["scope"], "page");
        assert_eq!(json["wcag_criteria"][0], "2.1.1");
        assert!(json.get("fix").is_none());
    }

    #[test]
    fn should_order_by_file_location_then_kind() {
        let confidence = Confidence::file_scope_fallback();
        let mut findings = vec![
            Finding::new("b-kind", Severity::Warning, "", Location::new("b.js", 1, 1), confidence.clone()),
            Finding::new("z-kind", Severity::Warning, "", Location::new("a.js", 2, 1), confidence.clone()),
            Finding::new("a-kind", Severity::Warning, "", Location::new("a.js", 2, 1), confidence),
        ];
        sort_findings(&mut findings);
        assert_eq!(findings[0].kind, "a-kind");
        assert_eq!(findings[1].kind, "z-kind");
        assert_eq!(findings[2].location.file, "b.js");
    }

    #[test]
    fn should_map_completeness_to_confidence_levels() {
        let scope = AnalysisScope::Page;
        assert_eq!(Confidence::from_completeness(0.95, scope).level, ConfidenceLevel::High);
        assert_eq!(Confidence::from_completeness(0.7, scope).level, ConfidenceLevel::Medium);
        assert_eq!(Confidence::from_completeness(0.3, scope).level, ConfidenceLevel::Low);
    }
}
