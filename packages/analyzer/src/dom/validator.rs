//! Markup validator
//!
//! Structural accessibility checks that need no script or style context:
//! images without alternative text, buttons without an accessible label,
//! and ARIA attributes outside the recognized vocabulary. All diagnostics
//! share the `validator` kind.

use crate::analyzer::finding::{
    kinds, AnalysisScope, Confidence, ConfidenceLevel, Finding, Location, Severity,
};

use super::model::{DomFragment, NodeId};

/// Recognized ARIA attribute names.
pub const ARIA_ALLOWLIST: &[&str] = &[
    "aria-label",
    "aria-labelledby",
    "aria-describedby",
    "aria-expanded",
    "aria-hidden",
    "aria-live",
    "aria-controls",
    "aria-haspopup",
    "aria-selected",
    "aria-checked",
    "aria-disabled",
    "aria-readonly",
    "aria-required",
    "aria-invalid",
    "aria-multiselectable",
    "aria-orientation",
    "aria-valuemin",
    "aria-valuemax",
    "aria-valuenow",
    "aria-valuetext",
    "aria-pressed",
    "aria-modal",
    "aria-current",
    "aria-atomic",
    "aria-relevant",
    "aria-busy",
];

pub fn is_valid_aria_attribute(name: &str) -> bool {
    ARIA_ALLOWLIST.contains(&name)
}

/// Validate one fragment, emitting `validator` diagnostics.
pub fn validate_fragment(fragment: &DomFragment, scope: AnalysisScope) -> Vec<Finding> {
    let mut diagnostics = Vec::new();
    for id in fragment.get_all_elements() {
        check_element(fragment, id, scope, &mut diagnostics);
    }
    diagnostics
}

fn check_element(
    fragment: &DomFragment,
    id: NodeId,
    scope: AnalysisScope,
    out: &mut Vec<Finding>,
) {
    let el = match fragment.element(id) {
        Some(el) => el,
        None => return,
    };
    let location = location_of(fragment, id);
    let confidence = Confidence::new(ConfidenceLevel::High, "markup validation", scope);

    if el.tag_name == "img" && el.attr("alt").is_none() {
        out.push(
            Finding::new(
                kinds::VALIDATOR,
                Severity::Warning,
                "Image is missing alternative text (`alt`)",
                location.clone(),
                confidence.clone(),
            )
            .with_wcag(&["1.1.1"]),
        );
    }

    let is_button = el.tag_name == "button" || el.attr("role") == Some("button");
    if is_button && fragment.accessible_label(id).is_none() {
        out.push(
            Finding::new(
                kinds::VALIDATOR,
                Severity::Warning,
                "Button has no accessible label",
                location.clone(),
                confidence.clone(),
            )
            .with_wcag(&["4.1.2"]),
        );
    }

    for name in el.attributes.keys() {
        if name.starts_with("aria-") && !is_valid_aria_attribute(name) {
            out.push(
                Finding::new(
                    kinds::VALIDATOR,
                    Severity::Warning,
                    format!("Unknown ARIA attribute \"{}\"", name),
                    location.clone(),
                    confidence.clone(),
                )
                .with_wcag(&["4.1.2"]),
            );
        }
    }
}

fn location_of(fragment: &DomFragment, id: NodeId) -> Location {
    match &fragment.node(id).span {
        Some(span) => Location::from_span(span),
        None => Location::new(fragment.source_path.clone(), 1, 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parser::MarkupParser;

    fn validate(html: &str) -> Vec<Finding> {
        let result = MarkupParser::new().parse(html, "test.html");
        result
            .fragments
            .iter()
            .flat_map(|f| validate_fragment(f, AnalysisScope::File))
            .collect()
    }

    #[test]
    fn should_flag_image_without_alt() {
        let diagnostics = validate("<div><img src=\"x.png\"></div>");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("alternative text"));
        assert_eq!(diagnostics[0].wcag_criteria, vec!["1.1.1".to_string()]);
    }

    #[test]
    fn should_accept_image_with_alt() {
        assert!(validate("<img src=\"x.png\" alt=\"Logo\">").is_empty());
    }

    #[test]
    fn should_flag_unlabeled_button() {
        let diagnostics = validate("<button></button>");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("accessible label"));
    }

    #[test]
    fn should_accept_button_with_aria_label() {
        assert!(validate("<button aria-label=\"Close\"></button>").is_empty());
    }

    #[test]
    fn should_flag_unknown_aria_attribute() {
        let diagnostics = validate("<div aria-bogus=\"1\">x</div>");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("aria-bogus"));
    }
}
