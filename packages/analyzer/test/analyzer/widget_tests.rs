/**
 * Widget pattern tests
 *
 * Catalogue-driven composite checks: structure, state attributes,
 * keyboard behavior and cross-references.
 */

#[cfg(test)]
mod tests {
    use a11y_analyzer::action::lower_program;
    use a11y_analyzer::analyzer::finding::{kinds, AnalysisScope, Finding};
    use a11y_analyzer::analyzer::{run_rules, AnalyzerContext};
    use a11y_analyzer::config::AnalyzerConfig;
    use a11y_analyzer::dom::parser::MarkupParser;
    use a11y_analyzer::model::document::DocumentModel;
    use a11y_analyzer::model::handler::ActionLanguageModel;
    use a11y_analyzer::parse_util::SourceFile;
    use a11y_analyzer::script::Parser;

    fn document_findings(html: &str, js: &str) -> Vec<Finding> {
        let mut model = DocumentModel::new(AnalysisScope::Page);
        model.fragments = MarkupParser::new().parse(html, "page.html").fragments;
        if !js.is_empty() {
            let parsed = Parser::new().parse(js, "app.js");
            assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
            let file = SourceFile::new("app.js", js);
            model
                .scripts
                .push(ActionLanguageModel::build(lower_program(&parsed.program, file), "app.js"));
        }
        model.merge();
        let config = AnalyzerConfig::default();
        let ctx = AnalyzerContext {
            document_model: Some(&model),
            action_language_model: None,
            scope: AnalysisScope::Page,
            config: &config,
            cancel: CancellationToken::new(),
        };
        run_rules(&ctx, None)
    }

    use a11y_analyzer::engine::CancellationToken;

    mod tabs {
        use super::*;

        #[test]
        fn should_flag_an_empty_tablist_with_a_skeleton_fix() {
            let findings = document_findings("<div role=\"tablist\"></div>", "");
            assert_eq!(findings.len(), 1);
            let finding = &findings[0];
            assert_eq!(finding.kind, "incomplete-tabs-pattern");
            assert!(finding.message.contains("role \"tab\""));
            assert_eq!(
                finding.wcag_criteria,
                vec!["4.1.2".to_string(), "1.3.1".to_string()]
            );
            let fix = finding.fix.as_ref().expect("skeleton fix");
            assert!(fix.code.contains("role=\"tablist\""));
            assert!(fix.code.contains("role=\"tab\""));
            assert!(fix.code.contains("role=\"tabpanel\""));
        }

        #[test]
        fn should_accept_a_complete_tab_interface() {
            let findings = document_findings(
                "<div role=\"tablist\" id=\"tabs\">\n\
                 \t<button role=\"tab\" id=\"t1\" aria-selected=\"true\" aria-controls=\"p1\">One</button>\n\
                 </div>\n\
                 <div role=\"tabpanel\" id=\"p1\">Panel</div>",
                "document.getElementById('tabs').addEventListener('keydown', e => {\n\
                 \tif (e.key === 'ArrowRight' || e.key === 'ArrowLeft') { move(); }\n\
                 \tif (e.key === 'Home' || e.key === 'End') { jump(); }\n\
                 });",
            );
            assert!(
                !findings.iter().any(|f| f.kind == "incomplete-tabs-pattern"),
                "unexpected: {:?}",
                findings
            );
        }

        #[test]
        fn should_flag_tabs_without_their_connections() {
            let findings = document_findings(
                "<div role=\"tablist\"><button role=\"tab\" aria-selected=\"false\">A</button></div>",
                "",
            );
            assert!(findings
                .iter()
                .any(|f| f.kind == kinds::MISSING_ARIA_CONNECTION));
        }
    }

    mod state_widgets {
        use super::*;

        #[test]
        fn should_require_switch_state() {
            let findings = document_findings("<div role=\"switch\" tabindex=\"0\">Dark mode</div>", "");
            let finding = findings
                .iter()
                .find(|f| f.kind == "incomplete-switch-pattern")
                .expect("switch finding");
            assert!(finding.message.contains("aria-checked"));
        }

        #[test]
        fn should_require_slider_value_attributes() {
            let findings = document_findings("<div role=\"slider\" tabindex=\"0\">50%</div>", "");
            let finding = findings
                .iter()
                .find(|f| f.kind == "incomplete-slider-pattern")
                .expect("slider finding");
            assert!(finding.message.contains("aria-valuenow"));
            assert!(finding.message.contains("aria-valuemin"));
        }

        #[test]
        fn should_require_dialog_modal_marking_and_escape() {
            let findings = document_findings("<div role=\"dialog\"><p>hi</p></div>", "");
            let finding = findings
                .iter()
                .find(|f| f.kind == "incomplete-dialog-pattern")
                .expect("dialog finding");
            assert!(finding.message.contains("aria-modal"));
            assert!(finding.message.contains("Escape"));
        }

        #[test]
        fn should_accept_a_complete_progressbar() {
            let findings = document_findings(
                "<div role=\"progressbar\" aria-label=\"Upload\" aria-valuemin=\"0\" aria-valuemax=\"100\" aria-valuenow=\"25\"></div>",
                "",
            );
            assert!(!findings
                .iter()
                .any(|f| f.kind == "incomplete-progressbar-pattern"));
        }
    }

    mod structural_widgets {
        use super::*;

        #[test]
        fn should_require_children_for_listbox_and_radiogroup() {
            let findings = document_findings(
                "<div role=\"listbox\" aria-label=\"Options\"></div>\n\
                 <div role=\"radiogroup\" aria-label=\"Choice\"></div>",
                "",
            );
            assert!(findings.iter().any(|f| f.kind == "incomplete-listbox-pattern"));
            assert!(findings
                .iter()
                .any(|f| f.kind == "incomplete-radiogroup-pattern"));
        }

        #[test]
        fn should_require_checked_state_on_radios() {
            let findings = document_findings(
                "<div role=\"radiogroup\" aria-label=\"Choice\">\n\
                 \t<div role=\"radio\" tabindex=\"0\">A</div>\n\
                 </div>",
                "",
            );
            let finding = findings
                .iter()
                .find(|f| f.kind == "incomplete-radiogroup-pattern")
                .expect("radiogroup finding");
            assert!(finding.message.contains("aria-checked"));
        }

        #[test]
        fn should_detect_breadcrumbs_without_links() {
            let findings = document_findings(
                "<nav aria-label=\"Breadcrumb\"><span>Home</span></nav>",
                "",
            );
            assert!(findings
                .iter()
                .any(|f| f.kind == "incomplete-breadcrumb-pattern"));
        }

        #[test]
        fn should_accept_breadcrumbs_made_of_anchors() {
            let findings = document_findings(
                "<nav aria-label=\"Breadcrumb\"><a href=\"/\">Home</a><a href=\"/docs\" aria-current=\"page\">Docs</a></nav>",
                "",
            );
            assert!(!findings
                .iter()
                .any(|f| f.kind == "incomplete-breadcrumb-pattern"));
        }
    }

    mod disclosure {
        use super::*;

        #[test]
        fn should_accept_native_buttons_with_expanded_state_and_target() {
            let findings = document_findings(
                "<button aria-expanded=\"false\" aria-controls=\"sect\">More</button>\n\
                 <div id=\"sect\">Details</div>",
                "",
            );
            assert!(
                !findings
                    .iter()
                    .any(|f| f.kind == "incomplete-disclosure-pattern"),
                "unexpected: {:?}",
                findings
            );
        }

        #[test]
        fn should_flag_disclosure_without_a_target_reference() {
            let findings = document_findings(
                "<button aria-expanded=\"false\">More</button>",
                "",
            );
            assert!(findings
                .iter()
                .any(|f| f.kind == kinds::MISSING_ARIA_CONNECTION));
        }
    }
}
