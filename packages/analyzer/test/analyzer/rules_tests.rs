/**
 * Detector tests
 *
 * Rule-level behavior over file-scope and document-scope models.
 */

#[cfg(test)]
mod tests {
    use a11y_analyzer::action::lower_program;
    use a11y_analyzer::analyzer::finding::{kinds, AnalysisScope, Finding};
    use a11y_analyzer::analyzer::{run_rules, AnalyzerContext};
    use a11y_analyzer::config::AnalyzerConfig;
    use a11y_analyzer::css::parser::CssParser;
    use a11y_analyzer::dom::parser::MarkupParser;
    use a11y_analyzer::engine::CancellationToken;
    use a11y_analyzer::model::document::DocumentModel;
    use a11y_analyzer::model::handler::ActionLanguageModel;
    use a11y_analyzer::parse_util::SourceFile;
    use a11y_analyzer::script::Parser;

    fn script_model(js: &str) -> ActionLanguageModel {
        let parsed = Parser::new().parse(js, "app.js");
        assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
        let file = SourceFile::new("app.js", js);
        ActionLanguageModel::build(lower_program(&parsed.program, file), "app.js")
    }

    fn file_scope_findings(js: &str) -> Vec<Finding> {
        let model = script_model(js);
        let config = AnalyzerConfig::default();
        let ctx = AnalyzerContext {
            document_model: None,
            action_language_model: Some(&model),
            scope: AnalysisScope::File,
            config: &config,
            cancel: CancellationToken::new(),
        };
        run_rules(&ctx, None)
    }

    fn document_findings(html: &str, js: &str, css: &str) -> Vec<Finding> {
        let mut model = DocumentModel::new(AnalysisScope::Page);
        model.fragments = MarkupParser::new().parse(html, "page.html").fragments;
        if !js.is_empty() {
            model.scripts.push(script_model(js));
        }
        if !css.is_empty() {
            model
                .stylesheets
                .push(CssParser::new().parse(css, "style.css").model);
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

    fn kinds_of(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.kind.as_str()).collect()
    }

    mod keyboard {
        use super::*;

        #[test]
        fn should_detect_tab_traps_without_escape() {
            let findings = file_scope_findings(
                "modal.addEventListener('keydown', e => { if (e.key === 'Tab') { e.preventDefault(); } });",
            );
            assert_eq!(kinds_of(&findings), vec![kinds::MISSING_ESCAPE_HANDLER]);
            assert_eq!(findings[0].wcag_criteria, vec!["2.1.2".to_string()]);
        }

        #[test]
        fn should_accept_traps_with_an_escape_path() {
            let findings = file_scope_findings(
                "modal.addEventListener('keydown', e => {\n\
                 \tif (e.key === 'Tab') { e.preventDefault(); }\n\
                 \tif (e.key === 'Escape') { close(); }\n\
                 });",
            );
            assert!(!findings
                .iter()
                .any(|f| f.kind == kinds::MISSING_ESCAPE_HANDLER));
        }

        #[test]
        fn should_report_the_missing_activation_key() {
            let findings = file_scope_findings(
                "card.addEventListener('keydown', e => { if (e.key === 'Enter') { open(); } });",
            );
            let finding = findings
                .iter()
                .find(|f| f.kind == kinds::INCOMPLETE_ACTIVATION_KEYS)
                .expect("activation finding");
            assert!(finding.message.contains("Space"));
        }

        #[test]
        fn should_accept_both_activation_keys() {
            let findings = file_scope_findings(
                "card.addEventListener('keydown', e => { if (e.key === 'Enter' || e.key === ' ') { open(); } });",
            );
            assert!(!findings
                .iter()
                .any(|f| f.kind == kinds::INCOMPLETE_ACTIVATION_KEYS));
        }

        #[test]
        fn should_detect_touch_without_click() {
            let findings = file_scope_findings(
                "pane.addEventListener('touchstart', () => swipe());",
            );
            assert!(findings.iter().any(|f| f.kind == kinds::TOUCH_WITHOUT_CLICK));
        }

        #[test]
        fn should_accept_touch_with_click_fallback() {
            let findings = file_scope_findings(
                "pane.addEventListener('touchstart', () => swipe());\n\
                 pane.addEventListener('click', () => swipe());\n\
                 pane.addEventListener('keydown', e => { if (e.key === 'Enter' || e.key === ' ') { swipe(); } });",
            );
            assert!(!findings.iter().any(|f| f.kind == kinds::TOUCH_WITHOUT_CLICK));
        }
    }

    mod aria_state {
        use super::*;

        #[test]
        fn should_flag_state_set_once_and_never_updated() {
            let findings = file_scope_findings(
                "button.setAttribute('aria-pressed', 'false');\n\
                 button.addEventListener('click', () => button.classList.toggle('on'));",
            );
            assert_eq!(kinds_of(&findings), vec![kinds::STATIC_ARIA_STATE]);
            assert!(findings[0].message.contains("aria-pressed"));
            assert_eq!(findings[0].wcag_criteria, vec!["4.1.2".to_string()]);
        }

        #[test]
        fn should_accept_state_that_is_reassigned() {
            let findings = file_scope_findings(
                "button.setAttribute('aria-pressed', 'false');\n\
                 button.addEventListener('click', () => button.setAttribute('aria-pressed', 'true'));",
            );
            assert!(!findings.iter().any(|f| f.kind == kinds::STATIC_ARIA_STATE));
        }

        #[test]
        fn should_flag_single_writes_on_elements_without_handlers() {
            let findings =
                file_scope_findings("banner.setAttribute('aria-busy', 'false');");
            assert_eq!(kinds_of(&findings), vec![kinds::STATIC_ARIA_STATE]);
            assert!(findings[0].message.contains("aria-busy"));
        }
    }

    mod references {
        use super::*;

        #[test]
        fn should_find_dangling_aria_references() {
            let findings = document_findings(
                "<section aria-labelledby=\"ghost\">x</section>",
                "",
                "",
            );
            let finding = findings
                .iter()
                .find(|f| f.kind == kinds::ARIA_REFERENCE_NOT_FOUND)
                .expect("dangling reference finding");
            assert!(finding.message.contains("ghost"));
        }

        #[test]
        fn should_find_orphaned_handlers_in_document_scope() {
            let findings = document_findings(
                "<div id=\"present\">x</div>",
                "document.querySelector('#missing').addEventListener('click', () => {});",
                "",
            );
            assert!(findings
                .iter()
                .any(|f| f.kind == kinds::ORPHANED_EVENT_HANDLER));
        }
    }

    mod live_region {
        use super::*;

        #[test]
        fn should_require_live_regions_for_dynamic_text() {
            let findings = document_findings(
                "<div id=\"status-box\">idle</div><button id=\"go\">Go</button>",
                "document.getElementById('go').addEventListener('click', () => {\n\
                 \tdocument.getElementById('status-box').textContent = 'busy';\n\
                 });",
                "",
            );
            assert!(findings.iter().any(|f| f.kind == kinds::MISSING_LIVE_REGION));
        }

        #[test]
        fn should_accept_marked_live_regions() {
            let findings = document_findings(
                "<div id=\"status-box\" aria-live=\"polite\">idle</div><button id=\"go\">Go</button>",
                "document.getElementById('go').addEventListener('click', () => {\n\
                 \tdocument.getElementById('status-box').textContent = 'busy';\n\
                 });",
                "",
            );
            assert!(!findings.iter().any(|f| f.kind == kinds::MISSING_LIVE_REGION));
        }
    }

    mod context_change {
        use super::*;

        #[test]
        fn should_flag_navigation_from_change_handlers() {
            let findings = file_scope_findings(
                "select.addEventListener('change', () => { window.location = '/lang/' + this.value; });",
            );
            let finding = findings
                .iter()
                .find(|f| f.kind == kinds::UNEXPECTED_NAVIGATION)
                .expect("navigation finding");
            assert_eq!(finding.wcag_criteria, vec!["3.2.2".to_string()]);
        }

        #[test]
        fn should_map_focus_triggered_changes_to_on_focus() {
            let findings = file_scope_findings(
                "field.addEventListener('focus', () => { location.assign('/help'); });",
            );
            let finding = findings
                .iter()
                .find(|f| f.kind == kinds::UNEXPECTED_NAVIGATION)
                .expect("navigation finding");
            assert_eq!(finding.wcag_criteria, vec!["3.2.1".to_string()]);
        }

        #[test]
        fn should_flag_form_submission_from_input_handlers() {
            let findings = file_scope_findings(
                "field.addEventListener('input', () => { form.submit(); });",
            );
            assert!(findings
                .iter()
                .any(|f| f.kind == kinds::UNEXPECTED_FORM_SUBMIT));
        }
    }

    mod timing {
        use super::*;

        #[test]
        fn should_flag_uncleared_intervals() {
            let findings = file_scope_findings("setInterval(() => updateFeed(), 5000);");
            assert_eq!(kinds_of(&findings), vec![kinds::UNCONTROLLED_AUTO_UPDATE]);
            assert_eq!(findings[0].wcag_criteria, vec!["2.2.2".to_string()]);
        }

        #[test]
        fn should_accept_intervals_whose_id_reaches_clear_interval() {
            let findings = file_scope_findings(
                "const timer = setInterval(() => poll(), 1000);\n\
                 stop.addEventListener('click', () => clearInterval(timer));",
            );
            assert!(!findings
                .iter()
                .any(|f| f.kind == kinds::UNCONTROLLED_AUTO_UPDATE));
        }

        #[test]
        fn should_flag_long_timeouts_that_replace_content() {
            let findings = file_scope_findings(
                "setTimeout(() => { window.location = '/expired'; }, 6000);",
            );
            let finding = findings
                .iter()
                .find(|f| f.kind == kinds::UNANNOUNCED_TIMEOUT)
                .expect("timeout finding");
            assert_eq!(finding.wcag_criteria, vec!["2.2.1".to_string()]);
        }

        #[test]
        fn should_ignore_short_or_harmless_timeouts() {
            let findings = file_scope_findings(
                "setTimeout(() => { window.location = '/x'; }, 1000);\n\
                 setTimeout(() => highlight(), 8000);",
            );
            assert!(!findings.iter().any(|f| f.kind == kinds::UNANNOUNCED_TIMEOUT));
        }
    }

    mod semantic {
        use super::*;

        #[test]
        fn should_flag_role_button_on_created_divs() {
            let findings = file_scope_findings(
                "const d = document.createElement('div');\n\
                 d.setAttribute('role', 'button');",
            );
            assert!(findings.iter().any(|f| f.kind == kinds::NON_SEMANTIC_BUTTON));
        }

        #[test]
        fn should_flag_created_divs_used_as_click_targets() {
            let findings = file_scope_findings(
                "const d = document.createElement('span');\n\
                 d.addEventListener('click', () => activate());",
            );
            assert!(findings.iter().any(|f| f.kind == kinds::NON_SEMANTIC_BUTTON));
        }

        #[test]
        fn should_accept_role_on_matching_native_elements() {
            let findings = document_findings(
                "<button id=\"b\">x</button>",
                "document.getElementById('b').setAttribute('role', 'button');",
                "",
            );
            assert!(!findings.iter().any(|f| f.kind == kinds::NON_SEMANTIC_BUTTON));
        }
    }

    mod focus {
        use super::*;

        #[test]
        fn should_flag_positive_tabindex() {
            let findings = document_findings("<div tabindex=\"3\">x</div>", "", "");
            assert!(findings.iter().any(|f| f.kind == kinds::FOCUS_ORDER_CONFLICT));
        }

        #[test]
        fn should_flag_focusable_but_hidden_elements() {
            let findings = document_findings(
                "<button class=\"sr-hide\">Save</button>",
                "",
                ".sr-hide { display: none; }",
            );
            assert!(findings
                .iter()
                .any(|f| f.kind == kinds::VISIBILITY_FOCUS_CONFLICT));
        }

        #[test]
        fn should_flag_timer_driven_focus_moves() {
            let findings = file_scope_findings(
                "setTimeout(() => { document.getElementById('late').focus(); }, 200);",
            );
            assert!(findings
                .iter()
                .any(|f| f.kind == kinds::FOCUS_MANAGEMENT_ISSUE));
        }
    }
}
