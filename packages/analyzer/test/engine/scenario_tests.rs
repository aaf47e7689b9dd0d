/**
 * End-to-end engine tests
 *
 * Literal input scenarios through the full pipeline: parse, model
 * construction, merge, detectors, report.
 */

#[cfg(test)]
mod tests {
    use a11y_analyzer::analyzer::finding::{kinds, ConfidenceLevel, Severity};
    use a11y_analyzer::{
        AnalysisEngine, AnalyzerConfig, CancellationToken, SourceBundle, SourceText,
    };

    fn engine() -> AnalysisEngine {
        AnalysisEngine::new(AnalyzerConfig::default())
    }

    fn page_bundle(html: &str, js: &str) -> SourceBundle {
        let mut bundle = SourceBundle::page(SourceText::new("page.html", html));
        if !js.is_empty() {
            bundle.scripts.push(SourceText::new("app.js", js));
        }
        bundle
    }

    fn script_bundle(js: &str) -> SourceBundle {
        let mut bundle = SourceBundle::file_scope();
        bundle.scripts.push(SourceText::new("app.js", js));
        bundle
    }

    mod scenarios {
        use super::*;

        #[test]
        fn should_report_mouse_only_click_with_high_confidence() {
            let bundle = page_bundle(
                "<div id=\"x\">Click</div>",
                "document.getElementById('x').addEventListener('click', ()=>{});",
            );
            let report = engine().analyze_bundle(&bundle, &CancellationToken::new());
            assert_eq!(report.findings.len(), 1, "findings: {:?}", report.findings);
            let finding = &report.findings[0];
            assert_eq!(finding.kind, kinds::MOUSE_ONLY_CLICK);
            assert_eq!(finding.severity, Severity::Warning);
            assert_eq!(finding.confidence.level, ConfidenceLevel::High);
            assert_eq!(finding.wcag_criteria, vec!["2.1.1".to_string()]);
            assert_eq!(finding.location.file, "app.js");
            assert_eq!(finding.location.line, 1);
        }

        #[test]
        fn should_report_missing_escape_handler() {
            let bundle = script_bundle(
                "modal.addEventListener('keydown', e => { if (e.key==='Tab') { e.preventDefault(); } });",
            );
            let report = engine().analyze_bundle(&bundle, &CancellationToken::new());
            assert_eq!(report.findings.len(), 1);
            assert_eq!(report.findings[0].kind, kinds::MISSING_ESCAPE_HANDLER);
            assert_eq!(report.findings[0].severity, Severity::Warning);
            assert_eq!(report.findings[0].wcag_criteria, vec!["2.1.2".to_string()]);
        }

        #[test]
        fn should_report_uncontrolled_auto_update() {
            let bundle = script_bundle("setInterval(() => updateFeed(), 5000);");
            let report = engine().analyze_bundle(&bundle, &CancellationToken::new());
            assert_eq!(report.findings.len(), 1);
            assert_eq!(report.findings[0].kind, kinds::UNCONTROLLED_AUTO_UPDATE);
            assert_eq!(report.findings[0].wcag_criteria, vec!["2.2.2".to_string()]);
        }

        #[test]
        fn should_report_unexpected_navigation_from_change() {
            let bundle = script_bundle(
                "select.addEventListener('change', () => { window.location = '/lang/'+this.value; });",
            );
            let report = engine().analyze_bundle(&bundle, &CancellationToken::new());
            assert_eq!(report.findings.len(), 1);
            assert_eq!(report.findings[0].kind, kinds::UNEXPECTED_NAVIGATION);
            assert_eq!(report.findings[0].wcag_criteria, vec!["3.2.2".to_string()]);
        }

        #[test]
        fn should_report_static_aria_state() {
            let bundle = script_bundle(
                "button.setAttribute('aria-pressed','false'); button.addEventListener('click', () => button.classList.toggle('on'));",
            );
            let report = engine().analyze_bundle(&bundle, &CancellationToken::new());
            assert_eq!(report.findings.len(), 1);
            assert_eq!(report.findings[0].kind, kinds::STATIC_ARIA_STATE);
            assert!(report.findings[0].message.contains("aria-pressed"));
            assert_eq!(report.findings[0].wcag_criteria, vec!["4.1.2".to_string()]);
        }

        #[test]
        fn should_report_incomplete_tabs_with_fix() {
            let bundle = page_bundle("<div role=\"tablist\"></div>", "");
            let report = engine().analyze_bundle(&bundle, &CancellationToken::new());
            assert_eq!(report.findings.len(), 1);
            let finding = &report.findings[0];
            assert_eq!(finding.kind, "incomplete-tabs-pattern");
            assert_eq!(
                finding.wcag_criteria,
                vec!["4.1.2".to_string(), "1.3.1".to_string()]
            );
            let fix = finding.fix.as_ref().expect("fix");
            assert!(fix.code.contains("tablist"));
            assert!(fix.code.contains("tabpanel"));
        }
    }

    mod reporting {
        use super::*;

        #[test]
        fn should_emit_validator_diagnostics() {
            let bundle = page_bundle("<div><img src=\"x.png\"><button></button></div>", "");
            let report = engine().analyze_bundle(&bundle, &CancellationToken::new());
            assert_eq!(report.diagnostics.len(), 2);
            assert!(report.diagnostics.iter().all(|d| d.kind == kinds::VALIDATOR));
        }

        #[test]
        fn should_surface_script_parse_errors_as_diagnostics() {
            let bundle = script_bundle("let = broken; still.addEventListener('click', () => {});");
            let report = engine().analyze_bundle(&bundle, &CancellationToken::new());
            assert!(report
                .diagnostics
                .iter()
                .any(|d| d.severity == Severity::Error));
        }

        #[test]
        fn should_filter_below_min_severity() {
            let config = AnalyzerConfig {
                min_severity: Severity::Error,
                ..AnalyzerConfig::default()
            };
            let bundle = page_bundle(
                "<div id=\"x\">Click</div>",
                "document.getElementById('x').addEventListener('click', ()=>{});",
            );
            let report =
                AnalysisEngine::new(config).analyze_bundle(&bundle, &CancellationToken::new());
            assert!(report.findings.is_empty());
        }

        #[test]
        fn should_order_findings_by_file_location_and_kind() {
            let bundle = page_bundle(
                "<div tabindex=\"4\">a</div><section aria-labelledby=\"ghost\">x</section>",
                "",
            );
            let report = engine().analyze_bundle(&bundle, &CancellationToken::new());
            let mut sorted = report.findings.clone();
            a11y_analyzer::analyzer::finding::sort_findings(&mut sorted);
            assert_eq!(report.findings, sorted);
            assert!(report.findings.len() >= 2);
        }

        #[test]
        fn should_publish_findings_incrementally() {
            use std::sync::atomic::{AtomicUsize, Ordering};
            use std::sync::Arc;
            let seen = Arc::new(AtomicUsize::new(0));
            let counter = seen.clone();
            let engine = AnalysisEngine::new(AnalyzerConfig::default()).with_publish_hook(
                Arc::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            );
            let bundle = page_bundle(
                "<div id=\"x\">Click</div>",
                "document.getElementById('x').addEventListener('click', ()=>{});",
            );
            let report = engine.analyze_bundle(&bundle, &CancellationToken::new());
            assert_eq!(seen.load(Ordering::SeqCst), report.findings.len());
        }
    }

    mod concurrency {
        use super::*;

        #[test]
        fn should_analyze_independent_bundles_in_parallel() {
            let bundles = vec![
                page_bundle(
                    "<div id=\"x\">Click</div>",
                    "document.getElementById('x').addEventListener('click', ()=>{});",
                ),
                script_bundle("setInterval(() => tick(), 1000);"),
            ];
            let reports = engine().analyze_all(&bundles, &CancellationToken::new());
            assert_eq!(reports.len(), 2);
            assert_eq!(reports[0].findings[0].kind, kinds::MOUSE_ONLY_CLICK);
            assert_eq!(reports[1].findings[0].kind, kinds::UNCONTROLLED_AUTO_UPDATE);
        }

        #[test]
        fn should_return_nothing_after_cancellation() {
            let cancel = CancellationToken::new();
            cancel.cancel();
            let bundle = page_bundle(
                "<div id=\"x\">Click</div>",
                "document.getElementById('x').addEventListener('click', ()=>{});",
            );
            let report = engine().analyze_bundle(&bundle, &cancel);
            assert!(report.findings.is_empty());
        }

        #[test]
        fn should_reuse_cached_parses_for_identical_content() {
            let engine = engine();
            let bundle = page_bundle(
                "<div id=\"x\">Click</div>",
                "document.getElementById('x').addEventListener('click', ()=>{});",
            );
            let first = engine.analyze_bundle(&bundle, &CancellationToken::new());
            let second = engine.analyze_bundle(&bundle, &CancellationToken::new());
            assert_eq!(first.findings, second.findings);
        }
    }
}
