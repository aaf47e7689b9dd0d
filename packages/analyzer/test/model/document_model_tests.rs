/**
 * DocumentModel integrator tests
 *
 * Merge resolution, selector sets, completeness scoring and derived
 * element contexts.
 */

#[cfg(test)]
mod tests {
    use a11y_analyzer::action::lower_program;
    use a11y_analyzer::analyzer::finding::AnalysisScope;
    use a11y_analyzer::css::parser::CssParser;
    use a11y_analyzer::dom::parser::MarkupParser;
    use a11y_analyzer::model::document::DocumentModel;
    use a11y_analyzer::model::handler::ActionLanguageModel;
    use a11y_analyzer::parse_util::SourceFile;
    use a11y_analyzer::script::Parser;

    fn build(html: &str, js: &str, css: &str) -> DocumentModel {
        let mut model = DocumentModel::new(AnalysisScope::Page);
        if !html.is_empty() {
            model.fragments = MarkupParser::new().parse(html, "page.html").fragments;
        }
        if !js.is_empty() {
            let parsed = Parser::new().parse(js, "app.js");
            let file = SourceFile::new("app.js", js);
            let tree = lower_program(&parsed.program, file);
            model.scripts.push(ActionLanguageModel::build(tree, "app.js"));
        }
        if !css.is_empty() {
            model
                .stylesheets
                .push(CssParser::new().parse(css, "style.css").model);
        }
        model.merge();
        model
    }

    mod merge {
        use super::*;

        #[test]
        fn should_attach_handlers_by_id_selector() {
            let model = build(
                "<div id=\"x\">Click</div>",
                "document.getElementById('x').addEventListener('click', () => {});",
                "",
            );
            let key = model.get_element_by_id("x").expect("element");
            let handlers = model.element_handlers(key);
            assert_eq!(handlers.len(), 1);
            assert_eq!(handlers[0].event.as_deref(), Some("click"));
        }

        #[test]
        fn should_attach_handlers_by_class_and_tag() {
            let model = build(
                "<button class=\"cta\">Go</button>",
                "document.querySelector('.cta').addEventListener('click', () => {});\n\
                 document.querySelector('button').addEventListener('keydown', () => {});",
                "",
            );
            let key = model.query_selector("button").expect("element");
            assert_eq!(model.element_handlers(key).len(), 2);
        }

        #[test]
        fn should_attach_css_rules_sorted_by_specificity() {
            let model = build(
                "<button id=\"save\" class=\"primary\">Save</button>",
                "",
                "button { color: black; } .primary { color: blue; } #save { color: green; }",
            );
            let key = model.query_selector("#save").expect("element");
            let rules = model.element_css_rules(key);
            assert_eq!(rules.len(), 3);
            assert_eq!(rules[0].selector, "#save");
            assert_eq!(rules[2].selector, "button");
        }

        #[test]
        fn should_be_idempotent() {
            let mut model = build(
                "<div id=\"x\">Click</div>",
                "document.getElementById('x').addEventListener('click', () => {});",
                "",
            );
            let key = model.get_element_by_id("x").expect("element");
            let completeness = model.tree_completeness();
            let handler_count = model.element_handlers(key).len();
            model.merge();
            assert_eq!(model.tree_completeness(), completeness);
            assert_eq!(model.element_handlers(key).len(), handler_count);
        }

        #[test]
        fn should_compute_selector_sets() {
            let model = build(
                "<button id=\"a\" class=\"x y\" role=\"tab\" aria-selected=\"true\">A</button>",
                "",
                "",
            );
            let key = model.query_selector("#a").expect("element");
            let el = model.fragments[key.0].element(key.1).unwrap();
            let selectors = DocumentModel::selector_set(el);
            assert!(selectors.contains(&"#a".to_string()));
            assert!(selectors.contains(&".x".to_string()));
            assert!(selectors.contains(&".y".to_string()));
            assert!(selectors.contains(&"button".to_string()));
            assert!(selectors.contains(&"[role=\"tab\"]".to_string()));
            assert!(selectors.contains(&"[aria-selected]".to_string()));
        }
    }

    mod completeness {
        use super::*;

        #[test]
        fn should_score_a_lone_resolved_fragment_as_complete() {
            let model = build("<div id=\"x\">Click</div>", "", "");
            assert_eq!(model.fragment_count(), 1);
            assert!((model.tree_completeness() - 1.0).abs() < f64::EPSILON);
            assert!(model.fragment_is_complete(0));
        }

        #[test]
        fn should_resolve_references_within_one_fragment() {
            let model = build(
                "<div><span id=\"t\">Title</span><section aria-labelledby=\"t\">x</section></div>",
                "",
                "",
            );
            assert!((model.tree_completeness() - 1.0).abs() < 1e-9);
        }

        #[test]
        fn should_penalize_unresolved_references() {
            let model = build("<div aria-labelledby=\"ghost\">x</div>", "", "");
            assert!((model.tree_completeness() - 0.7).abs() < 1e-9);
            assert!(!model.fragment_is_complete(0));
        }

        #[test]
        fn should_floor_many_fragments_at_point_three() {
            let html = "<div></div>".repeat(10);
            let model = build(&html, "", "");
            assert_eq!(model.fragment_count(), 10);
            assert!((model.tree_completeness() - 0.3).abs() < 1e-9);
        }

        #[test]
        fn should_score_zero_fragments_as_zero() {
            let model = build("", "console.log(1);", "");
            assert_eq!(model.fragment_count(), 0);
            assert_eq!(model.tree_completeness(), 0.0);
        }

        #[test]
        fn should_resolve_across_fragments() {
            let model = build(
                "<div aria-controls=\"other\">a</div><section id=\"other\">b</section>",
                "",
                "",
            );
            // two fragments: base 0.8, all references resolved
            assert!((model.tree_completeness() - 1.0).abs() < 1e-9);
            assert!(!model.fragment_is_complete(0));
        }
    }

    mod contexts {
        use super::*;

        #[test]
        fn should_derive_interactivity_and_roles() {
            let model = build(
                "<div id=\"x\">Click</div>",
                "document.getElementById('x').addEventListener('click', () => {});",
                "",
            );
            let key = model.get_element_by_id("x").expect("element");
            let context = model.context(key).expect("context");
            assert!(context.has_click_handler);
            assert!(!context.has_keyboard_handler);
            assert!(context.interactive);
            assert!(!context.focusable);
            assert_eq!(context.role, None);
            assert_eq!(context.label.as_deref(), Some("Click"));
        }

        #[test]
        fn should_use_implicit_roles() {
            let model = build("<button>Save</button><nav>menu</nav>", "", "");
            let button = model.query_selector("button").expect("button");
            assert_eq!(
                model.context(button).unwrap().role.as_deref(),
                Some("button")
            );
            let nav = model.query_selector("nav").expect("nav");
            assert_eq!(
                model.context(nav).unwrap().role.as_deref(),
                Some("navigation")
            );
        }

        #[test]
        fn should_surface_elements_with_issues() {
            let model = build(
                "<div id=\"x\">Click</div><button id=\"unlabeled\"></button>",
                "document.getElementById('x').addEventListener('click', () => {});",
                "",
            );
            let issues = model.get_elements_with_issues();
            assert_eq!(issues.len(), 2);
            assert!(issues.iter().any(|c| c.tag_name == "div"));
            assert!(issues.iter().any(|c| c.tag_name == "button"));
        }

        #[test]
        fn should_list_interactive_elements() {
            let model = build(
                "<div><a href=\"/\">link</a><span>plain</span></div>",
                "",
                "",
            );
            let interactive = model.get_interactive_elements();
            assert_eq!(interactive.len(), 1);
            assert_eq!(interactive[0].tag_name, "a");
        }
    }
}
