/**
 * CSS model tests
 *
 * Cascade ordering, selector matching against elements, hidden-element
 * detection and the text round trip.
 */

#[cfg(test)]
mod tests {
    use a11y_analyzer::css::parser::CssParser;
    use a11y_analyzer::css::CssModel;
    use a11y_analyzer::dom::model::ElementData;
    use indexmap::IndexMap;

    fn parse(css: &str) -> CssModel {
        let result = CssParser::new().parse(css, "test.css");
        assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
        result.model
    }

    fn element(tag: &str, attrs: &[(&str, &str)]) -> ElementData {
        let mut attributes = IndexMap::new();
        for (name, value) in attrs {
            attributes.insert(name.to_string(), value.to_string());
        }
        ElementData {
            tag_name: tag.to_string(),
            attributes,
        }
    }

    mod cascade {
        use super::*;

        #[test]
        fn should_sort_matches_by_specificity_descending() {
            let model = parse(
                "button { color: black; }\n\
                 .primary { color: blue; }\n\
                 #save { color: green; }",
            );
            let el = element("button", &[("id", "save"), ("class", "primary")]);
            let matched = model.get_matching_rules(&el);
            assert_eq!(matched.len(), 3);
            assert_eq!(matched[0].selector, "#save");
            assert_eq!(matched[1].selector, ".primary");
            assert_eq!(matched[2].selector, "button");
        }

        #[test]
        fn should_break_specificity_ties_by_source_order() {
            let model = parse(".a { color: red; }\n.b { color: blue; }");
            let el = element("div", &[("class", "a b")]);
            let matched = model.get_matching_rules(&el);
            assert_eq!(matched.len(), 2);
            assert_eq!(matched[0].selector, ".a");
            assert_eq!(matched[1].selector, ".b");
        }

        #[test]
        fn should_match_descendant_selectors_by_subject() {
            let model = parse("nav .item a { color: red; }");
            let el = element("a", &[]);
            assert_eq!(model.get_matching_rules(&el).len(), 1);
            let other = element("nav", &[]);
            assert!(model.get_matching_rules(&other).is_empty());
        }
    }

    mod finders {
        use super::*;

        #[test]
        fn should_find_rules_by_selector() {
            let model = parse("button:focus { outline: 2px solid; }\n.x { color: red; }");
            assert_eq!(model.find_by_selector("button:focus").len(), 1);
            assert_eq!(model.find_by_selector("button").len(), 1);
            assert_eq!(model.find_by_selector(".missing").len(), 0);
        }

        #[test]
        fn should_classify_focus_visibility_and_contrast_rules() {
            let model = parse(
                "a:focus-visible { outline: 1px dotted; }\n\
                 .gone { display: none; }\n\
                 .dim { color: gray; background-color: white; }",
            );
            assert_eq!(model.find_focus_rules().len(), 1);
            assert_eq!(model.find_visibility_rules().len(), 1);
            assert_eq!(model.find_contrast_rules().len(), 1);
        }
    }

    mod hidden {
        use super::*;

        #[test]
        fn should_detect_display_none_and_friends() {
            let model = parse(
                ".a { display: none; }\n\
                 .b { visibility: hidden; }\n\
                 .c { opacity: 0; }\n\
                 .d { clip: rect(0, 0, 0, 0); }\n\
                 .e { position: absolute; left: -9999px; }\n\
                 .visible { color: red; }",
            );
            for class in ["a", "b", "c", "d", "e"] {
                let el = element("div", &[("class", class)]);
                assert!(model.is_element_hidden(&el), "class {} should hide", class);
            }
            let el = element("div", &[("class", "visible")]);
            assert!(!model.is_element_hidden(&el));
        }

        #[test]
        fn should_not_hide_on_offscreen_without_positioning() {
            let model = parse(".f { left: -9999px; }");
            let el = element("div", &[("class", "f")]);
            assert!(!model.is_element_hidden(&el));
        }
    }

    mod focus_styles {
        use super::*;

        #[test]
        fn should_detect_focus_styles_for_matching_elements() {
            let model = parse("button:focus { outline: 3px solid blue; }");
            assert!(model.has_focus_styles(&element("button", &[])));
            assert!(!model.has_focus_styles(&element("a", &[])));
        }
    }

    mod round_trip {
        use super::*;

        #[test]
        fn should_regenerate_an_equivalent_rule_set() {
            let css = "#nav { color: black; }\n\
                       .item:hover { color: red; }\n\
                       @media screen and (max-width: 700px) { p { margin: 0; } }\n\
                       @import url(\"theme.css\");";
            let first = parse(css);
            let second = parse(&first.to_css_text());
            assert_eq!(first.rules.len(), second.rules.len());
            for (a, b) in first.rules.iter().zip(second.rules.iter()) {
                assert_eq!(a.selector, b.selector);
                assert_eq!(a.rule_type, b.rule_type);
                assert_eq!(a.specificity, b.specificity);
                assert_eq!(a.properties, b.properties);
                assert_eq!(a.media_query, b.media_query);
                assert_eq!(a.pseudo_class, b.pseudo_class);
            }
        }
    }
}
