/**
 * DOM model tests
 *
 * Queries, focusability and accessible-name computation on parsed
 * fragments.
 */

#[cfg(test)]
mod tests {
    use a11y_analyzer::dom::model::DomFragment;
    use a11y_analyzer::dom::parser::MarkupParser;

    fn fragment(html: &str) -> DomFragment {
        let mut result = MarkupParser::new().parse(html, "test.html");
        assert_eq!(result.fragments.len(), 1, "expected a single fragment");
        result.fragments.remove(0)
    }

    mod queries {
        use super::*;

        #[test]
        fn should_find_elements_by_id() {
            let fragment = fragment("<div><button id=\"save\">Save</button></div>");
            let found = fragment.get_element_by_id("save").expect("element");
            assert_eq!(fragment.element(found).unwrap().tag_name, "button");
            assert!(fragment.get_element_by_id("other").is_none());
        }

        #[test]
        fn should_query_by_class_tag_and_attribute() {
            let fragment = fragment(
                "<div><a class=\"nav item\" href=\"/\">Home</a><a class=\"item\" href=\"/x\">X</a><input type=\"radio\"></div>",
            );
            assert_eq!(fragment.query_selector_all(".item").len(), 2);
            assert_eq!(fragment.query_selector_all(".nav").len(), 1);
            assert_eq!(fragment.query_selector_all("a").len(), 2);
            assert_eq!(fragment.query_selector_all("[type=\"radio\"]").len(), 1);
            assert!(fragment.query_selector("input[type]").is_some());
        }

        #[test]
        fn should_list_elements_in_preorder() {
            let fragment = fragment("<div><span>a</span><p><em>b</em></p></div>");
            let tags: Vec<String> = fragment
                .get_all_elements()
                .into_iter()
                .map(|id| fragment.element(id).unwrap().tag_name.clone())
                .collect();
            assert_eq!(tags, vec!["div", "span", "p", "em"]);
        }
    }

    mod focusability {
        use super::*;

        #[test]
        fn should_treat_native_controls_as_focusable() {
            let fragment = fragment(
                "<div><button>b</button><input><select></select><textarea></textarea><a href=\"/\">l</a></div>",
            );
            assert_eq!(fragment.get_focusable_elements().len(), 5);
        }

        #[test]
        fn should_require_href_on_anchors() {
            let fragment = fragment("<div><a>plain</a></div>");
            assert!(fragment.get_focusable_elements().is_empty());
        }

        #[test]
        fn should_exclude_disabled_controls() {
            let fragment = fragment("<div><button disabled>b</button></div>");
            assert!(fragment.get_focusable_elements().is_empty());
        }

        #[test]
        fn should_honor_tabindex() {
            let fragment = fragment(
                "<div><span tabindex=\"0\">yes</span><span tabindex=\"-1\">no</span><span tabindex=\"x\">no</span></div>",
            );
            let focusable = fragment.get_focusable_elements();
            assert_eq!(focusable.len(), 1);
            assert_eq!(
                fragment.element(focusable[0]).unwrap().attr("tabindex"),
                Some("0")
            );
        }

        #[test]
        fn should_count_inline_handlers_as_interactive() {
            let fragment = fragment("<div><span onclick=\"go()\">x</span></div>");
            assert_eq!(fragment.get_interactive_elements().len(), 1);
        }
    }

    mod labels {
        use super::*;

        #[test]
        fn should_prefer_aria_label() {
            let fragment = fragment("<button aria-label=\"Close dialog\">X</button>");
            assert_eq!(
                fragment.accessible_label(fragment.root).as_deref(),
                Some("Close dialog")
            );
        }

        #[test]
        fn should_resolve_aria_labelledby() {
            let fragment =
                fragment("<div><h2 id=\"title\">Settings</h2><section aria-labelledby=\"title\">x</section></div>");
            let section = fragment.query_selector("section").unwrap();
            assert_eq!(
                fragment.accessible_label(section).as_deref(),
                Some("Settings")
            );
        }

        #[test]
        fn should_fall_back_to_text_content() {
            let fragment = fragment("<button><span>Save</span> changes</button>");
            assert_eq!(
                fragment.accessible_label(fragment.root).as_deref(),
                Some("Save changes")
            );
        }

        #[test]
        fn should_use_alt_for_images() {
            let fragment = fragment("<img src=\"logo.png\" alt=\"Company logo\">");
            assert_eq!(
                fragment.accessible_label(fragment.root).as_deref(),
                Some("Company logo")
            );
        }

        #[test]
        fn should_use_placeholder_for_empty_inputs() {
            let fragment = fragment("<input placeholder=\"Search\">");
            assert_eq!(
                fragment.accessible_label(fragment.root).as_deref(),
                Some("Search")
            );
        }

        #[test]
        fn should_report_missing_labels() {
            let fragment = fragment("<button></button>");
            assert!(fragment.accessible_label(fragment.root).is_none());
        }
    }
}
