/**
 * Markup parser tests
 */

#[cfg(test)]
mod tests {
    use a11y_analyzer::dom::model::NodeData;
    use a11y_analyzer::dom::parser::{MarkupParseResult, MarkupParser};

    fn parse(html: &str) -> MarkupParseResult {
        MarkupParser::new().parse(html, "test.html")
    }

    mod structure {
        use super::*;

        #[test]
        fn should_parse_nested_elements_into_one_fragment() {
            let result = parse("<div><span>hi</span><em>there</em></div>");
            assert_eq!(result.fragments.len(), 1);
            let fragment = &result.fragments[0];
            let root = fragment.node(fragment.root);
            assert_eq!(root.children.len(), 2);
            let span = fragment.element(root.children[0]).unwrap();
            assert_eq!(span.tag_name, "span");
        }

        #[test]
        fn should_produce_one_fragment_per_top_level_element() {
            let result = parse("<header>a</header><main>b</main><footer>c</footer>");
            assert_eq!(result.fragments.len(), 3);
            assert_eq!(
                result.fragments[1]
                    .element(result.fragments[1].root)
                    .unwrap()
                    .tag_name,
                "main"
            );
        }

        #[test]
        fn should_treat_void_tags_as_leaves() {
            let result = parse("<div><img src=\"a.png\" alt=\"A\"><br>text</div>");
            let fragment = &result.fragments[0];
            let root = fragment.node(fragment.root);
            assert_eq!(root.children.len(), 3);
            let img = fragment.element(root.children[0]).unwrap();
            assert_eq!(img.tag_name, "img");
            assert!(fragment.node(root.children[0]).children.is_empty());
        }

        #[test]
        fn should_implicitly_close_list_items() {
            let result = parse("<ul><li>one<li>two<li>three</ul>");
            let fragment = &result.fragments[0];
            let ul = fragment.node(fragment.root);
            assert_eq!(ul.children.len(), 3);
            for child in &ul.children {
                assert_eq!(fragment.element(*child).unwrap().tag_name, "li");
            }
        }

        #[test]
        fn should_implicitly_close_paragraphs_before_blocks() {
            let result = parse("<div><p>one<p>two</div>");
            let fragment = &result.fragments[0];
            let div = fragment.node(fragment.root);
            assert_eq!(div.children.len(), 2);
        }

        #[test]
        fn should_keep_comments() {
            let result = parse("<div><!-- note -->x</div>");
            let fragment = &result.fragments[0];
            let root = fragment.node(fragment.root);
            assert!(matches!(
                &fragment.node(root.children[0]).data,
                NodeData::Comment(text) if text.trim() == "note"
            ));
        }

        #[test]
        fn should_capture_raw_script_content() {
            let result = parse("<div><script>if (a < b) { run(); }</script></div>");
            let fragment = &result.fragments[0];
            let root = fragment.node(fragment.root);
            let script = root.children[0];
            let text = fragment.text_content(script);
            assert!(text.contains("a < b"));
            assert!(result.errors.is_empty());
        }
    }

    mod attributes {
        use super::*;

        #[test]
        fn should_parse_quoted_unquoted_and_bare_attributes() {
            let result = parse("<input type=\"text\" value=hello disabled>");
            let fragment = &result.fragments[0];
            let input = fragment.element(fragment.root).unwrap();
            assert_eq!(input.attr("type"), Some("text"));
            assert_eq!(input.attr("value"), Some("hello"));
            assert_eq!(input.attr("disabled"), Some(""));
        }

        #[test]
        fn should_normalize_jsx_attribute_names() {
            let result = parse("<label className=\"field\" htmlFor=\"name\">Name</label>");
            let fragment = &result.fragments[0];
            let label = fragment.element(fragment.root).unwrap();
            assert_eq!(label.attr("class"), Some("field"));
            assert_eq!(label.attr("for"), Some("name"));
        }

        #[test]
        fn should_capture_jsx_expression_values() {
            let result = parse("<button onClick={() => toggle()}>Go</button>");
            let fragment = &result.fragments[0];
            let button = fragment.element(fragment.root).unwrap();
            assert!(button.attr("onClick").unwrap().contains("toggle"));
        }

        #[test]
        fn should_decode_entities() {
            let result = parse("<div title=\"a &amp; b\">5 &lt; 6 &#x21;</div>");
            let fragment = &result.fragments[0];
            assert_eq!(
                fragment.element(fragment.root).unwrap().attr("title"),
                Some("a & b")
            );
            assert_eq!(fragment.text_content(fragment.root), "5 < 6 !");
        }
    }

    mod recovery {
        use super::*;

        #[test]
        fn should_close_unclosed_elements_at_eof() {
            let result = parse("<div><span>text");
            assert_eq!(result.fragments.len(), 1);
            assert!(!result.errors.is_empty());
        }

        #[test]
        fn should_report_mismatched_closing_tags() {
            let result = parse("<div>text</section></div>");
            assert_eq!(result.fragments.len(), 1);
            assert!(result
                .errors
                .iter()
                .any(|e| e.msg.contains("Unexpected closing tag")));
        }

        #[test]
        fn should_skip_doctype() {
            let result = parse("<!DOCTYPE html><html><body>x</body></html>");
            assert_eq!(result.fragments.len(), 1);
            assert_eq!(
                result.fragments[0]
                    .element(result.fragments[0].root)
                    .unwrap()
                    .tag_name,
                "html"
            );
        }
    }
}
