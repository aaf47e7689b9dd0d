//! DOM serializer
//!
//! Regenerates markup from a fragment. Reparsing the output yields a
//! structurally equal fragment, which backs the round-trip property tests.

use super::model::{DomFragment, NodeData, NodeId};

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub fn serialize_fragment(fragment: &DomFragment) -> String {
    let mut out = String::new();
    if !fragment.is_empty() {
        serialize_node(fragment, fragment.root, &mut out);
    }
    out
}

fn serialize_node(fragment: &DomFragment, id: NodeId, out: &mut String) {
    let node = fragment.node(id);
    match &node.data {
        NodeData::Text(text) => out.push_str(&escape_text(text)),
        NodeData::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        NodeData::Element(el) => {
            out.push('<');
            out.push_str(&el.tag_name);
            for (name, value) in &el.attributes {
                out.push(' ');
                out.push_str(name);
                if !value.is_empty() {
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
            }
            out.push('>');
            if VOID_TAGS.contains(&el.tag_name.as_str()) {
                return;
            }
            for child in &node.children {
                serialize_node(fragment, *child, out);
            }
            out.push_str("</");
            out.push_str(&el.tag_name);
            out.push('>');
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parser::MarkupParser;

    #[test]
    fn should_round_trip_simple_markup() {
        let html = "<div id=\"x\" class=\"a b\"><span>hi</span><img src=\"y.png\" alt=\"Y\"></div>";
        let parser = MarkupParser::new();
        let first = parser.parse(html, "a.html");
        assert_eq!(first.fragments.len(), 1);
        let serialized = serialize_fragment(&first.fragments[0]);
        let second = parser.parse(&serialized, "a.html");
        assert_eq!(second.fragments.len(), 1);
        let resurfaced = serialize_fragment(&second.fragments[0]);
        assert_eq!(serialized, resurfaced);
    }
}
