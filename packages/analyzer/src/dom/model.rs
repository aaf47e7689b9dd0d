//! DOM element trees and queries

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::parse_util::Span;

/// Arena index of a node within its fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub tag_name: String,
    pub attributes: IndexMap<String, String>,
}

impl ElementData {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
    pub span: Option<Span>,
}

/// A rooted DOM tree originating from a single source artifact. A page
/// may contain several disconnected fragments during incremental editing.
#[derive(Debug, Clone, PartialEq)]
pub struct DomFragment {
    pub source_path: String,
    nodes: Vec<DomNode>,
    pub root: NodeId,
}

pub const NATIVE_INTERACTIVE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea"];

impl DomFragment {
    pub fn new(source_path: impl Into<String>) -> Self {
        DomFragment {
            source_path: source_path.into(),
            nodes: Vec::new(),
            root: NodeId(0),
        }
    }

    pub fn create_node(&mut self, data: NodeData, span: Option<Span>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(DomNode {
            id,
            parent: None,
            children: Vec::new(),
            data,
            span,
        });
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn node(&self, id: NodeId) -> &DomNode {
        &self.nodes[id.0]
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All element ids in pre-order from the root.
    pub fn get_all_elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.nodes.is_empty() {
            self.collect_elements(self.root, &mut out);
        }
        out
    }

    fn collect_elements(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if matches!(self.nodes[id.0].data, NodeData::Element(_)) {
            out.push(id);
        }
        for child in &self.nodes[id.0].children {
            self.collect_elements(*child, out);
        }
    }

    pub fn get_element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.get_all_elements()
            .into_iter()
            .find(|id| self.element(*id).and_then(|el| el.attr("id")) == Some(element_id))
    }

    pub fn query_selector(&self, selector: &str) -> Option<NodeId> {
        let parsed = SimpleSelector::parse(selector)?;
        self.get_all_elements()
            .into_iter()
            .find(|id| parsed.matches(self.element(*id).unwrap()))
    }

    pub fn query_selector_all(&self, selector: &str) -> Vec<NodeId> {
        let parsed = match SimpleSelector::parse(selector) {
            Some(parsed) => parsed,
            None => return Vec::new(),
        };
        self.get_all_elements()
            .into_iter()
            .filter(|id| parsed.matches(self.element(*id).unwrap()))
            .collect()
    }

    /// Focusable per the tabindex/native-tag rule.
    pub fn is_focusable(&self, id: NodeId) -> bool {
        let el = match self.element(id) {
            Some(el) => el,
            None => return false,
        };
        if let Some(tabindex) = el.attr("tabindex") {
            if let Ok(value) = tabindex.trim().parse::<i32>() {
                if value >= 0 {
                    return true;
                }
            }
        }
        if !NATIVE_INTERACTIVE_TAGS.contains(&el.tag_name.as_str()) {
            return false;
        }
        if el.has_attr("disabled") {
            return false;
        }
        if el.tag_name == "a" {
            return el.has_attr("href");
        }
        true
    }

    pub fn get_focusable_elements(&self) -> Vec<NodeId> {
        self.get_all_elements()
            .into_iter()
            .filter(|id| self.is_focusable(*id))
            .collect()
    }

    /// Interactive as far as markup alone can tell: focusable, or carrying
    /// an inline `on*` handler attribute.
    pub fn get_interactive_elements(&self) -> Vec<NodeId> {
        self.get_all_elements()
            .into_iter()
            .filter(|id| {
                if self.is_focusable(*id) {
                    return true;
                }
                self.element(*id)
                    .map(|el| el.attributes.keys().any(|k| k.starts_with("on")))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Concatenated text-node content beneath a node.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Comment(_) => {}
            NodeData::Element(_) => {
                for child in &self.nodes[id.0].children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Accessible label resolved within this fragment.
    pub fn accessible_label(&self, id: NodeId) -> Option<String> {
        compute_label(self, id, &|ref_id| {
            self.get_element_by_id(ref_id)
                .map(|node| self.text_content(node))
        })
    }
}

/// Accessible-name computation: first non-empty of `aria-label`, resolved
/// `aria-labelledby`, text content, `alt` for images, `value`/`placeholder`
/// for form controls. `resolve` maps a referenced id to its text.
pub fn compute_label(
    fragment: &DomFragment,
    id: NodeId,
    resolve: &dyn Fn(&str) -> Option<String>,
) -> Option<String> {
    let el = fragment.element(id)?;
    if let Some(label) = el.attr("aria-label") {
        if !label.trim().is_empty() {
            return Some(label.trim().to_string());
        }
    }
    if let Some(refs) = el.attr("aria-labelledby") {
        let resolved: Vec<String> = refs
            .split_whitespace()
            .filter_map(resolve)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .collect();
        if !resolved.is_empty() {
            return Some(resolved.join(" "));
        }
    }
    let text = fragment.text_content(id);
    if !text.trim().is_empty() {
        return Some(text.trim().to_string());
    }
    if el.tag_name == "img" {
        if let Some(alt) = el.attr("alt") {
            if !alt.trim().is_empty() {
                return Some(alt.trim().to_string());
            }
        }
    }
    if matches!(el.tag_name.as_str(), "input" | "textarea" | "select" | "button") {
        for attr in ["value", "placeholder"] {
            if let Some(value) = el.attr(attr) {
                if !value.trim().is_empty() {
                    return Some(value.trim().to_string());
                }
            }
        }
    }
    None
}

static SELECTOR_REGEXP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(([\.\#]?)[-\w]+)|(?:\[([-\w]+)(?:=(?:"([^"]*)"|'([^']*)'|([^\]]*)))?\])"#)
        .unwrap()
});

/// One compound selector: `#id`, `.class`, `[attr]`, `[attr="value"]`,
/// tag, or a combination thereof.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleSelector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, Option<String>)>,
}

impl SimpleSelector {
    pub fn parse(selector: &str) -> Option<Self> {
        let selector = selector.trim();
        if selector.is_empty() {
            return None;
        }
        let mut parsed = SimpleSelector::default();
        let mut matched_anything = false;
        for cap in SELECTOR_REGEXP.captures_iter(selector) {
            matched_anything = true;
            if let Some(part) = cap.get(1) {
                let prefix = cap.get(2).map(|m| m.as_str()).unwrap_or("");
                let text = part.as_str();
                match prefix {
                    "#" => parsed.id = Some(text[1..].to_string()),
                    "." => parsed.classes.push(text[1..].to_string()),
                    _ => parsed.tag = Some(text.to_lowercase()),
                }
            } else if let Some(attr) = cap.get(3) {
                let value = cap
                    .get(4)
                    .or_else(|| cap.get(5))
                    .or_else(|| cap.get(6))
                    .map(|m| m.as_str().to_string())
                    .filter(|v| !v.is_empty());
                parsed.attrs.push((attr.as_str().to_string(), value));
            }
        }
        if matched_anything {
            Some(parsed)
        } else {
            None
        }
    }

    pub fn matches(&self, el: &ElementData) -> bool {
        if let Some(tag) = &self.tag {
            if *tag != "*" && el.tag_name != *tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        for class in &self.classes {
            if !el.classes().contains(&class.as_str()) {
                return false;
            }
        }
        for (name, expected) in &self.attrs {
            match (el.attr(name), expected) {
                (None, _) => return false,
                (Some(actual), Some(expected)) if actual != expected => return false,
                _ => {}
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn should_parse_selector_parts() {
        let sel = SimpleSelector::parse("button.primary[aria-expanded=\"true\"]").unwrap();
        assert_eq!(sel.tag.as_deref(), Some("button"));
        assert_eq!(sel.classes, vec!["primary".to_string()]);
        assert_eq!(
            sel.attrs,
            vec![("aria-expanded".to_string(), Some("true".to_string()))]
        );
    }

    #[test]
    fn should_match_by_id_class_tag_and_attr() {
        let el = element("button", &[("id", "save"), ("class", "btn primary")]);
        assert!(SimpleSelector::parse("#save").unwrap().matches(&el));
        assert!(SimpleSelector::parse(".primary").unwrap().matches(&el));
        assert!(SimpleSelector::parse("button").unwrap().matches(&el));
        assert!(SimpleSelector::parse("[id]").unwrap().matches(&el));
        assert!(!SimpleSelector::parse("#other").unwrap().matches(&el));
    }
}
