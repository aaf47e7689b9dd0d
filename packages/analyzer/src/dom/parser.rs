//! Markup parser
//!
//! Single-pass recursive parser over HTML or JSX text. Produces one DOM
//! fragment per top-level element. Recovery never aborts: mismatched or
//! unclosed tags are reported and the tree is repaired in place.

use std::sync::Arc;

use crate::chars;
use crate::parse_util::{ParseError, SourceFile, Span};

use super::model::{DomFragment, ElementData, NodeData, NodeId};

/// Tags that never have children.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Tags whose content is raw text until the matching close tag.
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

const P_CLOSERS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p", "pre",
    "section", "table", "ul",
];

#[derive(Debug, Clone)]
pub struct MarkupParseResult {
    pub fragments: Vec<DomFragment>,
    pub errors: Vec<ParseError>,
}

pub struct MarkupParser;

impl MarkupParser {
    pub fn new() -> Self {
        MarkupParser
    }

    pub fn parse(&self, source: &str, path: &str) -> MarkupParseResult {
        let file = SourceFile::new(path, source);
        let mut ctx = MarkupCtx::new(file, source, path);
        ctx.run();
        MarkupParseResult {
            fragments: ctx.fragments,
            errors: ctx.errors,
        }
    }
}

impl Default for MarkupParser {
    fn default() -> Self {
        Self::new()
    }
}

struct MarkupCtx<'a> {
    file: Arc<SourceFile>,
    input: &'a str,
    chars: Vec<char>,
    offsets: Vec<usize>,
    pos: usize,
    path: String,
    fragments: Vec<DomFragment>,
    current: Option<DomFragment>,
    stack: Vec<NodeId>,
    errors: Vec<ParseError>,
}

impl<'a> MarkupCtx<'a> {
    fn new(file: Arc<SourceFile>, input: &'a str, path: &str) -> Self {
        let mut chars_vec = Vec::new();
        let mut offsets = Vec::new();
        for (off, c) in input.char_indices() {
            offsets.push(off);
            chars_vec.push(c);
        }
        offsets.push(input.len());
        MarkupCtx {
            file,
            input,
            chars: chars_vec,
            offsets,
            pos: 0,
            path: path.to_string(),
            fragments: Vec::new(),
            current: None,
            stack: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn peek(&self) -> char {
        self.chars.get(self.pos).copied().unwrap_or(chars::EOF)
    }

    fn peek_at(&self, ahead: usize) -> char {
        self.chars.get(self.pos + ahead).copied().unwrap_or(chars::EOF)
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        if c != chars::EOF {
            self.pos += 1;
        }
        c
    }

    fn offset(&self) -> usize {
        self.offsets[self.pos.min(self.offsets.len() - 1)]
    }

    fn rest_starts_with(&self, text: &str) -> bool {
        self.input[self.offset()..].starts_with(text)
    }

    fn rest_starts_with_ignore_case(&self, text: &str) -> bool {
        let rest = &self.input[self.offset()..];
        rest.len() >= text.len() && rest[..text.len()].eq_ignore_ascii_case(text)
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.file.clone(), start, end)
    }

    fn error(&mut self, start: usize, msg: impl Into<String>) {
        let span = self.span(start, self.offset());
        self.errors.push(ParseError::new(span, msg));
    }

    fn warn(&mut self, start: usize, msg: impl Into<String>) {
        let span = self.span(start, self.offset());
        self.errors.push(ParseError::warning(span, msg));
    }

    fn run(&mut self) {
        let mut text_start = self.offset();
        let mut text = String::new();
        while self.peek() != chars::EOF {
            if self.peek() == chars::LT {
                self.flush_text(&mut text, text_start);
                self.parse_markup();
                text_start = self.offset();
            } else {
                text.push(self.advance());
            }
        }
        self.flush_text(&mut text, text_start);
        // implicitly close everything still open
        if !self.stack.is_empty() {
            let at = self.offset();
            self.warn(at, "Unclosed element at end of input");
            while !self.stack.is_empty() {
                self.pop_element();
            }
        }
        self.finish_fragment();
    }

    fn flush_text(&mut self, text: &mut String, start: usize) {
        if text.is_empty() {
            return;
        }
        let value = decode_entities(&std::mem::take(text));
        if let Some(top) = self.stack.last().copied() {
            let end = self.offset();
            let span = self.span(start, end);
            if let Some(fragment) = self.current.as_mut() {
                let node = fragment.create_node(NodeData::Text(value), Some(span));
                fragment.append_child(top, node);
            }
        }
        // text outside any element is dropped
    }

    fn parse_markup(&mut self) {
        let start = self.offset();
        if self.rest_starts_with("<!--") {
            self.parse_comment(start);
        } else if self.rest_starts_with("<![CDATA[") {
            self.parse_cdata(start);
        } else if self.rest_starts_with("<!") {
            // DOCTYPE and friends: skip to `>`
            while self.peek() != chars::GT && self.peek() != chars::EOF {
                self.advance();
            }
            self.advance();
        } else if self.peek_at(1) == chars::SLASH {
            self.parse_closing_tag(start);
        } else if chars::is_tag_name_char(self.peek_at(1)) {
            self.parse_element(start);
        } else {
            // stray `<`: treat as text
            self.advance();
            if let Some(top) = self.stack.last().copied() {
                let span = self.span(start, self.offset());
                if let Some(fragment) = self.current.as_mut() {
                    let node = fragment.create_node(NodeData::Text("<".to_string()), Some(span));
                    fragment.append_child(top, node);
                }
            }
        }
    }

    fn parse_comment(&mut self, start: usize) {
        for _ in 0..4 {
            self.advance();
        }
        let content_start = self.offset();
        while !self.rest_starts_with("-->") && self.peek() != chars::EOF {
            self.advance();
        }
        let content = self.input[content_start..self.offset()].to_string();
        for _ in 0..3 {
            self.advance();
        }
        if let Some(top) = self.stack.last().copied() {
            let span = self.span(start, self.offset());
            if let Some(fragment) = self.current.as_mut() {
                let node = fragment.create_node(NodeData::Comment(content), Some(span));
                fragment.append_child(top, node);
            }
        }
    }

    fn parse_cdata(&mut self, start: usize) {
        for _ in 0..9 {
            self.advance();
        }
        let content_start = self.offset();
        while !self.rest_starts_with("]]>") && self.peek() != chars::EOF {
            self.advance();
        }
        let content = self.input[content_start..self.offset()].to_string();
        for _ in 0..3 {
            self.advance();
        }
        if let Some(top) = self.stack.last().copied() {
            let span = self.span(start, self.offset());
            if let Some(fragment) = self.current.as_mut() {
                let node = fragment.create_node(NodeData::Text(content), Some(span));
                fragment.append_child(top, node);
            }
        }
    }

    fn parse_closing_tag(&mut self, start: usize) {
        self.advance(); // <
        self.advance(); // /
        let name_start = self.offset();
        while chars::is_tag_name_char(self.peek()) {
            self.advance();
        }
        let name = self.input[name_start..self.offset()].to_lowercase();
        while self.peek() != chars::GT && self.peek() != chars::EOF {
            self.advance();
        }
        self.advance(); // >

        let matches_open = self.stack.iter().rev().position(|id| {
            self.current
                .as_ref()
                .and_then(|f| f.element(*id))
                .map(|el| el.tag_name == name)
                .unwrap_or(false)
        });
        match matches_open {
            Some(depth_from_top) => {
                for _ in 0..depth_from_top {
                    let at = self.offset();
                    self.warn(at, "Implicitly closed element");
                    self.pop_element();
                }
                self.pop_element();
                self.finish_if_root_closed();
            }
            None => {
                self.error(start, format!("Unexpected closing tag \"{}\"", name));
            }
        }
    }

    fn parse_element(&mut self, start: usize) {
        self.advance(); // <
        let name_start = self.offset();
        while chars::is_tag_name_char(self.peek()) {
            self.advance();
        }
        let tag_name = self.input[name_start..self.offset()].to_lowercase();
        let mut attributes = indexmap::IndexMap::new();

        loop {
            while chars::is_whitespace(self.peek()) {
                self.advance();
            }
            let c = self.peek();
            if c == chars::GT || c == chars::EOF {
                break;
            }
            if c == chars::SLASH && self.peek_at(1) == chars::GT {
                break;
            }
            let attr_start = self.offset();
            let mut name = String::new();
            while chars::is_attr_name_char(self.peek()) {
                name.push(self.advance());
            }
            if name.is_empty() {
                // unparseable character inside the tag; skip it
                self.advance();
                continue;
            }
            let name = normalize_attr_name(&name);
            let mut value = String::new();
            while chars::is_whitespace(self.peek()) {
                self.advance();
            }
            if self.peek() == chars::EQ {
                self.advance();
                while chars::is_whitespace(self.peek()) {
                    self.advance();
                }
                let q = self.peek();
                if q == chars::DQ || q == chars::SQ {
                    self.advance();
                    while self.peek() != q && self.peek() != chars::EOF {
                        value.push(self.advance());
                    }
                    self.advance();
                } else if q == chars::LBRACE {
                    // JSX expression value: capture the braces verbatim
                    let mut depth = 0usize;
                    loop {
                        let e = self.peek();
                        if e == chars::EOF {
                            break;
                        }
                        value.push(self.advance());
                        if e == chars::LBRACE {
                            depth += 1;
                        } else if e == chars::RBRACE {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                    }
                } else {
                    while !chars::is_whitespace(self.peek())
                        && self.peek() != chars::GT
                        && self.peek() != chars::EOF
                    {
                        value.push(self.advance());
                    }
                }
            }
            if attributes.contains_key(&name) {
                self.warn(attr_start, format!("Duplicate attribute \"{}\"", name));
            }
            attributes.insert(name, decode_entities(&value));
        }

        let self_closing = self.peek() == chars::SLASH;
        if self_closing {
            self.advance();
        }
        if self.peek() == chars::GT {
            self.advance();
        } else {
            self.error(start, format!("Unterminated tag \"{}\"", tag_name));
        }
        let span = self.span(start, self.offset());

        // implicit close of the open sibling (li/li, p/block, ...)
        while let Some(top) = self.stack.last().copied() {
            let top_tag = self
                .current
                .as_ref()
                .and_then(|f| f.element(top))
                .map(|el| el.tag_name.clone());
            match top_tag {
                Some(open) if implicitly_closes(&open, &tag_name) => {
                    self.pop_element();
                    self.finish_if_root_closed();
                }
                _ => break,
            }
        }

        if self.current.is_none() {
            self.current = Some(DomFragment::new(self.path.clone()));
        }
        let element = NodeData::Element(ElementData {
            tag_name: tag_name.clone(),
            attributes,
        });
        let Some(fragment) = self.current.as_mut() else {
            return;
        };
        let node = fragment.create_node(element, Some(span));
        if let Some(top) = self.stack.last().copied() {
            fragment.append_child(top, node);
        }

        let is_void = VOID_TAGS.contains(&tag_name.as_str());
        if !is_void && !self_closing {
            self.stack.push(node);
            if RAW_TEXT_TAGS.contains(&tag_name.as_str()) {
                self.parse_raw_text(&tag_name);
            }
        } else if self.stack.is_empty() {
            // a void/self-closing element at top level is a whole fragment
            self.finish_fragment();
        }
    }

    /// Content of `<script>`/`<style>` is raw text until the close tag.
    fn parse_raw_text(&mut self, tag_name: &str) {
        let close = format!("</{}", tag_name);
        let content_start = self.offset();
        while !self.rest_starts_with_ignore_case(&close) && self.peek() != chars::EOF {
            self.advance();
        }
        let content = self.input[content_start..self.offset()].to_string();
        if !content.is_empty() {
            let span = self.span(content_start, self.offset());
            if let (Some(top), Some(fragment)) = (self.stack.last().copied(), self.current.as_mut())
            {
                let node = fragment.create_node(NodeData::Text(content), Some(span));
                fragment.append_child(top, node);
            }
        }
    }

    fn pop_element(&mut self) {
        self.stack.pop();
    }

    fn finish_if_root_closed(&mut self) {
        if self.stack.is_empty() {
            self.finish_fragment();
        }
    }

    fn finish_fragment(&mut self) {
        if let Some(fragment) = self.current.take() {
            if !fragment.is_empty() {
                self.fragments.push(fragment);
            }
        }
    }
}

/// Decode the common named character references and numeric references.
/// Unrecognized references pass through verbatim.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let semi = match rest.find(';') {
            Some(i) if i <= 12 => i,
            _ => {
                out.push('&');
                rest = &rest[1..];
                continue;
            }
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{00A0}'),
            _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
            }
            _ if entity.starts_with('#') => {
                entity[1..].parse::<u32>().ok().and_then(char::from_u32)
            }
            _ => None,
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn normalize_attr_name(name: &str) -> String {
    match name {
        "className" => "class".to_string(),
        "htmlFor" => "for".to_string(),
        other => other.to_string(),
    }
}

fn implicitly_closes(open: &str, incoming: &str) -> bool {
    match open {
        "li" => incoming == "li",
        "option" => incoming == "option" || incoming == "optgroup",
        "tr" => incoming == "tr",
        "td" | "th" => incoming == "td" || incoming == "th" || incoming == "tr",
        "p" => P_CLOSERS.contains(&incoming),
        _ => false,
    }
}
