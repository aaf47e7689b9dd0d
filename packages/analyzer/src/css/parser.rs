//! CSS parser
//!
//! Block-structured scan of one stylesheet. Comments are blanked out in
//! place so offsets stay stable; unknown at-rules are skipped balanced-
//! brace-wise with a warning. Selector lists are split on top-level
//! commas into one rule per selector sharing the same declarations.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::parse_util::{ParseError, SourceFile, Span};

use super::model::{CssModel, CssRule, RuleType};

#[derive(Debug, Clone)]
pub struct CssParseResult {
    pub model: CssModel,
    pub errors: Vec<ParseError>,
}

pub struct CssParser;

impl CssParser {
    pub fn new() -> Self {
        CssParser
    }

    pub fn parse(&self, source: &str, path: &str) -> CssParseResult {
        let file = SourceFile::new(path, source);
        let blanked = blank_comments(source);
        let mut ctx = CssCtx {
            file,
            source: blanked,
            pos: 0,
            model: CssModel::new(path),
            errors: Vec::new(),
        };
        ctx.parse_rules(None);
        CssParseResult {
            model: ctx.model,
            errors: ctx.errors,
        }
    }
}

impl Default for CssParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace `/* ... */` comments with whitespace of equal byte length so
/// every offset into the blanked text is valid in the original.
fn blank_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c == '/' && chars.peek().map(|(_, n)| *n) == Some('*') {
            chars.next();
            out.push_str("  ");
            let mut star = false;
            for (_, inner) in chars.by_ref() {
                if inner == '\n' {
                    out.push('\n');
                    star = false;
                    continue;
                }
                for _ in 0..inner.len_utf8() {
                    out.push(' ');
                }
                if star && inner == '/' {
                    break;
                }
                star = inner == '*';
            }
        } else {
            out.push(c);
        }
    }
    out
}

struct CssCtx {
    file: Arc<SourceFile>,
    source: String,
    pos: usize,
    model: CssModel,
    errors: Vec<ParseError>,
}

impl CssCtx {
    fn rest(&self) -> &str {
        &self.source[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.rest().chars().next() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.file.clone(), start, end)
    }

    fn warn(&mut self, start: usize, msg: impl Into<String>) {
        let span = self.span(start, self.pos);
        self.errors.push(ParseError::warning(span, msg));
    }

    /// Find the next occurrence of any of `stops` at top nesting level,
    /// honoring strings and parentheses. Returns (offset, stop char).
    fn find_top_level(&self, stops: &[char]) -> Option<(usize, char)> {
        let mut depth = 0i32;
        let mut chars = self.rest().char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' | '\'' => {
                    for (_, inner) in chars.by_ref() {
                        if inner == c {
                            break;
                        }
                    }
                }
                '(' | '[' => depth += 1,
                ')' | ']' => depth -= 1,
                _ if depth == 0 && stops.contains(&c) => {
                    return Some((self.pos + i, c));
                }
                _ => {}
            }
        }
        None
    }

    /// Offset just past the `}` matching the `{` at `self.pos`.
    fn matching_brace_end(&self) -> usize {
        let mut depth = 0i32;
        let mut chars = self.rest().char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' | '\'' => {
                    for (_, inner) in chars.by_ref() {
                        if inner == c {
                            break;
                        }
                    }
                }
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return self.pos + i + 1;
                    }
                }
                _ => {}
            }
        }
        self.source.len()
    }

    fn parse_rules(&mut self, media_query: Option<&str>) {
        loop {
            self.skip_whitespace();
            if self.at_end() || self.rest().starts_with('}') {
                return;
            }
            if self.rest().starts_with('@') {
                self.parse_at_rule(media_query);
                continue;
            }
            let rule_start = self.pos;
            let (brace_or_semi, stop) = match self.find_top_level(&['{', ';', '}']) {
                Some(found) => found,
                None => {
                    self.pos = self.source.len();
                    self.warn(rule_start, "Unterminated rule");
                    return;
                }
            };
            if stop != '{' {
                // stray tokens up to `;`/`}`
                self.pos = brace_or_semi + 1;
                self.warn(rule_start, "Declaration outside a rule block");
                continue;
            }
            let selector_text = self.source[rule_start..brace_or_semi].trim().to_string();
            self.pos = brace_or_semi;
            let block_end = self.matching_brace_end();
            let body = &self.source[brace_or_semi + 1..block_end.saturating_sub(1)];
            let properties = parse_declarations(body);
            self.pos = block_end;
            let span = self.span(rule_start, block_end);

            for selector in split_selector_list(&selector_text) {
                let rule_type = if media_query.is_some() {
                    RuleType::Media
                } else {
                    RuleType::Style
                };
                let mut rule = CssRule::new(rule_type, selector);
                rule.media_query = media_query.map(|q| q.to_string());
                rule.properties = properties.clone();
                rule.span = Some(span.clone());
                self.model.push(rule);
            }
        }
    }

    fn parse_at_rule(&mut self, outer_media: Option<&str>) {
        let start = self.pos;
        let (name_end, _) = match self.find_top_level(&[' ', '\t', '\n', '{', ';']) {
            Some(found) => found,
            None => {
                self.pos = self.source.len();
                return;
            }
        };
        let name = self.source[start..name_end].to_string();
        self.pos = name_end;
        self.skip_whitespace();

        match name.as_str() {
            "@import" => {
                let (end, _) = self
                    .find_top_level(&[';'])
                    .unwrap_or((self.source.len(), ';'));
                let target = self.source[self.pos..end].trim().to_string();
                self.pos = (end + 1).min(self.source.len());
                let mut rule = CssRule::new(RuleType::Import, target);
                rule.span = Some(self.span(start, self.pos));
                self.model.push(rule);
            }
            "@media" => {
                let (brace, stop) = match self.find_top_level(&['{', ';']) {
                    Some(found) => found,
                    None => {
                        self.pos = self.source.len();
                        return;
                    }
                };
                if stop != '{' {
                    self.pos = brace + 1;
                    return;
                }
                let query = self.source[self.pos..brace].trim().to_string();
                self.pos = brace + 1;
                // nested media queries collapse onto the innermost query
                let _ = outer_media;
                self.parse_rules(Some(&query));
                self.skip_whitespace();
                if self.rest().starts_with('}') {
                    self.pos += 1;
                }
            }
            "@keyframes" | "@-webkit-keyframes" => {
                let (brace, stop) = match self.find_top_level(&['{', ';']) {
                    Some(found) => found,
                    None => {
                        self.pos = self.source.len();
                        return;
                    }
                };
                let animation_name = self.source[self.pos..brace].trim().to_string();
                self.pos = brace;
                if stop == '{' {
                    self.pos = self.matching_brace_end();
                }
                let mut rule = CssRule::new(RuleType::Keyframes, animation_name);
                rule.span = Some(self.span(start, self.pos));
                self.model.push(rule);
            }
            "@font-face" => {
                let (brace, stop) = match self.find_top_level(&['{', ';']) {
                    Some(found) => found,
                    None => {
                        self.pos = self.source.len();
                        return;
                    }
                };
                self.pos = brace;
                if stop == '{' {
                    let block_end = self.matching_brace_end();
                    let body = &self.source[brace + 1..block_end.saturating_sub(1)];
                    let mut rule = CssRule::new(RuleType::FontFace, "@font-face");
                    rule.properties = parse_declarations(body);
                    rule.span = Some(self.span(start, block_end));
                    self.pos = block_end;
                    self.model.push(rule);
                }
            }
            _ => {
                // unknown at-rule: skip it whole
                let (brace, stop) = match self.find_top_level(&['{', ';']) {
                    Some(found) => found,
                    None => {
                        self.pos = self.source.len();
                        return;
                    }
                };
                self.pos = brace;
                if stop == '{' {
                    self.pos = self.matching_brace_end();
                } else {
                    self.pos += 1;
                }
                self.warn(start, format!("Skipped unsupported at-rule {}", name));
            }
        }
    }
}

fn split_selector_list(selector_text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    let mut chars = selector_text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                current.push(c);
                for inner in chars.by_ref() {
                    current.push(inner);
                    if inner == c {
                        break;
                    }
                }
            }
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                let trimmed = current.trim().to_string();
                if !trimmed.is_empty() {
                    out.push(trimmed);
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    let trimmed = current.trim().to_string();
    if !trimmed.is_empty() {
        out.push(trimmed);
    }
    out
}

fn parse_declarations(body: &str) -> IndexMap<String, String> {
    let mut properties = IndexMap::new();
    for declaration in split_top_level(body, ';') {
        let declaration = declaration.trim();
        if declaration.is_empty() {
            continue;
        }
        if let Some(colon) = declaration.find(':') {
            let name = declaration[..colon].trim().to_lowercase();
            let value = declaration[colon + 1..].trim().to_string();
            if !name.is_empty() && !value.is_empty() {
                properties.insert(name, value);
            }
        }
    }
    properties
}

fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                current.push(c);
                for inner in chars.by_ref() {
                    current.push(inner);
                    if inner == c {
                        break;
                    }
                }
            }
            '(' | '{' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | '}' | ']' => {
                depth -= 1;
                current.push(c);
            }
            c if c == separator && depth == 0 => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    out.push(current);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::model::{PseudoClass, RuleImpact};

    fn parse(css: &str) -> CssModel {
        CssParser::new().parse(css, "test.css").model
    }

    #[test]
    fn should_parse_style_rules_with_declarations() {
        let model = parse(".btn { color: red; padding: 4px; }");
        assert_eq!(model.rules.len(), 1);
        assert_eq!(model.rules[0].selector, ".btn");
        assert_eq!(model.rules[0].property("color"), Some("red"));
        assert_eq!(model.rules[0].property("padding"), Some("4px"));
    }

    #[test]
    fn should_split_selector_lists() {
        let model = parse("h1, h2 { margin: 0; }");
        assert_eq!(model.rules.len(), 2);
        assert_eq!(model.rules[0].selector, "h1");
        assert_eq!(model.rules[1].selector, "h2");
        assert_eq!(model.rules[1].source_order, 1);
    }

    #[test]
    fn should_stamp_media_query_on_inner_rules() {
        let model = parse("@media (max-width: 600px) { .nav { display: none; } }");
        assert_eq!(model.rules.len(), 1);
        assert_eq!(model.rules[0].rule_type, RuleType::Media);
        assert_eq!(model.rules[0].media_query.as_deref(), Some("(max-width: 600px)"));
    }

    #[test]
    fn should_parse_keyframes_import_and_font_face() {
        let model = parse(
            "@import url(\"base.css\");\n\
             @keyframes spin { from { transform: rotate(0); } }\n\
             @font-face { font-family: X; src: url(x.woff); }",
        );
        assert_eq!(model.rules.len(), 3);
        assert_eq!(model.rules[0].rule_type, RuleType::Import);
        assert_eq!(model.rules[1].rule_type, RuleType::Keyframes);
        assert_eq!(model.rules[2].rule_type, RuleType::FontFace);
    }

    #[test]
    fn should_ignore_comments() {
        let model = parse("/* header */ .a { /* inline */ color: blue; }");
        assert_eq!(model.rules.len(), 1);
        assert_eq!(model.rules[0].property("color"), Some("blue"));
    }

    #[test]
    fn should_extract_focus_pseudo_and_impact() {
        let model = parse("button:focus { outline: 2px solid blue; }");
        assert_eq!(model.rules[0].pseudo_class, Some(PseudoClass::Focus));
        assert!(model.rules[0].impact.contains(RuleImpact::AFFECTS_FOCUS));
        assert!(model.rules[0].impact.contains(RuleImpact::HAS_PSEUDO_CLASS));
    }

    #[test]
    fn should_round_trip_rule_set() {
        let css = "#nav { color: black; }\n.item:hover { color: red; }\n@media screen { p { margin: 0; } }";
        let first = parse(css);
        let regenerated = first.to_css_text();
        let second = CssParser::new().parse(&regenerated, "test.css").model;
        assert_eq!(first.rules.len(), second.rules.len());
        for (a, b) in first.rules.iter().zip(second.rules.iter()) {
            assert_eq!(a.selector, b.selector);
            assert_eq!(a.rule_type, b.rule_type);
            assert_eq!(a.properties, b.properties);
            assert_eq!(a.specificity, b.specificity);
            assert_eq!(a.media_query, b.media_query);
        }
    }
}
