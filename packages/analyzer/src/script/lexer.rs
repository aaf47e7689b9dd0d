//! Script lexer
//!
//! Tokenizes the JavaScript subset. Tokens carry `(index, end)` byte
//! offsets and whether a line terminator preceded them (consumed by the
//! parser's semicolon-insertion approximation).

use crate::chars;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Single punctuation characters: `( ) [ ] { } ; , : .`
    Character,
    Identifier,
    Keyword,
    String,
    Template,
    Operator,
    Number,
    Error,
}

/// Raw pieces of a template literal: cooked text and the source of each
/// `${...}` interpolation with its absolute offset. The parser re-lexes
/// the interpolation sources.
#[derive(Debug, Clone)]
pub enum TemplateSegment {
    Text(String),
    Expr { source: String, offset: usize },
}

#[derive(Debug, Clone)]
pub struct Token {
    pub index: usize,
    pub end: usize,
    pub token_type: TokenType,
    pub num_value: f64,
    pub str_value: String,
    pub newline_before: bool,
    pub segments: Vec<TemplateSegment>,
}

impl Token {
    fn new(index: usize, end: usize, token_type: TokenType, str_value: String) -> Self {
        Token {
            index,
            end,
            token_type,
            num_value: 0.0,
            str_value,
            newline_before: false,
            segments: Vec::new(),
        }
    }

    pub fn is_character(&self, c: char) -> bool {
        self.token_type == TokenType::Character && self.str_value.chars().next() == Some(c)
    }

    pub fn is_identifier(&self) -> bool {
        self.token_type == TokenType::Identifier
    }

    pub fn is_keyword(&self, kw: &str) -> bool {
        self.token_type == TokenType::Keyword && self.str_value == kw
    }

    pub fn is_any_keyword(&self) -> bool {
        self.token_type == TokenType::Keyword
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.token_type == TokenType::Operator && self.str_value == op
    }

    pub fn is_number(&self) -> bool {
        self.token_type == TokenType::Number
    }

    pub fn is_string(&self) -> bool {
        self.token_type == TokenType::String
    }

    pub fn is_template(&self) -> bool {
        self.token_type == TokenType::Template
    }

    pub fn is_error(&self) -> bool {
        self.token_type == TokenType::Error
    }

    /// Identifier-like text usable as a member/property name.
    pub fn is_property_name(&self) -> bool {
        self.token_type == TokenType::Identifier || self.token_type == TokenType::Keyword
    }
}

pub const KEYWORDS: &[&str] = &[
    "var", "let", "const", "function", "class", "extends", "static", "return", "if", "else",
    "for", "while", "do", "switch", "case", "default", "break", "continue", "new", "delete",
    "typeof", "instanceof", "in", "of", "try", "catch", "finally", "throw", "this", "super",
    "true", "false", "null", "void", "await", "async", "yield", "import", "export", "from",
    "as",
];

const THREE_CHAR_OPS: &[&str] = &[
    "===", "!==", "**=", "<<=", ">>=", "...", "&&=", "||=", "??=",
];

const TWO_CHAR_OPS: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "=>", "++", "--", "+=", "-=", "*=", "/=",
    "%=", "**", "<<", ">>", "&=", "|=", "^=",
];

const ONE_CHAR_OPS: &[char] = &['+', '-', '*', '/', '%', '=', '<', '>', '!', '~', '&', '|', '^', '?'];

const PUNCTUATION: &[char] = &['(', ')', '[', ']', '{', '}', ';', ',', ':', '.'];

pub struct Lexer;

impl Lexer {
    pub fn new() -> Self {
        Lexer
    }

    pub fn tokenize(&self, input: &str) -> Vec<Token> {
        let mut scanner = Scanner::new(input);
        let mut tokens = Vec::new();
        loop {
            match scanner.scan_token() {
                Some(token) => tokens.push(token),
                None => break,
            }
        }
        tokens
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

struct Scanner<'a> {
    input: &'a str,
    chars: Vec<char>,
    /// Byte offset of each entry in `chars`, plus the final length.
    offsets: Vec<usize>,
    pos: usize,
    newline_pending: bool,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        let mut chars = Vec::new();
        let mut offsets = Vec::new();
        for (off, c) in input.char_indices() {
            offsets.push(off);
            chars.push(c);
        }
        offsets.push(input.len());
        Scanner {
            input,
            chars,
            offsets,
            pos: 0,
            newline_pending: false,
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

    fn skip_trivia(&mut self) {
        loop {
            let c = self.peek();
            if chars::is_whitespace(c) {
                if c == chars::NEWLINE {
                    self.newline_pending = true;
                }
                self.advance();
            } else if c == chars::SLASH && self.peek_at(1) == chars::SLASH {
                while self.peek() != chars::NEWLINE && self.peek() != chars::EOF {
                    self.advance();
                }
            } else if c == chars::SLASH && self.peek_at(1) == chars::STAR {
                self.advance();
                self.advance();
                while self.peek() != chars::EOF {
                    if self.peek() == chars::NEWLINE {
                        self.newline_pending = true;
                    }
                    if self.peek() == chars::STAR && self.peek_at(1) == chars::SLASH {
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn scan_token(&mut self) -> Option<Token> {
        self.skip_trivia();
        let c = self.peek();
        if c == chars::EOF {
            return None;
        }
        let newline_before = self.newline_pending;
        self.newline_pending = false;

        let mut token = if chars::is_identifier_start(c) {
            self.scan_identifier()
        } else if chars::is_digit(c) || (c == chars::PERIOD && chars::is_digit(self.peek_at(1))) {
            self.scan_number()
        } else if c == chars::DQ || c == chars::SQ {
            self.scan_string()
        } else if c == chars::BACKTICK {
            self.scan_template()
        } else {
            self.scan_operator_or_punct()
        };
        token.newline_before = newline_before;
        Some(token)
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.offset();
        while chars::is_identifier_part(self.peek()) {
            self.advance();
        }
        let end = self.offset();
        let text = &self.input[start..end];
        let token_type = if KEYWORDS.contains(&text) {
            TokenType::Keyword
        } else {
            TokenType::Identifier
        };
        Token::new(start, end, token_type, text.to_string())
    }

    fn scan_number(&mut self) -> Token {
        let start = self.offset();
        if self.peek() == '0' && matches!(self.peek_at(1), 'x' | 'X' | 'o' | 'O' | 'b' | 'B') {
            let radix_char = self.peek_at(1);
            self.advance();
            self.advance();
            let digits_start = self.offset();
            while self.peek().is_ascii_alphanumeric() || self.peek() == chars::UNDERSCORE {
                self.advance();
            }
            let end = self.offset();
            let digits: String = self.input[digits_start..end]
                .chars()
                .filter(|c| *c != chars::UNDERSCORE)
                .collect();
            let radix = match radix_char {
                'x' | 'X' => 16,
                'o' | 'O' => 8,
                _ => 2,
            };
            let value = i64::from_str_radix(&digits, radix).unwrap_or(0) as f64;
            let mut token = Token::new(start, end, TokenType::Number, self.input[start..end].to_string());
            token.num_value = value;
            return token;
        }

        while chars::is_digit(self.peek()) || self.peek() == chars::UNDERSCORE {
            self.advance();
        }
        if self.peek() == chars::PERIOD && chars::is_digit(self.peek_at(1)) {
            self.advance();
            while chars::is_digit(self.peek()) || self.peek() == chars::UNDERSCORE {
                self.advance();
            }
        }
        if matches!(self.peek(), 'e' | 'E') {
            let mut ahead = 1;
            if matches!(self.peek_at(1), '+' | '-') {
                ahead = 2;
            }
            if chars::is_digit(self.peek_at(ahead)) {
                for _ in 0..ahead {
                    self.advance();
                }
                while chars::is_digit(self.peek()) {
                    self.advance();
                }
            }
        }
        let end = self.offset();
        let raw = self.input[start..end].to_string();
        let cleaned: String = raw.chars().filter(|c| *c != chars::UNDERSCORE).collect();
        let mut token = Token::new(start, end, TokenType::Number, raw);
        token.num_value = cleaned.parse::<f64>().unwrap_or(f64::NAN);
        token
    }

    fn scan_string(&mut self) -> Token {
        let start = self.offset();
        let quote = self.advance();
        let mut value = String::new();
        loop {
            let c = self.peek();
            if c == chars::EOF || c == chars::NEWLINE {
                let end = self.offset();
                return Token::new(start, end, TokenType::Error, "Unterminated string".to_string());
            }
            if c == quote {
                self.advance();
                break;
            }
            if c == chars::BACKSLASH {
                self.advance();
                value.push(self.scan_escape());
            } else {
                value.push(self.advance());
            }
        }
        let end = self.offset();
        Token::new(start, end, TokenType::String, value)
    }

    fn scan_escape(&mut self) -> char {
        let c = self.advance();
        match c {
            'n' => chars::NEWLINE,
            't' => chars::TAB,
            'r' => chars::CR,
            '0' => chars::EOF,
            'u' => {
                if self.peek() == chars::LBRACE {
                    self.advance();
                    let mut hex = String::new();
                    while self.peek() != chars::RBRACE && self.peek() != chars::EOF {
                        hex.push(self.advance());
                    }
                    self.advance();
                    u32::from_str_radix(&hex, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .unwrap_or(chars::QUESTION)
                } else {
                    let mut hex = String::new();
                    for _ in 0..4 {
                        if self.peek().is_ascii_hexdigit() {
                            hex.push(self.advance());
                        }
                    }
                    u32::from_str_radix(&hex, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .unwrap_or(chars::QUESTION)
                }
            }
            'x' => {
                let mut hex = String::new();
                for _ in 0..2 {
                    if self.peek().is_ascii_hexdigit() {
                        hex.push(self.advance());
                    }
                }
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or(chars::QUESTION)
            }
            other => other,
        }
    }

    /// Scan a whole template literal into text/interpolation segments.
    /// Interpolation sources are captured raw, balancing nested braces,
    /// strings and nested templates; the parser re-lexes them.
    fn scan_template(&mut self) -> Token {
        let start = self.offset();
        self.advance(); // `
        let mut segments = Vec::new();
        let mut text = String::new();
        loop {
            let c = self.peek();
            if c == chars::EOF {
                let end = self.offset();
                return Token::new(start, end, TokenType::Error, "Unterminated template literal".to_string());
            }
            if c == chars::BACKTICK {
                self.advance();
                break;
            }
            if c == chars::BACKSLASH {
                self.advance();
                text.push(self.scan_escape());
                continue;
            }
            if c == chars::DOLLAR && self.peek_at(1) == chars::LBRACE {
                segments.push(TemplateSegment::Text(std::mem::take(&mut text)));
                self.advance();
                self.advance();
                let expr_start = self.offset();
                let mut depth = 1usize;
                while depth > 0 && self.peek() != chars::EOF {
                    let e = self.peek();
                    match e {
                        chars::LBRACE => depth += 1,
                        chars::RBRACE => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        chars::DQ | chars::SQ => {
                            let quote = e;
                            self.advance();
                            while self.peek() != quote && self.peek() != chars::EOF {
                                if self.peek() == chars::BACKSLASH {
                                    self.advance();
                                }
                                self.advance();
                            }
                        }
                        chars::BACKTICK => {
                            // nested template: consume it wholesale
                            self.advance();
                            let mut tpl_depth = 0usize;
                            while self.peek() != chars::EOF {
                                let t = self.peek();
                                if t == chars::BACKSLASH {
                                    self.advance();
                                    self.advance();
                                    continue;
                                }
                                if t == chars::DOLLAR && self.peek_at(1) == chars::LBRACE {
                                    tpl_depth += 1;
                                    self.advance();
                                } else if t == chars::RBRACE && tpl_depth > 0 {
                                    tpl_depth -= 1;
                                } else if t == chars::BACKTICK && tpl_depth == 0 {
                                    break;
                                }
                                self.advance();
                            }
                        }
                        _ => {}
                    }
                    self.advance();
                }
                let expr_end = self.offset();
                segments.push(TemplateSegment::Expr {
                    source: self.input[expr_start..expr_end].to_string(),
                    offset: expr_start,
                });
                self.advance(); // }
                continue;
            }
            text.push(self.advance());
        }
        segments.push(TemplateSegment::Text(text));
        let end = self.offset();
        let mut token = Token::new(start, end, TokenType::Template, String::new());
        token.segments = segments;
        token
    }

    fn scan_operator_or_punct(&mut self) -> Token {
        let start = self.offset();
        // four-char first: >>>=
        if self.rest_starts_with(">>>=") {
            for _ in 0..4 {
                self.advance();
            }
            return Token::new(start, self.offset(), TokenType::Operator, ">>>=".to_string());
        }
        if self.rest_starts_with(">>>") {
            for _ in 0..3 {
                self.advance();
            }
            return Token::new(start, self.offset(), TokenType::Operator, ">>>".to_string());
        }
        for op in THREE_CHAR_OPS {
            if self.rest_starts_with(op) {
                for _ in 0..3 {
                    self.advance();
                }
                return Token::new(start, self.offset(), TokenType::Operator, (*op).to_string());
            }
        }
        for op in TWO_CHAR_OPS {
            if self.rest_starts_with(op) {
                for _ in 0..2 {
                    self.advance();
                }
                return Token::new(start, self.offset(), TokenType::Operator, (*op).to_string());
            }
        }
        let c = self.advance();
        if PUNCTUATION.contains(&c) {
            return Token::new(start, self.offset(), TokenType::Character, c.to_string());
        }
        if ONE_CHAR_OPS.contains(&c) {
            return Token::new(start, self.offset(), TokenType::Operator, c.to_string());
        }
        Token::new(
            start,
            self.offset(),
            TokenType::Error,
            format!("Unexpected character `{}`", c),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new().tokenize(input)
    }

    #[test]
    fn should_tokenize_identifiers_and_keywords() {
        let tokens = lex("const answer = value");
        assert_eq!(tokens.len(), 4);
        assert!(tokens[0].is_keyword("const"));
        assert!(tokens[1].is_identifier());
        assert!(tokens[2].is_operator("="));
        assert_eq!(tokens[3].str_value, "value");
    }

    #[test]
    fn should_tokenize_numbers() {
        let tokens = lex("1 2.5 0x10 1e3");
        assert_eq!(tokens[0].num_value, 1.0);
        assert_eq!(tokens[1].num_value, 2.5);
        assert_eq!(tokens[2].num_value, 16.0);
        assert_eq!(tokens[3].num_value, 1000.0);
    }

    #[test]
    fn should_tokenize_strings_with_escapes() {
        let tokens = lex(r#"'a\nb' "c\"d""#);
        assert_eq!(tokens[0].str_value, "a\nb");
        assert_eq!(tokens[1].str_value, "c\"d");
    }

    #[test]
    fn should_apply_maximal_munch_to_operators() {
        let tokens = lex("a === b && c ?? d?.e");
        assert!(tokens[1].is_operator("==="));
        assert!(tokens[3].is_operator("&&"));
        assert!(tokens[5].is_operator("??"));
        assert!(tokens[7].is_operator("?."));
    }

    #[test]
    fn should_record_newline_before_tokens() {
        let tokens = lex("a\nb");
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
    }

    #[test]
    fn should_skip_comments() {
        let tokens = lex("a // line\n/* block */ b");
        assert_eq!(tokens.len(), 2);
        assert!(tokens[1].newline_before);
    }

    #[test]
    fn should_scan_template_segments() {
        let tokens = lex("`hello ${name}!`");
        assert!(tokens[0].is_template());
        assert_eq!(tokens[0].segments.len(), 3);
        match &tokens[0].segments[1] {
            TemplateSegment::Expr { source, .. } => assert_eq!(source, "name"),
            other => panic!("expected expr segment, got {:?}", other),
        }
    }
}
