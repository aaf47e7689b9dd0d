//! Character constants used by the lexers

#![allow(dead_code)]

pub const EOF: char = '\0';
pub const TAB: char = '\t';
pub const LF: char = '\n';
pub const NEWLINE: char = '\n';
pub const CR: char = '\r';
pub const SPACE: char = ' ';

pub const BANG: char = '!';
pub const DQ: char = '"';
pub const HASH: char = '#';
pub const DOLLAR: char = '$';
pub const PERCENT: char = '%';
pub const AMPERSAND: char = '&';
pub const SQ: char = '\'';
pub const LPAREN: char = '(';
pub const RPAREN: char = ')';
pub const STAR: char = '*';
pub const PLUS: char = '+';
pub const COMMA: char = ',';
pub const MINUS: char = '-';
pub const PERIOD: char = '.';
pub const SLASH: char = '/';
pub const COLON: char = ':';
pub const SEMICOLON: char = ';';
pub const LT: char = '<';
pub const EQ: char = '=';
pub const GT: char = '>';
pub const QUESTION: char = '?';
pub const AT: char = '@';

pub const LBRACKET: char = '[';
pub const BACKSLASH: char = '\\';
pub const RBRACKET: char = ']';
pub const CARET: char = '^';
pub const UNDERSCORE: char = '_';
pub const BACKTICK: char = '`';

pub const LBRACE: char = '{';
pub const BAR: char = '|';
pub const RBRACE: char = '}';
pub const TILDE: char = '~';

pub fn is_whitespace(c: char) -> bool {
    c == SPACE || c == TAB || c == LF || c == CR || c == '\u{000C}'
}

pub fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

pub fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == UNDERSCORE || c == DOLLAR
}

pub fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == UNDERSCORE || c == DOLLAR
}

pub fn is_tag_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == MINUS || c == UNDERSCORE || c == COLON || c == PERIOD
}

pub fn is_attr_name_char(c: char) -> bool {
    !is_whitespace(c) && c != EQ && c != GT && c != SLASH && c != DQ && c != SQ && c != EOF
}
