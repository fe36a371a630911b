//! # Protobuf Text Format
//!
//! Parser and printer for the human-readable protobuf text format used by
//! `tuningfork_settings.txt` and the fidelity-parameter records.
//!
//! Parsing is two-step. [`parse`] turns text into an untyped tree of
//! [`TextField`]s; typed readers ([`crate::settings`], [`crate::record`])
//! then walk the tree and convert scalars with [`TextField::as_i32`],
//! [`TextField::as_f32`] and friends, so every type error carries the
//! position of the offending field.
//!
//! Supported syntax: `name: scalar`, `name { ... }`, `name: { ... }`,
//! `name < ... >`, `name: [a, b]`, `#` comments, optional `,`/`;`
//! separators, single- or double-quoted strings with C escapes, adjacent
//! string concatenation, decimal/hex/octal integers, and floats with an
//! optional `f` suffix, `inf` and `nan`.

use std::fmt::Write as _;

use crate::descriptor::EnumSchema;
use crate::error::TextFormatError;

/// A parsed message body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextMessage {
    pub fields: Vec<TextField>,
}

/// One `name: value` entry. List syntax expands into one entry per element.
#[derive(Debug, Clone, PartialEq)]
pub struct TextField {
    pub name: String,
    pub value: TextValue,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextValue {
    Scalar(Scalar),
    Message(TextMessage),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Bare identifier: enum value name, `inf`, `nan`, `true`...
    Identifier { negative: bool, name: String },
    /// Numeric literal exactly as written, sign excluded.
    Number { negative: bool, literal: String },
    Str(String),
}

impl TextField {
    /// Error positioned at this field.
    pub fn error(&self, message: impl Into<String>) -> TextFormatError {
        TextFormatError {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn scalar(&self) -> Result<&Scalar, TextFormatError> {
        match &self.value {
            TextValue::Scalar(scalar) => Ok(scalar),
            TextValue::Message(_) => Err(self.error(format!(
                "field \"{}\" expects a scalar value, found a message",
                self.name
            ))),
        }
    }

    pub fn as_message(&self) -> Result<&TextMessage, TextFormatError> {
        match &self.value {
            TextValue::Message(message) => Ok(message),
            TextValue::Scalar(_) => Err(self.error(format!(
                "field \"{}\" expects a message value",
                self.name
            ))),
        }
    }

    pub fn as_i32(&self) -> Result<i32, TextFormatError> {
        match self.scalar()? {
            Scalar::Number { negative, literal } => {
                let value = parse_integer(literal)
                    .ok_or_else(|| self.error(format!("expected integer, found \"{literal}\"")))?;
                let signed = if *negative { -value } else { value };
                i32::try_from(signed).map_err(|_| {
                    self.error(format!("integer out of range for int32: {signed}"))
                })
            }
            other => Err(self.error(format!("expected integer, found {}", describe(other)))),
        }
    }

    pub fn as_f32(&self) -> Result<f32, TextFormatError> {
        match self.scalar()? {
            Scalar::Number { negative, literal } => {
                let value = parse_float(literal)
                    .ok_or_else(|| self.error(format!("expected float, found \"{literal}\"")))?;
                Ok(if *negative { -value } else { value })
            }
            Scalar::Identifier { negative, name } => {
                let value = match name.to_ascii_lowercase().as_str() {
                    "inf" | "infinity" => f32::INFINITY,
                    "nan" => f32::NAN,
                    _ => return Err(self.error(format!("expected float, found \"{name}\""))),
                };
                Ok(if *negative { -value } else { value })
            }
            other => Err(self.error(format!("expected float, found {}", describe(other)))),
        }
    }

    pub fn as_string(&self) -> Result<String, TextFormatError> {
        match self.scalar()? {
            Scalar::Str(s) => Ok(s.clone()),
            other => Err(self.error(format!("expected string, found {}", describe(other)))),
        }
    }

    /// Enum value by name, or by number when written as an integer.
    pub fn as_enum(&self, enum_type: &EnumSchema) -> Result<i32, TextFormatError> {
        match self.scalar()? {
            Scalar::Identifier {
                negative: false,
                name,
            } => enum_type
                .value_by_name(name)
                .map(|v| v.number)
                .ok_or_else(|| {
                    self.error(format!(
                        "enum type \"{}\" has no value named \"{name}\"",
                        enum_type.full_name
                    ))
                }),
            Scalar::Number { .. } => self.as_i32(),
            other => Err(self.error(format!(
                "expected enum value of \"{}\", found {}",
                enum_type.full_name,
                describe(other)
            ))),
        }
    }
}

fn describe(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Identifier { name, .. } => format!("identifier \"{name}\""),
        Scalar::Number { literal, .. } => format!("number \"{literal}\""),
        Scalar::Str(_) => "a string".to_string(),
    }
}

fn parse_integer(literal: &str) -> Option<i64> {
    let value = if let Some(hex) = literal
        .strip_prefix("0x")
        .or_else(|| literal.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()?
    } else if literal.len() > 1 && literal.starts_with('0') {
        u64::from_str_radix(&literal[1..], 8).ok()?
    } else {
        literal.parse::<u64>().ok()?
    };
    i64::try_from(value).ok()
}

fn parse_float(literal: &str) -> Option<f32> {
    if literal.starts_with("0x") || literal.starts_with("0X") {
        return parse_integer(literal).map(|v| v as f32);
    }
    let trimmed = literal
        .strip_suffix('f')
        .or_else(|| literal.strip_suffix('F'))
        .unwrap_or(literal);
    trimmed.parse::<f32>().ok()
}

/// Deepest message nesting accepted by [`parse`], matching `protoc`.
pub const MAX_NESTING_DEPTH: usize = 100;

/// Parse a text-format message body.
///
/// Messages nested deeper than [`MAX_NESTING_DEPTH`] are an error.
pub fn parse(input: &str) -> Result<TextMessage, TextFormatError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let message = parser.message(None)?;
    Ok(message)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(String),
    Str(String),
    Punct(char),
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
    column: usize,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> TextFormatError {
        TextFormatError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Character of a `\x` or octal escape. Strings here are UTF-8 text,
    /// so escapes above 0x7f (raw bytes) are rejected.
    fn byte_escape(&self, value: u32, line: usize, column: usize) -> Result<char, TextFormatError> {
        match char::from_u32(value) {
            Some(c) if c.is_ascii() => Ok(c),
            _ => Err(self.error(
                line,
                column,
                format!("byte escape \\x{value:02x} is not valid UTF-8 text"),
            )),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Spanned>, TextFormatError> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            let (line, column) = (self.line, self.column);
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else if c.is_ascii_alphabetic() || c == '_' {
                let mut ident = String::new();
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                tokens.push(Spanned {
                    token: Token::Ident(ident),
                    line,
                    column,
                });
            } else if c.is_ascii_digit()
                || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit()))
            {
                tokens.push(Spanned {
                    token: Token::Number(self.number()),
                    line,
                    column,
                });
            } else if c == '"' || c == '\'' {
                let s = self.string(c, line, column)?;
                tokens.push(Spanned {
                    token: Token::Str(s),
                    line,
                    column,
                });
            } else if "{}<>[]:,;-".contains(c) {
                self.bump();
                tokens.push(Spanned {
                    token: Token::Punct(c),
                    line,
                    column,
                });
            } else {
                return Err(self.error(line, column, format!("unexpected character '{c}'")));
            }
        }
        Ok(tokens)
    }

    fn number(&mut self) -> String {
        let mut literal = String::new();
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '+' || c == '-')
                && literal.ends_with(['e', 'E'])
                && !literal.starts_with("0x")
                && !literal.starts_with("0X");
            if c.is_ascii_alphanumeric() || c == '.' || exponent_sign {
                literal.push(c);
                self.bump();
            } else {
                break;
            }
        }
        literal
    }

    fn string(&mut self, quote: char, line: usize, column: usize) -> Result<String, TextFormatError> {
        self.bump();
        let mut out = String::new();
        loop {
            let c = self
                .bump()
                .ok_or_else(|| self.error(line, column, "unterminated string"))?;
            match c {
                '\n' => return Err(self.error(line, column, "string literal spans lines")),
                c if c == quote => return Ok(out),
                '\\' => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| self.error(line, column, "unterminated string"))?;
                    match escaped {
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        'a' => out.push('\u{07}'),
                        'b' => out.push('\u{08}'),
                        'f' => out.push('\u{0c}'),
                        'v' => out.push('\u{0b}'),
                        '\\' | '\'' | '"' | '?' => out.push(escaped),
                        'x' => {
                            let mut value = 0u32;
                            let mut digits = 0;
                            while digits < 2 {
                                match self.peek().and_then(|c| c.to_digit(16)) {
                                    Some(d) => {
                                        value = value * 16 + d;
                                        digits += 1;
                                        self.bump();
                                    }
                                    None => break,
                                }
                            }
                            if digits == 0 {
                                return Err(self.error(line, column, "invalid \\x escape"));
                            }
                            out.push(self.byte_escape(value, line, column)?);
                        }
                        '0'..='7' => {
                            let mut value = escaped.to_digit(8).unwrap_or(0);
                            let mut digits = 1;
                            while digits < 3 {
                                match self.peek().and_then(|c| c.to_digit(8)) {
                                    Some(d) => {
                                        value = value * 8 + d;
                                        digits += 1;
                                        self.bump();
                                    }
                                    None => break,
                                }
                            }
                            out.push(self.byte_escape(value, line, column)?);
                        }
                        other => {
                            return Err(self.error(
                                line,
                                column,
                                format!("invalid escape sequence \\{other}"),
                            ))
                        }
                    }
                }
                c => out.push(c),
            }
        }
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn at_punct(&self, c: char) -> bool {
        matches!(self.peek(), Some(Spanned { token: Token::Punct(p), .. }) if *p == c)
    }

    fn error_here(&self, message: impl Into<String>) -> TextFormatError {
        let (line, column) = match self.peek().or_else(|| self.tokens.last()) {
            Some(s) => (s.line, s.column),
            None => (1, 1),
        };
        TextFormatError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Parse fields until `close` (or end of input when `close` is `None`).
    fn message(&mut self, close: Option<char>) -> Result<TextMessage, TextFormatError> {
        let mut message = TextMessage::default();
        loop {
            match (self.peek(), close) {
                (None, None) => return Ok(message),
                (None, Some(c)) => return Err(self.error_here(format!("expected '{c}'"))),
                (Some(Spanned { token: Token::Punct(p), .. }), Some(c)) if *p == c => {
                    self.next();
                    return Ok(message);
                }
                _ => self.field(&mut message.fields)?,
            }
        }
    }

    fn field(&mut self, out: &mut Vec<TextField>) -> Result<(), TextFormatError> {
        let (name, line, column) = match self.next() {
            Some(Spanned {
                token: Token::Ident(name),
                line,
                column,
            }) => (name, line, column),
            Some(Spanned {
                token: Token::Punct('['),
                ..
            }) => return Err(self.error_here("extension fields are not supported")),
            Some(other) => {
                return Err(TextFormatError {
                    line: other.line,
                    column: other.column,
                    message: format!("expected field name, found {:?}", other.token),
                })
            }
            None => return Err(self.error_here("expected field name")),
        };

        let has_colon = self.at_punct(':');
        if has_colon {
            self.next();
        }

        if self.at_punct('[') {
            if !has_colon {
                return Err(self.error_here(format!("expected ':' after \"{name}\"")));
            }
            self.next();
            if self.at_punct(']') {
                self.next();
            } else {
                loop {
                    let value = self.value(true)?;
                    out.push(TextField {
                        name: name.clone(),
                        value,
                        line,
                        column,
                    });
                    match self.next() {
                        Some(Spanned {
                            token: Token::Punct(','),
                            ..
                        }) => continue,
                        Some(Spanned {
                            token: Token::Punct(']'),
                            ..
                        }) => break,
                        _ => return Err(self.error_here("expected ',' or ']' in list")),
                    }
                }
            }
        } else {
            let value = self.value(has_colon)?;
            out.push(TextField {
                name,
                value,
                line,
                column,
            });
        }

        if self.at_punct(',') || self.at_punct(';') {
            self.next();
        }
        Ok(())
    }

    fn value(&mut self, scalar_allowed: bool) -> Result<TextValue, TextFormatError> {
        let close = if self.at_punct('{') {
            Some('}')
        } else if self.at_punct('<') {
            Some('>')
        } else {
            None
        };
        if let Some(close) = close {
            if self.depth >= MAX_NESTING_DEPTH {
                return Err(self.error_here(format!(
                    "message nesting exceeds the limit of {MAX_NESTING_DEPTH}"
                )));
            }
            self.next();
            self.depth += 1;
            let message = self.message(Some(close));
            self.depth -= 1;
            return Ok(TextValue::Message(message?));
        }
        if !scalar_allowed {
            return Err(self.error_here("expected ':' or message value"));
        }
        self.scalar().map(TextValue::Scalar)
    }

    fn scalar(&mut self) -> Result<Scalar, TextFormatError> {
        let negative = self.at_punct('-');
        if negative {
            self.next();
        }
        match self.next() {
            Some(Spanned {
                token: Token::Number(literal),
                ..
            }) => Ok(Scalar::Number { negative, literal }),
            Some(Spanned {
                token: Token::Ident(name),
                ..
            }) => Ok(Scalar::Identifier { negative, name }),
            Some(Spanned {
                token: Token::Str(first),
                ..
            }) if !negative => {
                let mut s = first;
                while let Some(Spanned {
                    token: Token::Str(next),
                    ..
                }) = self.peek()
                {
                    s.push_str(next);
                    self.pos += 1;
                }
                Ok(Scalar::Str(s))
            }
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error_here("expected a value"))
            }
        }
    }
}

/// Incremental text-format printer with two-space indentation.
#[derive(Debug, Default)]
pub struct TextWriter {
    out: String,
    indent: usize,
}

impl TextWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn pad(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    /// Write `name: value` using the value's `Display`.
    pub fn scalar(&mut self, name: &str, value: impl std::fmt::Display) {
        self.pad();
        let _ = writeln!(self.out, "{name}: {value}");
    }

    pub fn string(&mut self, name: &str, value: &str) {
        self.pad();
        let _ = writeln!(self.out, "{name}: \"{}\"", escape_string(value));
    }

    pub fn begin(&mut self, name: &str) {
        self.pad();
        let _ = writeln!(self.out, "{name} {{");
        self.indent += 1;
    }

    pub fn end(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.pad();
        self.out.push_str("}\n");
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Escape a string for a double-quoted text-format literal.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
