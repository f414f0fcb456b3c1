// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Line tokenizer for assembly source.
//!
//! Lexical rules are tried in a fixed order at each scan position and the
//! first rule that matches wins; there is no longest-match resolution. All
//! token text is normalized to upper case. Each line is tokenized fresh and
//! the sequence always ends with [`TokenKind::Eol`].

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Name,
    Number,
    Comma,
    Plus,
    Minus,
    Hash,
    Comment,
    Whitespace,
    Other,
    Eol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Zero-based column of the token's first character, used verbatim for
    /// the diagnostic caret.
    pub pos: usize,
    /// Decoded integer for [`TokenKind::Number`]; zero for everything else.
    pub value: i64,
}

impl Token {
    fn new(kind: TokenKind, text: String, pos: usize, value: i64) -> Self {
        Self {
            kind,
            text,
            pos,
            value,
        }
    }

    fn eol() -> Self {
        Self::new(TokenKind::Eol, String::new(), 0, 0)
    }
}

pub struct Tokenizer<'a> {
    input: &'a [u8],
    cursor: usize,
}

impl<'a> Tokenizer<'a> {
    #[must_use]
    pub fn new(line: &'a str) -> Self {
        Self {
            input: line.as_bytes(),
            cursor: 0,
        }
    }

    /// Returns the next token. The tokenizer is fused: once the end of the
    /// line is reached every further call yields the end-of-line token.
    pub fn next_token(&mut self) -> Token {
        if self.cursor >= self.input.len() {
            return Token::eol();
        }
        let start = self.cursor;
        let c = self.input[start];

        if c.is_ascii_alphabetic() {
            return self.scan_name(start);
        }
        if let Some(token) = self.scan_hex(start) {
            return token;
        }
        if let Some(token) = self.scan_decimal(start) {
            return token;
        }
        match c {
            b',' => return self.single(TokenKind::Comma, start),
            b'+' => return self.single(TokenKind::Plus, start),
            b'-' => return self.single(TokenKind::Minus, start),
            b'#' => return self.single(TokenKind::Hash, start),
            _ => {}
        }
        if let Some(token) = self.scan_comment(start) {
            return token;
        }
        if is_space(c) {
            let mut end = start;
            while end < self.input.len() && is_space(self.input[end]) {
                end += 1;
            }
            self.cursor = end;
            return Token::new(TokenKind::Whitespace, self.text(start, end), start, 0);
        }
        self.single(TokenKind::Other, start)
    }

    // A letter followed by any run of word characters; mnemonics, labels and
    // register names all share this rule.
    fn scan_name(&mut self, start: usize) -> Token {
        let mut end = start + 1;
        while end < self.input.len() && is_word(self.input[end]) {
            end += 1;
        }
        self.cursor = end;
        Token::new(TokenKind::Name, self.text(start, end), start, 0)
    }

    // One or more hex digits immediately followed by an H suffix. A literal
    // starting with A-F never gets here; the name rule claims it first.
    fn scan_hex(&mut self, start: usize) -> Option<Token> {
        let mut end = start;
        while end < self.input.len() && self.input[end].is_ascii_hexdigit() {
            end += 1;
        }
        if end == start || !matches!(self.input.get(end), Some(b'H') | Some(b'h')) {
            return None;
        }
        let digits = self.text(start, end);
        let value = i64::from_str_radix(&digits, 16).unwrap_or(i64::MAX);
        self.cursor = end + 1;
        Some(Token::new(
            TokenKind::Number,
            self.text(start, end + 1),
            start,
            value,
        ))
    }

    // Optional sign, then one or more decimal digits.
    fn scan_decimal(&mut self, start: usize) -> Option<Token> {
        let mut end = start;
        if matches!(self.input[end], b'+' | b'-') {
            end += 1;
        }
        let digits_start = end;
        while end < self.input.len() && self.input[end].is_ascii_digit() {
            end += 1;
        }
        if end == digits_start {
            return None;
        }
        let text = self.text(start, end);
        let value = text.parse::<i64>().unwrap_or(i64::MAX);
        self.cursor = end;
        Some(Token::new(TokenKind::Number, text, start, value))
    }

    // Optional whitespace followed by ';'. The marker is a token of its own;
    // it does not stop the scan, the statement grammar does.
    fn scan_comment(&mut self, start: usize) -> Option<Token> {
        let mut end = start;
        while end < self.input.len() && is_space(self.input[end]) {
            end += 1;
        }
        if self.input.get(end) != Some(&b';') {
            return None;
        }
        self.cursor = end + 1;
        Some(Token::new(
            TokenKind::Comment,
            self.text(start, end + 1),
            start,
            0,
        ))
    }

    fn single(&mut self, kind: TokenKind, start: usize) -> Token {
        self.cursor = start + 1;
        Token::new(kind, self.text(start, start + 1), start, 0)
    }

    fn text(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.input[start..end]).to_ascii_uppercase()
    }
}

fn is_space(c: u8) -> bool {
    c.is_ascii_whitespace()
}

fn is_word(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}
