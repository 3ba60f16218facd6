//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Token sources: the Lexer trait, a replay buffer and the raw tokenizer
//
// Every preprocessing stage is a Lexer wrapping another Lexer. The raw
// Tokenizer sits at the bottom and turns the source strings of a shader
// into preprocessing tokens, including explicit newline tokens so that the
// directive parser can find the end of each directive line.
//

use nom::branch::alt;
use nom::bytes::complete::{tag, take_till, take_until, take_while, take_while1};
use nom::character::complete::{anychar, char, digit1, one_of, satisfy};
use nom::combinator::{consumed, map, map_opt, recognize, rest};
use nom::multi::many0_count;
use nom::sequence::{pair, tuple};
use nom::IResult;

use crate::state::State;
use crate::token::{Op, SourceLocation, Token, TokenKind};

/// A pull-based token source.
///
/// Implementations return an end-of-input token once exhausted and keep
/// returning it on every later call.
pub trait Lexer {
    fn next_token(&mut self, state: &mut State) -> Token;
}

impl<L: Lexer + ?Sized> Lexer for &mut L {
    fn next_token(&mut self, state: &mut State) -> Token {
        (**self).next_token(state)
    }
}

// ============================================================================
// Token List
// ============================================================================

/// Replays a fixed list of tokens.
#[derive(Debug)]
pub struct TokenList {
    tokens: std::vec::IntoIter<Token>,
    end: SourceLocation,
}

impl TokenList {
    pub fn new(tokens: Vec<Token>) -> Self {
        let end = tokens.last().map(|t| t.location).unwrap_or_default();
        Self {
            tokens: tokens.into_iter(),
            end,
        }
    }
}

impl Lexer for TokenList {
    fn next_token(&mut self, _state: &mut State) -> Token {
        self.tokens.next().unwrap_or_else(|| Token::eof(self.end))
    }
}

// ============================================================================
// Raw token recognizers
// ============================================================================

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `[_a-zA-Z][_a-zA-Z0-9]*`
fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(satisfy(is_ident_start), take_while(is_ident_char)))(input)
}

/// A preprocessing number: a digit (or `.` digit) followed by any run of
/// identifier characters, dots and exponent signs.
fn pp_number(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((digit1, recognize(pair(char('.'), digit1)))),
        many0_count(alt((
            recognize(pair(one_of("eE"), one_of("+-"))),
            recognize(satisfy(|c| is_ident_char(c) || c == '.')),
        ))),
    ))(input)
}

fn classify_number(text: &str) -> TokenKind {
    let lower = text.to_ascii_lowercase();
    if lower.starts_with("0x") {
        TokenKind::IntConstant
    } else if lower.contains(['.', 'e']) || lower.ends_with('f') {
        TokenKind::FloatConstant
    } else {
        TokenKind::IntConstant
    }
}

/// Multi-character operators, longest spelling first.
fn operator(input: &str) -> IResult<&str, &str> {
    alt((
        alt((tag("<<="), tag(">>="))),
        alt((
            tag("++"),
            tag("--"),
            tag("<<"),
            tag(">>"),
            tag("<="),
            tag(">="),
            tag("=="),
            tag("!="),
            tag("&&"),
            tag("||"),
            tag("^^"),
        )),
        alt((
            tag("*="),
            tag("/="),
            tag("%="),
            tag("+="),
            tag("-="),
            tag("&="),
            tag("^="),
            tag("|="),
        )),
    ))(input)
}

fn raw_token(input: &str) -> IResult<&str, (TokenKind, &str)> {
    alt((
        map(identifier, |s| (TokenKind::Identifier, s)),
        map(pp_number, |s| (classify_number(s), s)),
        map_opt(operator, |s| {
            Op::from_spelling(s).map(|op| (TokenKind::Op(op), s))
        }),
        map(consumed(anychar), |(s, c)| (TokenKind::Punct(c), s)),
    ))(input)
}

/// Whitespace, comments and line continuations. Yields the number of
/// newlines swallowed.
fn trivia(input: &str) -> IResult<&str, u32> {
    let count_newlines = |s: &str| s.matches('\n').count() as u32;
    alt((
        map(
            take_while1(|c: char| matches!(c, ' ' | '\t' | '\r' | '\x0b' | '\x0c')),
            |_| 0,
        ),
        map(alt((tag("\\\n"), tag("\\\r\n"))), |_| 1),
        map(recognize(pair(tag("//"), take_till(|c: char| c == '\n'))), |_| 0),
        map(
            recognize(tuple((tag("/*"), take_until("*/"), tag("*/")))),
            count_newlines,
        ),
        // unterminated block comment runs to the end of the string
        map(recognize(pair(tag("/*"), rest)), count_newlines),
    ))(input)
}

// ============================================================================
// Tokenizer
// ============================================================================

/// Raw tokenizer over the source strings of one shader.
///
/// The strings are concatenated without an implied newline between them.
/// Crossing into the next string bumps the file index and restarts the
/// line count at 1.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    sources: Vec<String>,
    index: usize,
    pos: usize,
    file: u32,
    line: u32,
    /// Line number to use after the next newline (set by `#line`)
    pending_line: Option<u32>,
    leading_space: bool,
    at_line_start: bool,
}

impl Tokenizer {
    pub fn new<S: AsRef<str>>(sources: &[S]) -> Self {
        Self {
            sources: sources.iter().map(|s| s.as_ref().to_string()).collect(),
            index: 0,
            pos: 0,
            file: 0,
            line: 1,
            pending_line: None,
            leading_space: false,
            at_line_start: true,
        }
    }

    /// Location the next token will be given
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.file, self.line)
    }

    /// Give the next source line the number `line`.
    ///
    /// Called after the newline ending a `#line` directive has been read,
    /// the new number applies at once; otherwise it applies when the
    /// current line ends.
    pub fn set_line_number(&mut self, line: u32) {
        if self.at_line_start {
            self.line = line;
        } else {
            self.pending_line = Some(line);
        }
    }

    pub fn set_file_index(&mut self, file: u32) {
        self.file = file;
    }

    fn next_source(&mut self) {
        self.index += 1;
        self.pos = 0;
        if self.index < self.sources.len() {
            self.file += 1;
            self.line = 1;
        }
    }

    /// Produce the next raw token.
    pub fn lex(&mut self) -> Token {
        loop {
            let Some(source) = self.sources.get(self.index) else {
                return Token::eof(self.location());
            };
            let input = &source[self.pos..];
            if input.is_empty() {
                self.next_source();
                continue;
            }

            if let Ok((remaining, newlines)) = trivia(input) {
                self.pos += input.len() - remaining.len();
                self.line = self.line.saturating_add(newlines);
                self.leading_space = true;
                continue;
            }

            if input.starts_with('\n') {
                self.pos += 1;
                let token = Token::newline(self.location());
                self.line = self.pending_line.take().unwrap_or(self.line.saturating_add(1));
                self.leading_space = false;
                self.at_line_start = true;
                log::trace!("lex {}: newline", token.location);
                return token;
            }

            match raw_token(input) {
                Ok((remaining, (kind, text))) => {
                    let mut token = Token::new(kind, text, self.location());
                    token.leading_space = self.leading_space;
                    token.at_line_start = self.at_line_start;
                    self.pos += input.len() - remaining.len();
                    self.leading_space = false;
                    self.at_line_start = false;
                    log::trace!("lex {}: {} {:?}", token.location, token.kind, token.text);
                    return token;
                }
                Err(_) => {
                    // anychar accepts any non-empty input
                    self.pos = source.len();
                }
            }
        }
    }
}

impl Lexer for Tokenizer {
    fn next_token(&mut self, _state: &mut State) -> Token {
        self.lex()
    }
}

/// Tokenize a single string, dropping newlines. Used for command line
/// macro values.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new(&[text]);
    let mut tokens = Vec::new();
    loop {
        let token = tokenizer.lex();
        match token.kind {
            TokenKind::Eof => break,
            TokenKind::Newline => continue,
            _ => tokens.push(token),
        }
    }
    tokens
}

// ============================================================================
// Tests
// ============================================================================
