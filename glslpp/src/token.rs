//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Preprocessing tokens and source locations
//

use std::fmt;

// ============================================================================
// Source Location
// ============================================================================

/// Source position attached to every token.
///
/// GLSL has no file names: a shader is a list of source strings, and the
/// "file" of a token is the index of the string it came from. Both parts can
/// be reset by `#line`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// Source string index (the value of `__FILE__`)
    pub file: u32,
    /// Line number (1-based, 0 means unknown)
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: u32, line: u32) -> Self {
        Self { file, line }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

// ============================================================================
// Token Kinds
// ============================================================================

/// Operators spelled with more than one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Inc,
    Dec,
    LeftShift,
    RightShift,
    Le,
    Ge,
    Eq,
    Ne,
    AndAnd,
    OrOr,
    XorXor,
    MulAssign,
    DivAssign,
    ModAssign,
    AddAssign,
    SubAssign,
    LeftAssign,
    RightAssign,
    AndAssign,
    XorAssign,
    OrAssign,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        use Op::*;
        match self {
            Inc => "++",
            Dec => "--",
            LeftShift => "<<",
            RightShift => ">>",
            Le => "<=",
            Ge => ">=",
            Eq => "==",
            Ne => "!=",
            AndAnd => "&&",
            OrOr => "||",
            XorXor => "^^",
            MulAssign => "*=",
            DivAssign => "/=",
            ModAssign => "%=",
            AddAssign => "+=",
            SubAssign => "-=",
            LeftAssign => "<<=",
            RightAssign => ">>=",
            AndAssign => "&=",
            XorAssign => "^=",
            OrAssign => "|=",
        }
    }

    /// Inverse of [`Op::as_str`].
    pub fn from_spelling(s: &str) -> Option<Op> {
        use Op::*;
        let op = match s {
            "++" => Inc,
            "--" => Dec,
            "<<" => LeftShift,
            ">>" => RightShift,
            "<=" => Le,
            ">=" => Ge,
            "==" => Eq,
            "!=" => Ne,
            "&&" => AndAnd,
            "||" => OrOr,
            "^^" => XorXor,
            "*=" => MulAssign,
            "/=" => DivAssign,
            "%=" => ModAssign,
            "+=" => AddAssign,
            "-=" => SubAssign,
            "<<=" => LeftAssign,
            ">>=" => RightAssign,
            "&=" => AndAssign,
            "^=" => XorAssign,
            "|=" => OrAssign,
            _ => return None,
        };
        Some(op)
    }
}

/// Token tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// End of input
    Eof,
    /// End of a source line
    Newline,
    Identifier,
    IntConstant,
    FloatConstant,
    /// Multi-character operator
    Op(Op),
    /// Any other single character (`#`, `(`, `+`, ...)
    Punct(char),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Eof => f.write_str("eof"),
            TokenKind::Newline => f.write_str("newline"),
            TokenKind::Identifier => f.write_str("identifier"),
            TokenKind::IntConstant => f.write_str("int"),
            TokenKind::FloatConstant => f.write_str("float"),
            TokenKind::Op(_) | TokenKind::Punct(_) => f.write_str("punct"),
        }
    }
}

// ============================================================================
// Token
// ============================================================================

/// A preprocessing token.
///
/// Equality is structural and includes the location, so tokens stored in a
/// macro replacement list are [`stripped`](Token::stripped) first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub location: SourceLocation,
    /// Token preceded by whitespace
    pub leading_space: bool,
    /// First token on its source line
    pub at_line_start: bool,
    /// Identifier painted by the recursion guard; never expanded again
    pub no_expand: bool,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            text: text.into(),
            location,
            leading_space: false,
            at_line_start: false,
            no_expand: false,
        }
    }

    pub fn eof(location: SourceLocation) -> Self {
        Self::new(TokenKind::Eof, "", location)
    }

    pub fn newline(location: SourceLocation) -> Self {
        Self::new(TokenKind::Newline, "\n", location)
    }

    pub fn int(value: i64, location: SourceLocation) -> Self {
        Self::new(TokenKind::IntConstant, value.to_string(), location)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// End of line or end of input
    pub fn is_eol(&self) -> bool {
        matches!(self.kind, TokenKind::Eof | TokenKind::Newline)
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    pub fn is_op(&self, op: Op) -> bool {
        self.kind == TokenKind::Op(op)
    }

    /// Copy of this token as stored in a replacement list.
    pub fn stripped(&self) -> Token {
        Token {
            location: SourceLocation::default(),
            at_line_start: false,
            no_expand: false,
            ..self.clone()
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Render tokens as text, separating them with one space wherever the
/// source had whitespace or a line break.
pub fn tokens_to_text(tokens: &[Token]) -> String {
    let mut result = String::new();
    for token in tokens {
        if !result.is_empty() && (token.leading_space || token.at_line_start) {
            result.push(' ');
        }
        result.push_str(&token.text);
    }
    result
}
