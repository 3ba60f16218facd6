//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Integer constant expressions for #if / #elif
//
// Operates on a fully macro-expanded line. Arithmetic is 32-bit signed
// with wrapping, as GLSL ES specifies for the preprocessor.
//

use crate::diag::{DiagnosticKind, Diagnostics};
use crate::token::{Op, SourceLocation, Token, TokenKind};

/// Deepest nesting of parentheses, unary operators and `?:` accepted
const MAX_NESTING: usize = 256;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("invalid expression")]
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LogAnd,
    LogOr,
}

impl BinOp {
    /// Operator and binding power of a token, higher binds tighter
    fn from_token(token: &Token) -> Option<(BinOp, u8)> {
        let op = match token.kind {
            TokenKind::Punct('*') => (BinOp::Mul, 10),
            TokenKind::Punct('/') => (BinOp::Div, 10),
            TokenKind::Punct('%') => (BinOp::Rem, 10),
            TokenKind::Punct('+') => (BinOp::Add, 9),
            TokenKind::Punct('-') => (BinOp::Sub, 9),
            TokenKind::Op(Op::LeftShift) => (BinOp::Shl, 8),
            TokenKind::Op(Op::RightShift) => (BinOp::Shr, 8),
            TokenKind::Punct('<') => (BinOp::Lt, 7),
            TokenKind::Punct('>') => (BinOp::Gt, 7),
            TokenKind::Op(Op::Le) => (BinOp::Le, 7),
            TokenKind::Op(Op::Ge) => (BinOp::Ge, 7),
            TokenKind::Op(Op::Eq) => (BinOp::Eq, 6),
            TokenKind::Op(Op::Ne) => (BinOp::Ne, 6),
            TokenKind::Punct('&') => (BinOp::BitAnd, 5),
            TokenKind::Punct('^') => (BinOp::BitXor, 4),
            TokenKind::Punct('|') => (BinOp::BitOr, 3),
            TokenKind::Op(Op::AndAnd) => (BinOp::LogAnd, 2),
            TokenKind::Op(Op::OrOr) => (BinOp::LogOr, 1),
            _ => return None,
        };
        Some(op)
    }
}

/// Evaluate the tokens of an `#if` / `#elif` line.
///
/// `end` is the location reported when the expression ends early.
/// Division by zero is reported once per occurrence; the operation yields 0
/// and parsing continues, but the evaluation as a whole fails.
pub fn evaluate(
    tokens: &[Token],
    end: SourceLocation,
    diagnostics: &mut Diagnostics,
) -> Result<i32, EvalError> {
    let mut parser = ExpressionParser {
        tokens,
        pos: 0,
        end,
        live: true,
        depth: 0,
        error: None,
        diagnostics,
    };
    let value = parser.parse_conditional()?;
    if let Some(token) = parser.current() {
        let token = token.clone();
        return Err(parser.invalid(Some(&token)));
    }
    match parser.error {
        Some(err) => Err(err),
        None => Ok(value),
    }
}

struct ExpressionParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    end: SourceLocation,
    /// Cleared inside the unevaluated side of `&&`, `||` and `?:`
    live: bool,
    depth: usize,
    error: Option<EvalError>,
    diagnostics: &'a mut Diagnostics,
}

impl ExpressionParser<'_> {
    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn is_punct(&self, c: char) -> bool {
        self.current().is_some_and(|t| t.is_punct(c))
    }

    fn invalid(&mut self, token: Option<&Token>) -> EvalError {
        let (location, text) = match token {
            Some(token) => (token.location, token.text.as_str()),
            None => (self.end, ""),
        };
        self.diagnostics
            .report(DiagnosticKind::InvalidExpression, location, text);
        EvalError::Invalid
    }

    fn invalid_here(&mut self) -> EvalError {
        let token = self.current().cloned();
        self.invalid(token.as_ref())
    }

    /// Run a nested parse, failing once the expression nests too deeply.
    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<i32, EvalError>,
    ) -> Result<i32, EvalError> {
        if self.depth >= MAX_NESTING {
            return Err(self.invalid_here());
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// `cond ? a : b`, right associative
    fn parse_conditional(&mut self) -> Result<i32, EvalError> {
        let cond = self.parse_binary(1)?;
        if !self.is_punct('?') {
            return Ok(cond);
        }
        self.advance();

        let live = self.live;
        self.live = live && cond != 0;
        let then_value = self.nested(Self::parse_conditional)?;
        if !self.is_punct(':') {
            return Err(self.invalid_here());
        }
        self.advance();
        self.live = live && cond == 0;
        let else_value = self.nested(Self::parse_conditional)?;
        self.live = live;

        Ok(if cond != 0 { then_value } else { else_value })
    }

    /// Precedence climbing over the binary operators
    fn parse_binary(&mut self, min_power: u8) -> Result<i32, EvalError> {
        let mut lhs = self.parse_unary()?;
        while let Some(token) = self.current() {
            let Some((op, power)) = BinOp::from_token(token) else {
                break;
            };
            if power < min_power {
                break;
            }
            let op_token = token.clone();
            self.advance();

            let live = self.live;
            match op {
                BinOp::LogAnd => self.live = live && lhs != 0,
                BinOp::LogOr => self.live = live && lhs == 0,
                _ => {}
            }
            let rhs = self.parse_binary(power + 1)?;
            self.live = live;

            lhs = self.apply(op, lhs, rhs, &op_token);
        }
        Ok(lhs)
    }

    fn apply(&mut self, op: BinOp, lhs: i32, rhs: i32, token: &Token) -> i32 {
        match op {
            BinOp::Mul => lhs.wrapping_mul(rhs),
            BinOp::Div | BinOp::Rem if rhs == 0 => {
                if self.live {
                    self.diagnostics.report(
                        DiagnosticKind::DivisionByZero,
                        token.location,
                        &token.text,
                    );
                    self.error = Some(EvalError::DivisionByZero);
                }
                0
            }
            BinOp::Div => lhs.wrapping_div(rhs),
            BinOp::Rem => lhs.wrapping_rem(rhs),
            BinOp::Add => lhs.wrapping_add(rhs),
            BinOp::Sub => lhs.wrapping_sub(rhs),
            BinOp::Shl => lhs.wrapping_shl(rhs as u32),
            BinOp::Shr => lhs.wrapping_shr(rhs as u32),
            BinOp::Lt => (lhs < rhs) as i32,
            BinOp::Gt => (lhs > rhs) as i32,
            BinOp::Le => (lhs <= rhs) as i32,
            BinOp::Ge => (lhs >= rhs) as i32,
            BinOp::Eq => (lhs == rhs) as i32,
            BinOp::Ne => (lhs != rhs) as i32,
            BinOp::BitAnd => lhs & rhs,
            BinOp::BitXor => lhs ^ rhs,
            BinOp::BitOr => lhs | rhs,
            BinOp::LogAnd => (lhs != 0 && rhs != 0) as i32,
            BinOp::LogOr => (lhs != 0 || rhs != 0) as i32,
        }
    }

    fn parse_unary(&mut self) -> Result<i32, EvalError> {
        let Some(token) = self.current().cloned() else {
            return Err(self.invalid(None));
        };
        match token.kind {
            TokenKind::Punct('+') => {
                self.advance();
                self.nested(Self::parse_unary)
            }
            TokenKind::Punct('-') => {
                self.advance();
                Ok(self.nested(Self::parse_unary)?.wrapping_neg())
            }
            TokenKind::Punct('~') => {
                self.advance();
                Ok(!self.nested(Self::parse_unary)?)
            }
            TokenKind::Punct('!') => {
                self.advance();
                Ok((self.nested(Self::parse_unary)? == 0) as i32)
            }
            TokenKind::Punct('(') => {
                self.advance();
                let value = self.nested(Self::parse_conditional)?;
                if !self.is_punct(')') {
                    return Err(self.invalid_here());
                }
                self.advance();
                Ok(value)
            }
            TokenKind::IntConstant => match parse_integer(&token.text) {
                Some(value) => {
                    self.advance();
                    Ok(value)
                }
                None => Err(self.invalid(Some(&token))),
            },
            _ => Err(self.invalid(Some(&token))),
        }
    }
}

/// Decimal, octal (leading `0`) or hexadecimal (`0x`) literal with an
/// optional `u` suffix. Values above `u32::MAX` are rejected; the rest wrap
/// into `i32`.
pub fn parse_integer(text: &str) -> Option<i32> {
    let digits = text.strip_suffix(['u', 'U']).unwrap_or(text);
    let (radix, body) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let value = u64::from_str_radix(body, radix).ok()?;
    let value = u32::try_from(value).ok()?;
    Some(value as i32)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn eval(text: &str) -> (Result<i32, EvalError>, Vec<DiagnosticKind>) {
        let mut diagnostics = Diagnostics::new();
        let result = evaluate(&tokenize(text), SourceLocation::new(0, 1), &mut diagnostics);
        (result, diagnostics.kinds())
    }

    fn value(text: &str) -> i32 {
        let (result, kinds) = eval(text);
        assert!(kinds.is_empty(), "unexpected diagnostics for {text}: {kinds:?}");
        result.unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(value("1 + 2 * 3"), 7);
        assert_eq!(value("(1 + 2) * 3"), 9);
        assert_eq!(value("1 + 1 == 2"), 1);
        assert_eq!(value("1 << 2 + 1"), 8);
        assert_eq!(value("6 & 3 | 8 ^ 1"), 11);
        assert_eq!(value("10 - 4 - 3"), 3);
        assert_eq!(value("1 < 2 == 2 > 1"), 1);
    }

    #[test]
    fn test_unary() {
        assert_eq!(value("-5 + +2"), -3);
        assert_eq!(value("~0"), -1);
        assert_eq!(value("!0 + !7"), 1);
        assert_eq!(value("- -1"), 1);
    }

    #[test]
    fn test_logical_and_conditional() {
        assert_eq!(value("1 && 2"), 1);
        assert_eq!(value("0 || 0"), 0);
        assert_eq!(value("1 ? 2 : 3"), 2);
        assert_eq!(value("0 ? 2 : 0 ? 3 : 4"), 4);
    }

    #[test]
    fn test_short_circuit_skips_division() {
        assert_eq!(value("0 && 1 / 0"), 0);
        assert_eq!(value("1 || 1 % 0"), 1);
        assert_eq!(value("1 ? 5 : 1 / 0"), 5);
    }

    #[test]
    fn test_division_by_zero() {
        let (result, kinds) = eval("1 / 0 + 2");
        assert_eq!(result, Err(EvalError::DivisionByZero));
        assert_eq!(kinds, vec![DiagnosticKind::DivisionByZero]);

        let (_, kinds) = eval("1 % 0 + 4 / 0");
        assert_eq!(
            kinds,
            vec![DiagnosticKind::DivisionByZero, DiagnosticKind::DivisionByZero]
        );
    }

    #[test]
    fn test_wrapping() {
        assert_eq!(value("2147483647 + 1"), i32::MIN);
        assert_eq!(value("0xFFFFFFFF"), -1);
        assert_eq!(value("-2147483648 / -1"), i32::MIN);
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse_integer("010"), Some(8));
        assert_eq!(parse_integer("0x1F"), Some(31));
        assert_eq!(parse_integer("7u"), Some(7));
        assert_eq!(parse_integer("0"), Some(0));
        assert_eq!(parse_integer("4294967296"), None);
        assert_eq!(parse_integer("09"), None);
        assert_eq!(parse_integer("0x"), None);
    }

    #[test]
    fn test_invalid() {
        for text in ["", "1 +", "(1", "1 2", "FOO", "1.0", "1 ? 2", "4294967296"] {
            let (result, kinds) = eval(text);
            assert_eq!(result, Err(EvalError::Invalid), "{text}");
            assert_eq!(kinds, vec![DiagnosticKind::InvalidExpression], "{text}");
        }
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(value(&nested(100)), 1);
        assert_eq!(value(&("- ".repeat(100) + "1")), 1);

        for text in [nested(50_000), "- ".repeat(50_000) + "1", "1 ? ".repeat(50_000) + "1"] {
            let (result, kinds) = eval(&text);
            assert_eq!(result, Err(EvalError::Invalid));
            assert_eq!(kinds, vec![DiagnosticKind::InvalidExpression]);
        }
    }
}
