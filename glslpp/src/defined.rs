//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// The `defined` operator of #if / #elif lines
//

use crate::diag::DiagnosticKind;
use crate::lexer::Lexer;
use crate::state::State;
use crate::token::Token;

/// Replaces `defined NAME` and `defined ( NAME )` with the integer `1` or
/// `0`. Sits below the macro expander so `NAME` is never expanded.
pub struct DefinedFilter<L> {
    inner: L,
    pending: Option<Token>,
}

impl<L: Lexer> DefinedFilter<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            pending: None,
        }
    }

    fn read(&mut self, state: &mut State) -> Token {
        match self.pending.take() {
            Some(token) => token,
            None => self.inner.next_token(state),
        }
    }

    /// Report a malformed use. The end of the line is handed back so the
    /// directive still terminates.
    fn malformed(&mut self, state: &mut State, token: Token) {
        state.report(DiagnosticKind::InvalidExpression, token.location, &token.text);
        if token.is_eol() {
            self.pending = Some(token);
        }
    }
}

impl<L: Lexer> Lexer for DefinedFilter<L> {
    fn next_token(&mut self, state: &mut State) -> Token {
        let token = self.read(state);
        if !token.is_identifier() || token.text != "defined" {
            return token;
        }

        let mut result = Token::int(0, token.location);
        result.leading_space = token.leading_space;

        let mut name = self.read(state);
        let paren = name.is_punct('(');
        if paren {
            name = self.read(state);
        }
        if !name.is_identifier() {
            self.malformed(state, name);
            return result;
        }
        if paren {
            let close = self.read(state);
            if !close.is_punct(')') {
                self.malformed(state, close);
                return result;
            }
        }

        let defined = state.macros.is_defined(&name.text);
        log::trace!("defined({}) = {}", name.text, defined);
        if defined {
            result.text = "1".to_string();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Tokenizer;
    use crate::macros::{Macro, MacroTable};

    fn filter(text: &str) -> (Vec<String>, State) {
        let mut macros = MacroTable::new();
        macros.define(Macro::object("FOO", Vec::new())).unwrap();
        let mut state = State::new(macros);
        let mut filter = DefinedFilter::new(Tokenizer::new(&[text]));
        let mut out = Vec::new();
        loop {
            let token = filter.next_token(&mut state);
            if token.is_eof() {
                break;
            }
            out.push(token.text);
        }
        (out, state)
    }

    #[test]
    fn test_defined_forms() {
        let (out, state) = filter("defined FOO defined(FOO) defined ( BAR )");
        assert_eq!(out, vec!["1", "1", "0"]);
        assert!(state.diagnostics.is_empty());
    }

    #[test]
    fn test_other_tokens_pass() {
        let (out, _) = filter("FOO + 1");
        assert_eq!(out, vec!["FOO", "+", "1"]);
    }

    #[test]
    fn test_missing_name() {
        let (out, state) = filter("defined\nx");
        assert_eq!(out, vec!["0", "\n", "x"]);
        assert_eq!(state.diagnostics.kinds(), vec![DiagnosticKind::InvalidExpression]);
    }

    #[test]
    fn test_missing_close_paren() {
        let (out, state) = filter("defined(FOO 2");
        assert_eq!(out, vec!["0"]);
        assert_eq!(state.diagnostics.kinds(), vec![DiagnosticKind::InvalidExpression]);
    }
}
