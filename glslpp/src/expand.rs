//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Macro expansion
//
// The expander pulls tokens from an underlying Lexer and substitutes macro
// invocations. Replacement lists are pushed as contexts and rescanned; a
// macro is disabled while one of its contexts is on the stack, which is
// what stops `#define X X` from recursing.
//

use std::rc::Rc;

use crate::diag::DiagnosticKind;
use crate::lexer::{Lexer, TokenList};
use crate::macros::{BuiltinMacro, Macro};
use crate::state::State;
use crate::token::Token;

/// Replacement tokens being rescanned
#[derive(Debug)]
struct Context {
    name: String,
    tokens: Vec<Token>,
    index: usize,
}

impl Context {
    fn is_exhausted(&self) -> bool {
        self.index >= self.tokens.len()
    }
}

pub struct MacroExpander<L> {
    source: L,
    contexts: Vec<Context>,
    /// Token read ahead while looking for `(` and handed back
    lookahead: Option<Token>,
}

impl<L: Lexer> MacroExpander<L> {
    pub fn new(source: L) -> Self {
        Self {
            source,
            contexts: Vec::new(),
            lookahead: None,
        }
    }

    pub fn get_ref(&self) -> &L {
        &self.source
    }

    fn read(&mut self, state: &mut State) -> Token {
        if let Some(token) = self.lookahead.take() {
            return token;
        }
        while self.contexts.last().is_some_and(Context::is_exhausted) {
            self.contexts.pop();
        }
        if let Some(context) = self.contexts.last_mut() {
            let token = context.tokens[context.index].clone();
            context.index += 1;
            return token;
        }
        self.source.next_token(state)
    }

    fn is_disabled(&self, name: &str) -> bool {
        self.contexts.iter().any(|c| c.name == name)
    }

    fn push_context(&mut self, mac: &Macro, tokens: Vec<Token>) {
        log::trace!(
            "rescan {} -> {:?}",
            mac.name,
            crate::token::tokens_to_text(&tokens)
        );
        self.contexts.push(Context {
            name: mac.name.clone(),
            tokens,
            index: 0,
        });
    }

    /// Compute the replacement for an invocation of `mac` named by `name`,
    /// or `None` when the identifier is to pass through unexpanded.
    fn expand_macro(&mut self, name: &Token, mac: &Macro, state: &mut State) -> Option<Vec<Token>> {
        let mut replacement = match mac.builtin {
            Some(BuiltinMacro::Line) => vec![Token::int(name.location.line.into(), name.location)],
            Some(BuiltinMacro::File) => vec![Token::int(name.location.file.into(), name.location)],
            None if mac.is_function() => {
                let next = self.read(state);
                if !next.is_punct('(') {
                    self.lookahead = Some(next);
                    return None;
                }
                let mut args = self.collect_args(name, state)?;
                if mac.params.is_empty() && matches!(&args[..], [arg] if arg.is_empty()) {
                    args.clear();
                }
                if args.len() != mac.params.len() {
                    let kind = if args.len() < mac.params.len() {
                        DiagnosticKind::MacroTooFewArgs
                    } else {
                        DiagnosticKind::MacroTooManyArgs
                    };
                    state.report(kind, name.location, &name.text);
                    return None;
                }
                let args: Vec<Vec<Token>> = args
                    .into_iter()
                    .map(|arg| expand_tokens(arg, state))
                    .collect();
                substitute(mac, &args)
            }
            None => mac.replacements.clone(),
        };

        for (i, token) in replacement.iter_mut().enumerate() {
            token.location = name.location;
            token.at_line_start = i == 0 && name.at_line_start;
            if i == 0 {
                token.leading_space = name.leading_space;
            }
        }
        log::debug!("expanded {} at {}", mac.name, name.location);
        Some(replacement)
    }

    /// Collect the comma separated arguments of an invocation, the opening
    /// parenthesis already consumed. `F()` yields one empty argument.
    fn collect_args(&mut self, name: &Token, state: &mut State) -> Option<Vec<Vec<Token>>> {
        let mut args: Vec<Vec<Token>> = vec![Vec::new()];
        let mut depth = 0usize;
        loop {
            let mut token = self.read(state);
            if token.is_eol() {
                state.report(
                    DiagnosticKind::MacroUnterminatedInvocation,
                    name.location,
                    &name.text,
                );
                self.lookahead = Some(token);
                return None;
            }
            if token.is_punct('(') {
                depth += 1;
            } else if token.is_punct(')') {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            } else if token.is_punct(',') && depth == 0 {
                args.push(Vec::new());
                continue;
            }
            if token.is_identifier() && self.is_disabled(&token.text) {
                token.no_expand = true;
            }
            if let Some(arg) = args.last_mut() {
                arg.push(token);
            }
        }
        Some(args)
    }
}

impl<L: Lexer> Lexer for MacroExpander<L> {
    fn next_token(&mut self, state: &mut State) -> Token {
        loop {
            let mut token = self.read(state);
            if !token.is_identifier() || token.no_expand || token.text == "defined" {
                return token;
            }
            let Some(mac) = state.macros.get(&token.text).map(Rc::clone) else {
                return token;
            };
            if self.is_disabled(&mac.name) {
                token.no_expand = true;
                return token;
            }
            match self.expand_macro(&token, &mac, state) {
                Some(replacement) => self.push_context(&mac, replacement),
                None => return token,
            }
        }
    }
}

/// Fully macro-expand a token list on its own, as done for each argument
/// before substitution.
pub fn expand_tokens(tokens: Vec<Token>, state: &mut State) -> Vec<Token> {
    let mut expander = MacroExpander::new(TokenList::new(tokens));
    let mut out = Vec::new();
    loop {
        let token = expander.next_token(state);
        if token.is_eof() {
            break;
        }
        out.push(token);
    }
    out
}

/// Replace each parameter of a function-like macro body by its expanded
/// argument.
fn substitute(mac: &Macro, args: &[Vec<Token>]) -> Vec<Token> {
    let mut out = Vec::new();
    for token in &mac.replacements {
        let param = if token.is_identifier() {
            mac.param_index(&token.text)
        } else {
            None
        };
        match param {
            Some(index) => {
                let start = out.len();
                out.extend(args[index].iter().cloned());
                if let Some(first) = out.get_mut(start) {
                    first.leading_space = token.leading_space;
                }
            }
            None => out.push(token.clone()),
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
