//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Directive processing
//
// The DirectiveParser sits directly on the tokenizer. Lines starting with
// `#` are consumed and interpreted here; everything else is forwarded
// unless it lies in a region suppressed by a conditional. Newlines never
// leave this stage.
//

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::defined::DefinedFilter;
use crate::diag::DiagnosticKind;
use crate::expand::MacroExpander;
use crate::expr::{self, parse_integer};
use crate::lexer::{Lexer, Tokenizer};
use crate::macros::Macro;
use crate::state::{DirectiveRecord, ExtensionBehavior, State};
use crate::token::{tokens_to_text, SourceLocation, Token, TokenKind};

// ============================================================================
// Directive names
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Define,
    Undef,
    If,
    Ifdef,
    Ifndef,
    Else,
    Elif,
    Endif,
    Error,
    Pragma,
    Extension,
    Version,
    Line,
}

static DIRECTIVES: Lazy<HashMap<&'static str, DirectiveKind>> = Lazy::new(|| {
    HashMap::from([
        ("define", DirectiveKind::Define),
        ("undef", DirectiveKind::Undef),
        ("if", DirectiveKind::If),
        ("ifdef", DirectiveKind::Ifdef),
        ("ifndef", DirectiveKind::Ifndef),
        ("else", DirectiveKind::Else),
        ("elif", DirectiveKind::Elif),
        ("endif", DirectiveKind::Endif),
        ("error", DirectiveKind::Error),
        ("pragma", DirectiveKind::Pragma),
        ("extension", DirectiveKind::Extension),
        ("version", DirectiveKind::Version),
        ("line", DirectiveKind::Line),
    ])
});

impl DirectiveKind {
    pub fn lookup(name: &str) -> Option<DirectiveKind> {
        DIRECTIVES.get(name).copied()
    }

    /// Directives still recognized inside a suppressed region
    pub fn is_conditional(self) -> bool {
        matches!(
            self,
            DirectiveKind::If
                | DirectiveKind::Ifdef
                | DirectiveKind::Ifndef
                | DirectiveKind::Else
                | DirectiveKind::Elif
                | DirectiveKind::Endif
        )
    }
}

// ============================================================================
// Conditional stack
// ============================================================================

/// One level of `#if` nesting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalFrame {
    /// Tokens in the current branch are forwarded
    pub active: bool,
    /// A branch of this chain already fired (or none may fire)
    pub taken: bool,
    pub seen_else: bool,
    /// Opened inside a suppressed region; nothing in the chain can fire
    pub suppressed_parent: bool,
    /// Location of the opening directive
    pub location: SourceLocation,
}

/// Ok: the handler finished and returns the token following it, which must
/// end the line. Err: the handler reported a problem; drain from the token.
type Parsed = Result<Token, Token>;

// ============================================================================
// Directive Parser
// ============================================================================

pub struct DirectiveParser {
    tokenizer: Tokenizer,
    conditionals: Vec<ConditionalFrame>,
    /// Any token or directive seen so far (for #version)
    seen_token: bool,
    finished: bool,
}

impl DirectiveParser {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            conditionals: Vec::new(),
            seen_token: false,
            finished: false,
        }
    }

    /// Currently open conditionals, outermost first
    pub fn conditionals(&self) -> &[ConditionalFrame] {
        &self.conditionals
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    fn lex(&mut self) -> Token {
        self.tokenizer.lex()
    }

    fn skipping(&self) -> bool {
        self.conditionals.last().is_some_and(|f| !f.active)
    }

    fn unexpected(&self, state: &mut State, token: Token) -> Token {
        let text = if token.is_eol() { "" } else { token.text.as_str() };
        state.report(DiagnosticKind::UnexpectedTokenInDirective, token.location, text);
        token
    }

    /// Drop the rest of a malformed directive line, returning the token
    /// that ends it.
    fn drain(&mut self, mut token: Token) -> Token {
        while !token.is_eol() {
            token = self.lex();
        }
        token
    }

    /// Silently drop the rest of a line, returning the token that ends it.
    fn skip_line(&mut self) -> Token {
        loop {
            let token = self.lex();
            if token.is_eol() {
                return token;
            }
        }
    }

    /// Unexpanded tokens up to the end of the line
    fn raw_line(&mut self) -> (Vec<Token>, Token) {
        let mut tokens = Vec::new();
        loop {
            let token = self.lex();
            if token.is_eol() {
                return (tokens, token);
            }
            tokens.push(token);
        }
    }

    /// Macro-expanded tokens up to the end of the line, with `defined`
    /// resolved first.
    fn expanded_line(&mut self, state: &mut State) -> (Vec<Token>, Token) {
        let mut expander = MacroExpander::new(DefinedFilter::new(&mut self.tokenizer));
        let mut tokens = Vec::new();
        loop {
            let token = expander.next_token(state);
            if token.is_eol() {
                return (tokens, token);
            }
            tokens.push(token);
        }
    }

    fn evaluate_line(&mut self, hash: &Token, state: &mut State) -> (bool, Token) {
        let (tokens, eol) = self.expanded_line(state);
        let result = expr::evaluate(&tokens, hash.location, &mut state.diagnostics);
        log::debug!(
            "{}: #if {} -> {:?}",
            hash.location,
            tokens_to_text(&tokens),
            result
        );
        (matches!(result, Ok(value) if value != 0), eol)
    }

    fn push_conditional(&mut self, active: bool, location: SourceLocation) {
        self.conditionals.push(ConditionalFrame {
            active,
            taken: active,
            seen_else: false,
            suppressed_parent: false,
            location,
        });
    }

    fn push_suppressed(&mut self, location: SourceLocation) {
        self.conditionals.push(ConditionalFrame {
            active: false,
            taken: true,
            seen_else: false,
            suppressed_parent: true,
            location,
        });
    }

    /// End of input: report conditionals left open.
    fn finish(&mut self, state: &mut State) {
        if self.finished {
            return;
        }
        self.finished = true;
        for frame in self.conditionals.drain(..) {
            state.report(DiagnosticKind::ConditionalUnterminated, frame.location, "");
        }
    }

    /// Parse one directive line. A line ended by end of input rather than
    /// a newline is reported.
    fn parse_directive(&mut self, hash: &Token, state: &mut State) {
        let end = self.directive_line(hash, state);
        if end.is_eof() {
            state.report(DiagnosticKind::EofInDirective, end.location, "");
        }
    }

    fn directive_line(&mut self, hash: &Token, state: &mut State) -> Token {
        let name = self.lex();
        if name.is_eol() {
            // null directive
            return name;
        }

        let kind = if name.is_identifier() {
            DirectiveKind::lookup(&name.text)
        } else {
            None
        };

        if self.skipping() && !kind.is_some_and(DirectiveKind::is_conditional) {
            return self.skip_line();
        }

        let result = match kind {
            None => Err(self.unexpected(state, name)),
            Some(kind) => {
                log::debug!("{}: #{}", hash.location, name.text);
                match kind {
                    DirectiveKind::Define => self.parse_define(state),
                    DirectiveKind::Undef => self.parse_undef(state),
                    DirectiveKind::If => self.parse_if(hash, state),
                    DirectiveKind::Ifdef => self.parse_ifdef(hash, state, true),
                    DirectiveKind::Ifndef => self.parse_ifdef(hash, state, false),
                    DirectiveKind::Else => self.parse_else(hash, state),
                    DirectiveKind::Elif => self.parse_elif(hash, state),
                    DirectiveKind::Endif => self.parse_endif(hash, state),
                    DirectiveKind::Error => self.parse_error(hash, state),
                    DirectiveKind::Pragma => self.parse_pragma(state),
                    DirectiveKind::Extension => self.parse_extension(state),
                    DirectiveKind::Version => self.parse_version(hash, state),
                    DirectiveKind::Line => self.parse_line(state),
                }
            }
        };
        self.seen_token = true;

        match result {
            Ok(token) if token.is_eol() => token,
            Ok(token) => {
                let token = self.unexpected(state, token);
                self.drain(token)
            }
            Err(token) => self.drain(token),
        }
    }

    fn parse_define(&mut self, state: &mut State) -> Parsed {
        let name = self.lex();
        if !name.is_identifier() {
            return Err(self.unexpected(state, name));
        }

        let mut token = self.lex();
        let mut params: Vec<String> = Vec::new();
        let function = token.is_punct('(') && !token.leading_space;
        if function {
            token = self.lex();
            if token.is_identifier() {
                loop {
                    if params.contains(&token.text) {
                        state.report(
                            DiagnosticKind::MacroDuplicateParameterNames,
                            token.location,
                            &token.text,
                        );
                        return Err(token);
                    }
                    params.push(token.text.clone());
                    token = self.lex();
                    if !token.is_punct(',') {
                        break;
                    }
                    token = self.lex();
                    if !token.is_identifier() {
                        return Err(self.unexpected(state, token));
                    }
                }
            }
            if !token.is_punct(')') {
                return Err(self.unexpected(state, token));
            }
            token = self.lex();
        }

        let mut replacements = Vec::new();
        while !token.is_eol() {
            replacements.push(token.stripped());
            token = self.lex();
        }

        let mac = if function {
            Macro::function(&name.text, params, replacements)
        } else {
            Macro::object(&name.text, replacements)
        };
        if let Err(err) = state.macros.define(mac) {
            state.report(err.diagnostic_kind(), name.location, err.name());
        }
        Ok(token)
    }

    fn parse_undef(&mut self, state: &mut State) -> Parsed {
        let name = self.lex();
        if !name.is_identifier() {
            return Err(self.unexpected(state, name));
        }
        match state.macros.undefine(&name.text) {
            Ok(Some(_)) => log::debug!("undefined macro {}", name.text),
            Ok(None) => {}
            Err(err) => state.report(err.diagnostic_kind(), name.location, err.name()),
        }
        Ok(self.lex())
    }

    fn parse_if(&mut self, hash: &Token, state: &mut State) -> Parsed {
        if self.skipping() {
            self.push_suppressed(hash.location);
            return Ok(self.skip_line());
        }
        let (value, eol) = self.evaluate_line(hash, state);
        self.push_conditional(value, hash.location);
        Ok(eol)
    }

    fn parse_ifdef(&mut self, hash: &Token, state: &mut State, want_defined: bool) -> Parsed {
        if self.skipping() {
            self.push_suppressed(hash.location);
            return Ok(self.skip_line());
        }
        let name = self.lex();
        if !name.is_identifier() {
            self.push_conditional(false, hash.location);
            return Err(self.unexpected(state, name));
        }
        let defined = state.macros.is_defined(&name.text);
        self.push_conditional(defined == want_defined, hash.location);
        Ok(self.lex())
    }

    fn parse_else(&mut self, hash: &Token, state: &mut State) -> Parsed {
        let Some(frame) = self.conditionals.last_mut() else {
            state.report(DiagnosticKind::ConditionalWithoutIf, hash.location, "else");
            return Err(self.lex());
        };
        if frame.suppressed_parent {
            return Ok(self.skip_line());
        }
        if frame.seen_else {
            state.report(DiagnosticKind::ConditionalElseAfterElse, hash.location, "else");
            return Err(self.lex());
        }
        frame.seen_else = true;
        frame.active = !frame.taken;
        frame.taken = true;
        Ok(self.lex())
    }

    fn parse_elif(&mut self, hash: &Token, state: &mut State) -> Parsed {
        let Some(frame) = self.conditionals.last_mut() else {
            state.report(DiagnosticKind::ConditionalWithoutIf, hash.location, "elif");
            return Err(self.lex());
        };
        if frame.suppressed_parent {
            return Ok(self.skip_line());
        }
        if frame.seen_else {
            state.report(DiagnosticKind::ConditionalElifAfterElse, hash.location, "elif");
            return Err(self.lex());
        }
        if frame.taken {
            frame.active = false;
            return Ok(self.skip_line());
        }

        let (value, eol) = self.evaluate_line(hash, state);
        if let Some(frame) = self.conditionals.last_mut() {
            frame.active = value;
            frame.taken = value;
        }
        Ok(eol)
    }

    fn parse_endif(&mut self, hash: &Token, state: &mut State) -> Parsed {
        let Some(frame) = self.conditionals.pop() else {
            state.report(DiagnosticKind::ConditionalWithoutIf, hash.location, "endif");
            return Err(self.lex());
        };
        if frame.suppressed_parent {
            return Ok(self.skip_line());
        }
        Ok(self.lex())
    }

    fn parse_error(&mut self, hash: &Token, state: &mut State) -> Parsed {
        let (tokens, eol) = self.raw_line();
        state.report(DiagnosticKind::UserError, hash.location, &tokens_to_text(&tokens));
        Ok(eol)
    }

    fn parse_pragma(&mut self, state: &mut State) -> Parsed {
        let (tokens, eol) = self.raw_line();
        let Some(first) = tokens.first() else {
            return Ok(eol);
        };

        let (stdgl, body) = if first.text == "STDGL" && tokens.len() > 1 {
            (true, &tokens[1..])
        } else {
            (false, &tokens[..])
        };
        match pragma_body(body) {
            Ok((name, value)) => state.record(DirectiveRecord::Pragma {
                name,
                value,
                stdgl,
                location: first.location,
            }),
            Err(token) => {
                let token = token.clone();
                self.unexpected(state, token);
            }
        }
        Ok(eol)
    }

    fn parse_extension(&mut self, state: &mut State) -> Parsed {
        let name = self.lex();
        if !name.is_identifier() {
            return Err(self.unexpected(state, name));
        }
        let colon = self.lex();
        if !colon.is_punct(':') {
            return Err(self.unexpected(state, colon));
        }
        let behavior = self.lex();
        if !behavior.is_identifier() {
            return Err(self.unexpected(state, behavior));
        }
        let Some(behavior_kind) = ExtensionBehavior::from_name(&behavior.text) else {
            state.report(
                DiagnosticKind::InvalidExtensionBehavior,
                behavior.location,
                &behavior.text,
            );
            return Err(self.lex());
        };
        state.record(DirectiveRecord::Extension {
            name: name.text,
            behavior: behavior_kind,
            location: name.location,
        });
        Ok(self.lex())
    }

    fn parse_version(&mut self, hash: &Token, state: &mut State) -> Parsed {
        if self.seen_token {
            state.report(DiagnosticKind::VersionNotFirst, hash.location, "");
            return Err(self.lex());
        }
        let number = self.lex();
        let value = match number.kind {
            TokenKind::IntConstant => parse_integer(&number.text),
            _ => None,
        };
        let Some(value) = value else {
            return Err(self.unexpected(state, number));
        };

        let mut token = self.lex();
        let mut profile = None;
        if token.is_identifier() {
            profile = Some(token.text.clone());
            token = self.lex();
        }
        state.record(DirectiveRecord::Version {
            number: value,
            profile,
            location: hash.location,
        });
        Ok(token)
    }

    fn parse_line(&mut self, state: &mut State) -> Parsed {
        let (tokens, eol) = self.expanded_line(state);
        let mut numbers = Vec::new();
        for token in &tokens {
            let value = match token.kind {
                TokenKind::IntConstant if numbers.len() < 2 => {
                    parse_integer(&token.text).and_then(|v| u32::try_from(v).ok())
                }
                _ => None,
            };
            match value {
                Some(value) => numbers.push(value),
                None => {
                    self.unexpected(state, token.clone());
                    return Ok(eol);
                }
            }
        }

        match numbers[..] {
            [] => {
                self.unexpected(state, eol.clone());
            }
            [line] => self.tokenizer.set_line_number(line),
            [line, file] => {
                self.tokenizer.set_line_number(line);
                self.tokenizer.set_file_index(file);
            }
            _ => {}
        }
        Ok(eol)
    }
}

/// `NAME`, `NAME ( VALUE )` or `NAME : VALUE`. On failure yields the token
/// at fault.
fn pragma_body(tokens: &[Token]) -> Result<(String, Option<String>), &Token> {
    let Some((name, rest)) = tokens.split_first() else {
        return Ok((String::new(), None));
    };
    if !name.is_identifier() {
        return Err(name);
    }
    let value = match rest {
        [] => None,
        [open, value @ .., close]
            if open.is_punct('(') && close.is_punct(')') && !value.is_empty() =>
        {
            Some(tokens_to_text(value))
        }
        [colon, value @ ..] if colon.is_punct(':') && !value.is_empty() => {
            Some(tokens_to_text(value))
        }
        [first, ..] => return Err(first),
    };
    Ok((name.text.clone(), value))
}

impl Lexer for DirectiveParser {
    fn next_token(&mut self, state: &mut State) -> Token {
        loop {
            let token = self.lex();
            match token.kind {
                TokenKind::Eof => {
                    self.finish(state);
                    return token;
                }
                TokenKind::Newline => continue,
                _ => {}
            }
            if token.is_punct('#') && token.at_line_start {
                self.parse_directive(&token, state);
                continue;
            }
            self.seen_token = true;
            if self.skipping() {
                continue;
            }
            return token;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
