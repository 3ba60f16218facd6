//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Preprocessor front end: Tokenizer -> DirectiveParser -> MacroExpander
//
// Main API: preprocess(sources, config) -> Output
//

use crate::diag::Diagnostics;
use crate::directive::DirectiveParser;
use crate::expand::MacroExpander;
use crate::lexer::{tokenize, Lexer, Tokenizer};
use crate::macros::{Macro, MacroTable};
use crate::state::{DirectiveRecord, State};
use crate::token::{SourceLocation, Token};

/// Macro setup applied before the first source line is read.
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Seed `GL_ES`, `__VERSION__`, `__LINE__` and `__FILE__`
    pub predefined: bool,
    /// Extra object-like macros as (name, value text)
    pub defines: Vec<(String, String)>,
    /// Macros removed after the definitions above are applied
    pub undefines: Vec<String>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            predefined: true,
            defines: Vec::new(),
            undefines: Vec::new(),
        }
    }
}

impl PreprocessConfig {
    pub fn macro_table(&self) -> MacroTable {
        let mut table = if self.predefined {
            MacroTable::with_predefined()
        } else {
            MacroTable::new()
        };
        for (name, value) in &self.defines {
            let mut body: Vec<Token> = tokenize(value).iter().map(Token::stripped).collect();
            if let Some(first) = body.first_mut() {
                first.leading_space = true;
            }
            table.predefine(Macro::object(name, body));
        }
        for name in &self.undefines {
            table.remove(name);
        }
        table
    }
}

/// Everything a translation unit produced.
#[derive(Debug)]
pub struct Output {
    pub tokens: Vec<Token>,
    pub diagnostics: Diagnostics,
    pub records: Vec<DirectiveRecord>,
    /// Final macro table, reusable for a following unit
    pub macros: MacroTable,
}

/// One translation unit being preprocessed. Yields the output tokens as an
/// iterator.
pub struct Preprocessor {
    expander: MacroExpander<DirectiveParser>,
    state: State,
}

impl Preprocessor {
    pub fn new<S: AsRef<str>>(sources: &[S]) -> Self {
        Self::with_config(sources, &PreprocessConfig::default())
    }

    pub fn with_config<S: AsRef<str>>(sources: &[S], config: &PreprocessConfig) -> Self {
        Self::with_macros(sources, config.macro_table())
    }

    /// Start a unit with an existing macro table, e.g. the one left by a
    /// previous unit.
    pub fn with_macros<S: AsRef<str>>(sources: &[S], macros: MacroTable) -> Self {
        let parser = DirectiveParser::new(Tokenizer::new(sources));
        Self {
            expander: MacroExpander::new(parser),
            state: State::new(macros),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Where the tokenizer currently is in the source strings
    pub fn location(&self) -> SourceLocation {
        self.expander.get_ref().tokenizer().location()
    }

    /// Number of `#if` groups open at this point
    pub fn conditional_depth(&self) -> usize {
        self.expander.get_ref().conditionals().len()
    }

    /// Run the unit to the end and collect the results.
    pub fn finish(mut self) -> Output {
        let tokens: Vec<Token> = self.by_ref().collect();
        log::debug!(
            "preprocessed {} tokens, {} diagnostics",
            tokens.len(),
            self.state.diagnostics.len()
        );
        Output {
            tokens,
            diagnostics: self.state.diagnostics,
            records: self.state.records,
            macros: self.state.macros,
        }
    }
}

impl Iterator for Preprocessor {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.expander.next_token(&mut self.state);
        if token.is_eof() {
            None
        } else {
            Some(token)
        }
    }
}

pub fn preprocess<S: AsRef<str>>(sources: &[S], config: &PreprocessConfig) -> Output {
    Preprocessor::with_config(sources, config).finish()
}

// ============================================================================
// Tests
// ============================================================================
