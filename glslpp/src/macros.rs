//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Macro definitions and the per-unit macro table
//

use std::collections::HashMap;
use std::rc::Rc;

use crate::diag::DiagnosticKind;
use crate::token::{SourceLocation, Token, TokenKind};

// ============================================================================
// Macro Definition
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroKind {
    Object,
    Function,
}

/// Macros whose value is computed at the point of expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinMacro {
    Line,
    File,
}

/// A macro definition (object-like or function-like)
#[derive(Debug, Clone)]
pub struct Macro {
    pub name: String,
    pub kind: MacroKind,
    /// Parameter names, function-like macros only
    pub params: Vec<String>,
    /// Replacement list; tokens carry no location
    pub replacements: Vec<Token>,
    /// Defined before processing started (built-in or command line)
    pub predefined: bool,
    pub builtin: Option<BuiltinMacro>,
}

/// Two definitions are the same when kind, parameters and replacement list
/// match; the name and origin do not take part.
impl PartialEq for Macro {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.params == other.params
            && self.replacements == other.replacements
    }
}

impl Eq for Macro {}

impl Macro {
    pub fn object(name: &str, replacements: Vec<Token>) -> Self {
        Self {
            name: name.to_string(),
            kind: MacroKind::Object,
            params: Vec::new(),
            replacements,
            predefined: false,
            builtin: None,
        }
    }

    pub fn function(name: &str, params: Vec<String>, replacements: Vec<Token>) -> Self {
        Self {
            kind: MacroKind::Function,
            params,
            ..Self::object(name, replacements)
        }
    }

    /// Object-like macro expanding to a single integer
    pub fn integer(name: &str, value: i64) -> Self {
        Self::object(
            name,
            single_token_body(TokenKind::IntConstant, &value.to_string()),
        )
    }

    fn builtin(name: &str, builtin: BuiltinMacro) -> Self {
        Self {
            builtin: Some(builtin),
            predefined: true,
            ..Self::object(name, Vec::new())
        }
    }

    pub fn is_function(&self) -> bool {
        self.kind == MacroKind::Function
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p == name)
    }
}

/// Names starting with `GL_` or containing `__` are reserved for the
/// implementation.
pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with("GL_") || name.contains("__")
}

// ============================================================================
// Macro Table
// ============================================================================

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MacroError {
    #[error("macro name {0} is reserved")]
    Reserved(String),
    #[error("macro {0} redefined")]
    Redefined(String),
    #[error("predefined macro {0} redefined")]
    PredefinedRedefined(String),
    #[error("predefined macro {0} undefined")]
    PredefinedUndefined(String),
}

impl MacroError {
    pub fn diagnostic_kind(&self) -> DiagnosticKind {
        match self {
            MacroError::Reserved(_) => DiagnosticKind::MacroNameReserved,
            MacroError::Redefined(_) => DiagnosticKind::MacroRedefined,
            MacroError::PredefinedRedefined(_) => DiagnosticKind::MacroPredefinedRedefined,
            MacroError::PredefinedUndefined(_) => DiagnosticKind::MacroPredefinedUndefined,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MacroError::Reserved(name)
            | MacroError::Redefined(name)
            | MacroError::PredefinedRedefined(name)
            | MacroError::PredefinedUndefined(name) => name,
        }
    }
}

/// Macro definitions of one translation unit.
///
/// Only the directive parser writes the table while a unit is processed;
/// the expander and the evaluator read it. Definitions are reference
/// counted so an expansion in progress keeps its macro alive across
/// `#undef`.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    macros: HashMap<String, Rc<Macro>>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table seeded with the macros every GLSL ES shader sees.
    pub fn with_predefined() -> Self {
        let mut table = Self::new();
        table.predefine(Macro::builtin("__LINE__", BuiltinMacro::Line));
        table.predefine(Macro::builtin("__FILE__", BuiltinMacro::File));
        table.predefine(Macro::integer("__VERSION__", 100));
        table.predefine(Macro::integer("GL_ES", 1));
        table
    }

    pub fn get(&self, name: &str) -> Option<&Rc<Macro>> {
        self.macros.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Defined names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.macros.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Insert a user definition (`#define`).
    ///
    /// Reserved names are refused. Redefining a name with an identical
    /// definition is accepted and changes nothing; any other redefinition is
    /// refused and the existing definition stays.
    pub fn define(&mut self, mac: Macro) -> Result<(), MacroError> {
        if is_reserved_name(&mac.name) {
            return Err(MacroError::Reserved(mac.name));
        }
        if let Some(existing) = self.macros.get(&mac.name) {
            if existing.predefined {
                return Err(MacroError::PredefinedRedefined(mac.name));
            }
            if **existing != mac {
                return Err(MacroError::Redefined(mac.name));
            }
            log::trace!("benign redefinition of {}", mac.name);
            return Ok(());
        }
        log::debug!(
            "defined macro {}: {:?}",
            mac.name,
            crate::token::tokens_to_text(&mac.replacements)
        );
        self.macros.insert(mac.name.clone(), Rc::new(mac));
        Ok(())
    }

    /// Insert a predefined macro, bypassing the reserved-name and
    /// redefinition rules. Replaces any existing entry.
    pub fn predefine(&mut self, mut mac: Macro) {
        mac.predefined = true;
        self.macros.insert(mac.name.clone(), Rc::new(mac));
    }

    /// Remove a user definition (`#undef`). Removing an undefined name is
    /// not an error.
    pub fn undefine(&mut self, name: &str) -> Result<Option<Rc<Macro>>, MacroError> {
        match self.macros.get(name) {
            Some(mac) if mac.predefined => Err(MacroError::PredefinedUndefined(name.to_string())),
            Some(_) => Ok(self.macros.remove(name)),
            None => Ok(None),
        }
    }

    /// Remove any entry, predefined ones included.
    pub fn remove(&mut self, name: &str) -> Option<Rc<Macro>> {
        self.macros.remove(name)
    }
}

/// Replacement list of a single token, spaced from the macro name
fn single_token_body(kind: TokenKind, text: &str) -> Vec<Token> {
    let mut token = Token::new(kind, text, SourceLocation::default());
    token.leading_space = true;
    vec![token]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn one() -> Vec<Token> {
        single_token_body(TokenKind::IntConstant, "1")
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved_name("GL_FOO"));
        assert!(is_reserved_name("FOO__BAR"));
        assert!(is_reserved_name("__FOO"));
        assert!(!is_reserved_name("GLFOO"));
        assert!(!is_reserved_name("gl_foo"));
        assert!(!is_reserved_name("FOO_BAR"));
    }

    #[test]
    fn test_define_reserved_refused() {
        let mut table = MacroTable::new();
        let err = table.define(Macro::object("GL_FOO", one())).unwrap_err();
        assert_eq!(err, MacroError::Reserved("GL_FOO".to_string()));
        assert_eq!(err.diagnostic_kind(), DiagnosticKind::MacroNameReserved);
        assert!(!table.is_defined("GL_FOO"));
    }

    #[test]
    fn test_benign_redefinition() {
        let mut table = MacroTable::new();
        table.define(Macro::object("A", one())).unwrap();
        table.define(Macro::object("A", one())).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_conflicting_redefinition_keeps_first() {
        let mut table = MacroTable::new();
        table.define(Macro::object("A", one())).unwrap();
        let two = single_token_body(TokenKind::IntConstant, "2");
        let err = table.define(Macro::object("A", two)).unwrap_err();
        assert_eq!(err, MacroError::Redefined("A".to_string()));
        assert_eq!(table.get("A").unwrap().replacements[0].text, "1");
    }

    #[test]
    fn test_integer_macro() {
        let gl_es = Macro::integer("GL_ES", 1);
        assert_eq!(gl_es.replacements, one());
        assert_eq!(gl_es, Macro::object("OTHER", one()));
    }

    #[test]
    fn test_kind_participates_in_equality() {
        let obj = Macro::object("F", one());
        let func = Macro::function("F", vec![], one());
        assert_ne!(obj, func);
        let func_x = Macro::function("F", vec!["x".to_string()], one());
        assert_ne!(func, func_x);
    }

    #[test]
    fn test_undefine() {
        let mut table = MacroTable::new();
        assert_eq!(table.undefine("NOPE"), Ok(None));
        table.define(Macro::object("A", one())).unwrap();
        assert!(table.undefine("A").unwrap().is_some());
        assert!(!table.is_defined("A"));
    }

    #[test]
    fn test_predefined_protected() {
        let mut table = MacroTable::with_predefined();
        assert!(table.is_defined("GL_ES"));
        assert!(table.is_defined("__LINE__"));
        assert_eq!(
            table.undefine("GL_ES"),
            Err(MacroError::PredefinedUndefined("GL_ES".to_string()))
        );

        table.predefine(Macro::object("FEATURE", one()));
        assert_eq!(
            table.define(Macro::object("FEATURE", one())),
            Err(MacroError::PredefinedRedefined("FEATURE".to_string()))
        );
        assert!(table.remove("FEATURE").is_some());
        assert_eq!(table.names(), vec!["GL_ES", "__FILE__", "__LINE__", "__VERSION__"]);
    }
}
