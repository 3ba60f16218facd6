//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Diagnostic events for the preprocessor
//
// The preprocessor never prints anything itself. Every problem becomes a
// structured event appended to a Diagnostics sink; the caller decides what
// to show and whether the compilation failed.
//

use std::fmt;

use crate::token::SourceLocation;

// ============================================================================
// Diagnostic Kinds
// ============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    fn prefix(&self) -> &'static str {
        match self {
            Severity::Warning => "warning: ",
            Severity::Error => "error: ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    UnexpectedTokenInDirective,
    EofInDirective,
    MacroNameReserved,
    MacroRedefined,
    MacroPredefinedRedefined,
    MacroPredefinedUndefined,
    MacroDuplicateParameterNames,
    MacroTooFewArgs,
    MacroTooManyArgs,
    MacroUnterminatedInvocation,
    ConditionalWithoutIf,
    ConditionalElseAfterElse,
    ConditionalElifAfterElse,
    ConditionalUnterminated,
    DivisionByZero,
    InvalidExpression,
    InvalidExtensionBehavior,
    VersionNotFirst,
    /// Raised by `#error`
    UserError,
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::ConditionalUnterminated => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn message(&self) -> &'static str {
        use DiagnosticKind::*;
        match self {
            UnexpectedTokenInDirective => "unexpected token in directive",
            EofInDirective => "unexpected end of file in directive",
            MacroNameReserved => "macro name is reserved",
            MacroRedefined => "macro redefined",
            MacroPredefinedRedefined => "predefined macro redefined",
            MacroPredefinedUndefined => "predefined macro undefined",
            MacroDuplicateParameterNames => "duplicate macro parameter name",
            MacroTooFewArgs => "too few arguments to macro",
            MacroTooManyArgs => "too many arguments to macro",
            MacroUnterminatedInvocation => "unterminated macro invocation",
            ConditionalWithoutIf => "conditional directive without #if",
            ConditionalElseAfterElse => "#else after #else",
            ConditionalElifAfterElse => "#elif after #else",
            ConditionalUnterminated => "unterminated conditional directive",
            DivisionByZero => "division by zero in preprocessor expression",
            InvalidExpression => "invalid preprocessor expression",
            InvalidExtensionBehavior => "invalid extension behavior",
            VersionNotFirst => "#version must occur before anything else",
            UserError => "#error",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

// ============================================================================
// Diagnostic Events
// ============================================================================

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub location: SourceLocation,
    /// Token text (or message, for `#error`) the event refers to
    pub text: String,
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Render as `name:line: error: message`, looking the source string
    /// name up in `names` (falling back to the numeric index).
    pub fn render(&self, names: &[String]) -> String {
        let name = names
            .get(self.location.file as usize)
            .map(|n| prettify_path(n))
            .unwrap_or_else(|| self.location.file.to_string());
        let mut out = format!(
            "{}:{}: {}{}",
            name,
            self.location.line,
            self.severity().prefix(),
            self.kind.message()
        );
        if !self.text.is_empty() {
            match self.kind {
                DiagnosticKind::UserError => out.push(' '),
                _ => out.push_str(": "),
            }
            out.push_str(&self.text);
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&[]))
    }
}

/// Prettify a path by removing ./ prefix if present
fn prettify_path(path: &str) -> String {
    path.strip_prefix("./")
        .map(|s| s.to_string())
        .unwrap_or_else(|| path.to_string())
}

// ============================================================================
// Diagnostics Sink
// ============================================================================

/// Append-only log of diagnostic events.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    events: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, kind: DiagnosticKind, location: SourceLocation, text: &str) {
        log::debug!("diagnostic {:?} at {}: {:?}", kind, location, text);
        self.events.push(Diagnostic {
            kind,
            location,
            text: text.to_string(),
        });
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.events
            .iter()
            .filter(|d| d.severity() == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.events
            .iter()
            .filter(|d| d.severity() == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Kinds of all events, in report order
    pub fn kinds(&self) -> Vec<DiagnosticKind> {
        self.events.iter().map(|d| d.kind).collect()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_name() {
        let mut diags = Diagnostics::new();
        diags.report(
            DiagnosticKind::MacroRedefined,
            SourceLocation::new(0, 7),
            "FOO",
        );
        let names = vec!["./shader.frag".to_string()];
        let d = diags.iter().next().unwrap();
        assert_eq!(
            d.render(&names),
            "shader.frag:7: error: macro redefined: FOO"
        );
    }

    #[test]
    fn test_render_without_name() {
        let d = Diagnostic {
            kind: DiagnosticKind::UserError,
            location: SourceLocation::new(3, 1),
            text: "not supported".to_string(),
        };
        assert_eq!(d.to_string(), "3:1: error: #error not supported");
    }

    #[test]
    fn test_prettify_path() {
        assert_eq!(prettify_path("./test.vert"), "test.vert");
        assert_eq!(prettify_path("test.vert"), "test.vert");
    }

    #[test]
    fn test_error_counting() {
        let mut diags = Diagnostics::new();
        assert!(!diags.has_errors());

        let loc = SourceLocation::new(0, 1);
        diags.report(DiagnosticKind::ConditionalUnterminated, loc, "if");
        assert_eq!(diags.warning_count(), 1);
        assert!(!diags.has_errors());

        diags.report(DiagnosticKind::DivisionByZero, loc, "/");
        assert_eq!(diags.error_count(), 1);
        assert!(diags.has_errors());
        assert_eq!(
            diags.kinds(),
            vec![
                DiagnosticKind::ConditionalUnterminated,
                DiagnosticKind::DivisionByZero
            ]
        );
    }
}
