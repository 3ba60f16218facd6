//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Per-translation-unit preprocessor state
//

use std::fmt;

use crate::diag::{DiagnosticKind, Diagnostics};
use crate::macros::MacroTable;
use crate::token::SourceLocation;

/// Behavior requested by `#extension NAME : BEHAVIOR`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionBehavior {
    Require,
    Enable,
    Warn,
    Disable,
}

impl ExtensionBehavior {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "require" => Some(ExtensionBehavior::Require),
            "enable" => Some(ExtensionBehavior::Enable),
            "warn" => Some(ExtensionBehavior::Warn),
            "disable" => Some(ExtensionBehavior::Disable),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionBehavior::Require => "require",
            ExtensionBehavior::Enable => "enable",
            ExtensionBehavior::Warn => "warn",
            ExtensionBehavior::Disable => "disable",
        }
    }
}

/// Information a directive passes on to the compiler instead of the token
/// stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveRecord {
    Version {
        number: i32,
        profile: Option<String>,
        location: SourceLocation,
    },
    Extension {
        name: String,
        behavior: ExtensionBehavior,
        location: SourceLocation,
    },
    Pragma {
        name: String,
        value: Option<String>,
        /// `#pragma STDGL ...`
        stdgl: bool,
        location: SourceLocation,
    },
}

impl DirectiveRecord {
    pub fn location(&self) -> SourceLocation {
        match self {
            DirectiveRecord::Version { location, .. }
            | DirectiveRecord::Extension { location, .. }
            | DirectiveRecord::Pragma { location, .. } => *location,
        }
    }
}

/// Renders the record back in directive syntax.
impl fmt::Display for DirectiveRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveRecord::Version {
                number, profile, ..
            } => {
                write!(f, "#version {}", number)?;
                if let Some(profile) = profile {
                    write!(f, " {}", profile)?;
                }
                Ok(())
            }
            DirectiveRecord::Extension { name, behavior, .. } => {
                write!(f, "#extension {} : {}", name, behavior.as_str())
            }
            DirectiveRecord::Pragma {
                name, value, stdgl, ..
            } => {
                f.write_str("#pragma ")?;
                if *stdgl {
                    f.write_str("STDGL ")?;
                }
                f.write_str(name)?;
                if let Some(value) = value {
                    write!(f, "({})", value)?;
                }
                Ok(())
            }
        }
    }
}

/// Mutable state shared by every stage of one translation unit.
#[derive(Debug, Default)]
pub struct State {
    pub macros: MacroTable,
    pub diagnostics: Diagnostics,
    pub records: Vec<DirectiveRecord>,
}

impl State {
    pub fn new(macros: MacroTable) -> Self {
        Self {
            macros,
            ..Self::default()
        }
    }

    pub fn report(&mut self, kind: DiagnosticKind, location: SourceLocation, text: &str) {
        self.diagnostics.report(kind, location, text);
    }

    pub fn record(&mut self, record: DirectiveRecord) {
        log::debug!("record {}: {}", record.location(), record);
        self.records.push(record);
    }
}
