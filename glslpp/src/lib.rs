//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// glslpp - OpenGL ES shading language preprocessor
//

use std::io::{Read, Write};
use std::path::PathBuf;

use clap::builder::{TypedValueParser, ValueParserFactory};

pub mod defined;
pub mod diag;
pub mod directive;
pub mod error;
pub mod expand;
pub mod expr;
pub mod lexer;
pub mod macros;
pub mod preprocessor;
pub mod state;
pub mod token;

pub use diag::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::{Error, GetExitCode, Result};
pub use lexer::{Lexer, Tokenizer};
pub use macros::{Macro, MacroTable};
pub use preprocessor::{preprocess, Output, PreprocessConfig, Preprocessor};
pub use state::{DirectiveRecord, State};
pub use token::{SourceLocation, Token, TokenKind};

// ============================================================================
// Command line
// ============================================================================

/// `-D name[=value]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDefine {
    pub name: String,
    pub value: Option<String>,
}

impl ArgumentDefine {
    pub fn parse(text: &str) -> Result<Self> {
        let (name, value) = match text.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (text, None),
        };
        let valid = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(Error::InvalidMacroName(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            value,
        })
    }
}

#[derive(Clone)]
pub struct ArgumentDefineParser;

impl TypedValueParser for ArgumentDefineParser {
    type Value = ArgumentDefine;

    fn parse_ref(
        &self,
        cmd: &clap::Command,
        _arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> std::result::Result<Self::Value, clap::Error> {
        let Some(text) = value.to_str() else {
            return Err(clap::Error::new(clap::error::ErrorKind::InvalidUtf8).with_cmd(cmd));
        };
        ArgumentDefine::parse(text).map_err(|e| {
            clap::Error::raw(clap::error::ErrorKind::InvalidValue, format!("{e}\n")).with_cmd(cmd)
        })
    }
}

impl ValueParserFactory for ArgumentDefine {
    type Parser = ArgumentDefineParser;

    fn value_parser() -> Self::Parser {
        ArgumentDefineParser
    }
}

#[derive(Debug, clap::Parser, Clone, Default)]
#[command(version, about = "glslpp - preprocess OpenGL ES shading language source")]
pub struct Args {
    /// `name[=value]`
    ///
    /// Define `name` as `value`, or as `1` if `=value` is omitted.
    #[arg(short = 'D', long)]
    pub define: Vec<ArgumentDefine>,
    /// Remove the macro `name` before processing.
    #[arg(short = 'U', long)]
    pub undefine: Vec<String>,
    /// Print one token per line as `line:kind:text`.
    #[arg(long)]
    pub dump_tokens: bool,
    /// Do not predefine GL_ES, __VERSION__, __LINE__ and __FILE__.
    #[arg(long)]
    pub no_predefined: bool,
    /// Source strings of the shader, in order. Standard input if none.
    pub files: Vec<PathBuf>,
}

impl Args {
    pub fn config(&self) -> PreprocessConfig {
        PreprocessConfig {
            predefined: !self.no_predefined,
            defines: self
                .define
                .iter()
                .map(|d| {
                    let value = d.value.clone().unwrap_or_else(|| "1".to_string());
                    (d.name.clone(), value)
                })
                .collect(),
            undefines: self.undefine.clone(),
        }
    }
}

/// Source names and contents, in file index order
fn read_sources(files: &[PathBuf]) -> Result<(Vec<String>, Vec<String>)> {
    if files.is_empty() {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok((vec!["stdin".to_string()], vec![text]));
    }

    let mut names = Vec::with_capacity(files.len());
    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        let text = std::fs::read_to_string(path).map_err(|source| Error::File {
            path: path.clone(),
            source,
        })?;
        names.push(path.display().to_string());
        sources.push(text);
    }
    Ok((names, sources))
}

/// Render tokens one output line per source line.
pub fn render_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut line: Option<SourceLocation> = None;
    for token in tokens {
        if line.is_some_and(|l| l != token.location) {
            out.push('\n');
        } else if line.is_some() && token.leading_space {
            out.push(' ');
        }
        line = Some(token.location);
        out.push_str(&token.text);
    }
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Render tokens as `line:kind:text`, one per line.
pub fn dump_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| format!("{}:{}:{}\n", t.location.line, t.kind, t.text))
        .collect()
}

pub fn run<STDOUT: Write, STDERR: Write>(
    stdout: STDOUT,
    mut stderr: STDERR,
    args: Args,
) -> crate::error::Result<()> {
    match run_impl(stdout, &mut stderr, args) {
        Ok(()) => Ok(()),
        Err(Error::Failed(count)) => Err(Error::Failed(count)),
        Err(error) => {
            writeln!(stderr, "glslpp: {error}")?;
            Err(error)
        }
    }
}

fn run_impl<STDOUT: Write, STDERR: Write>(
    mut stdout: STDOUT,
    mut stderr: STDERR,
    args: Args,
) -> crate::error::Result<()> {
    let (names, sources) = read_sources(&args.files)?;
    let output = preprocess(&sources, &args.config());

    for diagnostic in &output.diagnostics {
        writeln!(stderr, "{}", diagnostic.render(&names))?;
    }

    if args.dump_tokens {
        stdout.write_all(dump_tokens(&output.tokens).as_bytes())?;
    } else {
        for record in &output.records {
            writeln!(stdout, "{record}")?;
        }
        stdout.write_all(render_tokens(&output.tokens).as_bytes())?;
    }
    stdout.flush()?;

    let errors = output.diagnostics.error_count();
    if errors > 0 {
        return Err(Error::Failed(errors));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_define() {
        assert_eq!(
            ArgumentDefine::parse("FOO=1 + 2").unwrap(),
            ArgumentDefine {
                name: "FOO".to_string(),
                value: Some("1 + 2".to_string())
            }
        );
        assert_eq!(ArgumentDefine::parse("_X").unwrap().value, None);
        assert!(matches!(
            ArgumentDefine::parse("1X=2"),
            Err(Error::InvalidMacroName(_))
        ));
        assert!(ArgumentDefine::parse("=2").is_err());
    }

    #[test]
    fn test_args_config() {
        let args = Args {
            define: vec![ArgumentDefine::parse("A").unwrap()],
            undefine: vec!["B".to_string()],
            no_predefined: true,
            ..Args::default()
        };
        let config = args.config();
        assert!(!config.predefined);
        assert_eq!(config.defines, vec![("A".to_string(), "1".to_string())]);
        assert_eq!(config.undefines, vec!["B".to_string()]);
    }

    #[test]
    fn test_render_tokens() {
        let output = preprocess(&["a  b\n\nc(d)\n#define X e\nX f"], &PreprocessConfig::default());
        assert_eq!(render_tokens(&output.tokens), "a b\nc(d)\ne f\n");
        assert_eq!(render_tokens(&[]), "");
    }

    #[test]
    fn test_dump_tokens() {
        let output = preprocess(&["x = 1;"], &PreprocessConfig::default());
        assert_eq!(
            dump_tokens(&output.tokens),
            "1:identifier:x\n1:punct:=\n1:int:1\n1:punct:;\n"
        );
    }
}
