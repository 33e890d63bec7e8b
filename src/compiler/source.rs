//! Directive text loading
//!
//! Reads policy text one directive per logical line. `#` starts a comment
//! line, a line beginning with whitespace continues the previous one, and
//! double quotes group words into one token (`\"` is a literal quote inside
//! quotes; other backslashes are kept so DN escapes survive).

use thiserror::Error;
use tracing::{error, info};

use super::Compiler;
use crate::limits::CompileError;
use crate::rules::{RuleTable, RuleTableBuilder};

/// Result type for loading directive text
pub type LoadResult<T> = Result<T, LoadError>;

/// Loading errors, located by the line the directive starts on
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("line {line}: {reason}")]
    Syntax { line: usize, reason: String },

    #[error("line {line}: {source}")]
    Directive {
        line: usize,
        #[source]
        source: CompileError,
    },
}

impl LoadError {
    pub fn line(&self) -> usize {
        match self {
            LoadError::Syntax { line, .. } | LoadError::Directive { line, .. } => *line,
        }
    }
}

/// Split one logical line into tokens
pub fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            '\\' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quoted {
        return Err("unterminated quoted string".to_string());
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Join continuation lines, yielding `(first line number, text)` per directive
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        if raw.trim().is_empty() || raw.trim_start().starts_with('#') {
            continue;
        }
        let continues = raw.starts_with(char::is_whitespace);
        match lines.last_mut() {
            Some((_, current)) if continues => {
                current.push(' ');
                current.push_str(raw.trim());
            }
            _ => lines.push((line_no, raw.trim().to_string())),
        }
    }
    lines
}

/// Compile every directive in `text` onto `builder`, stopping at the first
/// failure
pub fn load_into(
    compiler: &Compiler<'_>,
    builder: &mut RuleTableBuilder,
    text: &str,
) -> LoadResult<()> {
    for (line, directive) in logical_lines(text) {
        let tokens = tokenize(&directive).map_err(|reason| {
            error!(line, %reason, "malformed directive");
            LoadError::Syntax { line, reason }
        })?;

        compiler
            .compile_directive(builder, &tokens[..])
            .map_err(|source| {
                error!(
                    line,
                    token = source.token().unwrap_or_default(),
                    code = source.code(),
                    "rejected directive: {}",
                    source
                );
                LoadError::Directive { line, source }
            })?;
    }
    Ok(())
}

/// Compile `text` into a fresh, frozen table
pub fn load_directives(compiler: &Compiler<'_>, text: &str) -> LoadResult<RuleTable> {
    let mut builder = RuleTableBuilder::new();
    load_into(compiler, &mut builder, text)?;
    let table = builder.build();
    info!(rules = table.len(), "loaded limits policy");
    Ok(table)
}
