//! Route pattern compilation.
//!
//! A pattern is a path template made of literal text and placeholders:
//!
//! | Placeholder | Matches |
//! |---|---|
//! | `{id}` | one non-empty path segment (`[^/]+`) |
//! | `{id:\d+}` | one segment of decimal digits |
//! | `{file:.*\.\w+}` | the rest of the path, separators included, ending in an extension |
//!
//! Each pattern compiles to a single anchored regular expression with one
//! named group per placeholder. Constraints may contain braces of their own
//! (`{year:\d{4}}`); literal text is matched verbatim.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

const DEFAULT_CONSTRAINT: &str = "[^/]+";

/// Why a pattern failed to compile.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("pattern must start with `/`")]
    MissingLeadingSlash,

    #[error("placeholder opened at byte {0} is never closed")]
    Unclosed(usize),

    #[error("unmatched `}}` at byte {0}")]
    UnmatchedClose(usize),

    #[error("invalid placeholder name `{0}`")]
    InvalidName(String),

    #[error("placeholder `{0}` appears more than once")]
    Duplicate(String),

    #[error("invalid constraint: {0}")]
    Regex(#[from] regex::Error),
}

/// A compiled route pattern.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: String,
    regex: Regex,
    names: Vec<String>,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        if !source.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash);
        }

        let mut expr = String::from("^");
        let mut names: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices();

        while let Some((at, c)) = chars.next() {
            match c {
                '{' => {
                    expr.push_str(&regex::escape(&literal));
                    literal.clear();

                    let body = read_placeholder(&mut chars, at)?;
                    let (name, constraint) = match body.split_once(':') {
                        Some((name, constraint)) => (name, constraint),
                        None => (body.as_str(), DEFAULT_CONSTRAINT),
                    };
                    if !is_identifier(name) {
                        return Err(PatternError::InvalidName(name.to_owned()));
                    }
                    if names.iter().any(|n| n == name) {
                        return Err(PatternError::Duplicate(name.to_owned()));
                    }
                    expr.push_str(&format!("(?P<{name}>{constraint})"));
                    names.push(name.to_owned());
                }
                '}' => return Err(PatternError::UnmatchedClose(at)),
                _ => literal.push(c),
            }
        }
        expr.push_str(&regex::escape(&literal));
        expr.push('$');

        Ok(Self { source: source.to_owned(), regex: Regex::new(&expr)?, names })
    }

    /// Matches `path` in full and returns the captured placeholders.
    pub fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.names
                .iter()
                .filter_map(|name| caps.name(name).map(|m| (name.clone(), m.as_str().to_owned())))
                .collect(),
        )
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Consumes a placeholder body up to its closing brace. Nested braces and
/// backslash escapes inside the constraint are kept as written.
fn read_placeholder(chars: &mut std::str::CharIndices<'_>, opened_at: usize) -> Result<String, PatternError> {
    let mut body = String::new();
    let mut depth = 1usize;
    loop {
        let Some((_, c)) = chars.next() else {
            return Err(PatternError::Unclosed(opened_at));
        };
        match c {
            '\\' => {
                body.push('\\');
                if let Some((_, escaped)) = chars.next() {
                    body.push(escaped);
                }
            }
            '{' => {
                depth += 1;
                body.push('{');
            }
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(body);
                }
                body.push('}');
            }
            other => body.push(other),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
