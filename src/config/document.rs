//! Ordered, lossless model of a `KEY=VALUE` file.
//!
//! Lines that are never touched are written back byte-for-byte, so comments,
//! blank lines, unknown keys and hand formatting all survive an upsert.

use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BootstrapError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Entry {
        key: String,
        value: String,
        /// Original text, kept until the entry is rewritten
        raw: Option<String>,
    },
    Other(String),
}

impl Line {
    fn key(&self) -> Option<&str> {
        match self {
            Line::Entry { key, .. } => Some(key),
            Line::Other(_) => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Line::Entry {
                raw: Some(raw), ..
            } => raw.clone(),
            Line::Entry { key, value, .. } => format!("{}={}", key, quote_value(value)),
            Line::Other(text) => text.clone(),
        }
    }
}

/// An env file as an ordered list of lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvDocument {
    lines: Vec<Line>,
}

impl EnvDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|raw| match parse_entry(raw) {
                Some((key, value)) => Line::Entry {
                    key,
                    value,
                    raw: Some(raw.to_string()),
                },
                None => Line::Other(raw.to_string()),
            })
            .collect();
        Self { lines }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BootstrapError::io(format!("reading {}", path.display()), e))?;
        Ok(Self::parse(&text))
    }

    /// Value for `key`. A key repeated by hand resolves to its last
    /// occurrence, as it would when the file is sourced.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| match line {
            Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys in file order, each reported once
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for key in self.lines.iter().filter_map(Line::key) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    /// Entries as (key, effective value) pairs in file order
    pub fn entries(&self) -> Vec<(&str, &str)> {
        self.keys()
            .into_iter()
            .filter_map(|key| self.get(key).map(|value| (key, value)))
            .collect()
    }

    /// Set `key` to `value`, replacing the first occurrence in place or
    /// appending a new line. Later duplicates are dropped so the key appears
    /// exactly once afterwards. Returns true if the rendered file changed.
    pub fn upsert(&mut self, key: &str, value: &str) -> bool {
        let positions: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.key() == Some(key))
            .map(|(i, _)| i)
            .collect();

        let Some(&first) = positions.first() else {
            self.lines.push(Line::Entry {
                key: key.to_string(),
                value: value.to_string(),
                raw: None,
            });
            return true;
        };

        let mut changed = false;
        for &dup in positions[1..].iter().rev() {
            self.lines.remove(dup);
            changed = true;
        }

        if let Line::Entry { value: current, raw, .. } = &mut self.lines[first]
            && current.as_str() != value
        {
            *current = value.to_string();
            *raw = None;
            changed = true;
        }

        changed
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render back to text: one line per entry, trailing newline
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.render());
            out.push('\n');
        }
        out
    }

    /// Write atomically: temp file in the same directory, then rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let temp_path = temp_path_for(path);
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| BootstrapError::io(format!("creating {}", temp_path.display()), e))?;

        temp_file
            .write_all(self.render().as_bytes())
            .and_then(|_| temp_file.sync_all())
            .map_err(|e| BootstrapError::io(format!("writing {}", temp_path.display()), e))?;

        std::fs::rename(&temp_path, path)
            .map_err(|e| BootstrapError::io(format!("replacing {}", path.display()), e))?;

        debug!(path = %path.display(), keys = self.len(), "saved env file");
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "env".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Split a line into key and value, or None for comments, blanks and lines
/// dotenvy would reject
fn parse_entry(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let trimmed = trimmed
        .strip_prefix("export ")
        .map(str::trim_start)
        .unwrap_or(trimmed);
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if !is_valid_key(key) {
        return None;
    }

    Some((key.to_string(), parse_value(value.trim())?))
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Unquote a value with dotenvy's lexing rules. `$NAME` references are
/// kept literally. None when dotenvy would reject the value.
fn parse_value(value: &str) -> Option<String> {
    if value.starts_with('#') {
        return Some(String::new());
    }

    let mut out = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if escaped {
            match c {
                '\\' | '\'' | '"' | '$' | ' ' => out.push(c),
                'n' => out.push('\n'),
                _ => return None,
            }
            escaped = false;
            continue;
        }

        match (quote, c) {
            (Some(open), c) if c == open => quote = None,
            (Some('\''), c) => out.push(c),
            (Some(_), '\\') => escaped = true,
            (Some(_), c) => out.push(c),
            (None, '\'' | '"') => quote = Some(c),
            (None, '\\') => escaped = true,
            (None, ' ' | '\t') => {
                // Unquoted whitespace may only be followed by a comment
                let rest = chars.as_str().trim_start_matches([' ', '\t']);
                return (rest.is_empty() || rest.starts_with('#')).then_some(out);
            }
            (None, c) => out.push(c),
        }
    }

    quote.is_none().then_some(out)
}

/// Render `value` so both this parser and dotenvy read it back unchanged
fn quote_value(value: &str) -> Cow<'_, str> {
    let plain = value
        .chars()
        .all(|c| !c.is_whitespace() && !matches!(c, '$' | '#' | '"' | '\'' | '\\'));
    if plain {
        return Cow::Borrowed(value);
    }

    // Single quotes are literal, but dotenvy's line joiner still reads `\` as an escape
    if !value.contains(['\'', '\n', '\\']) {
        return Cow::Owned(format!("'{}'", value));
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' | '"' | '$' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\n' => quoted.push_str("\\n"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    Cow::Owned(quoted)
}
