//! Flat `key=value` property blocks, as stored in JPK archives.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::AfmError;

/// Parsed property block with typed, defaulting getters
#[derive(Debug, Clone, Default)]
pub struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    /// Parse `key=value` lines. `#` lines and lines without `=` are skipped.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter(|line| !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (unescape(key.trim()), unescape(value.trim())))
            .collect();
        Self { entries }
    }

    /// Parse a byte buffer, replacing invalid UTF-8
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// Raw value of a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the block is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a value, falling back to `default` when absent or malformed
    pub fn parse_or<T: FromStr>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            None => default,
            Some(raw) => match raw.parse::<T>() {
                Ok(value) => value,
                Err(_) => {
                    AfmError::malformed(key, raw).warn();
                    default
                }
            },
        }
    }

    /// Parse an optional value; malformed values are logged and dropped
    pub fn parse_opt<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                AfmError::malformed(key, raw).warn();
                None
            }
        }
    }

    /// Parse a `true`/`false` flag
    pub fn flag_or(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some("true") => true,
            Some("false") => false,
            None => default,
            Some(other) => {
                AfmError::malformed(key, other).warn();
                default
            }
        }
    }

    /// Owned string value
    pub fn string(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }
}

// Java property files escape ':' '=' and spaces with a backslash.
fn unescape(text: &str) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
