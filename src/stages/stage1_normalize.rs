use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::models::ParsedTranscript;

/// Canonical bucket for statements whose speaker label cleans to nothing.
/// Keeps the conservation invariant: every statement attributes somewhere.
pub const UNKNOWN_PARTICIPANT: &str = "Unknown";

/// Alias-table construction errors
#[derive(Debug, Error)]
pub enum AliasError {
    /// A canonical value is not a fixed point of normalization under this
    /// table, so normalize(normalize(x)) would diverge from normalize(x)
    #[error("canonical name '{canonical}' for alias '{alias}' is not normalization-stable (normalizes to '{resolved}')")]
    NotIdempotent {
        alias: String,
        canonical: String,
        resolved: String,
    },
}

/// Externally configured alias → canonical-name mapping.
/// Lookup is exact and case-sensitive on the cleaned string.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table, rejecting mappings that would break idempotence:
    /// every canonical value must normalize to itself under the finished
    /// table (clean, and not remapped to a different name).
    pub fn new(entries: HashMap<String, String>) -> Result<Self, AliasError> {
        let table = Self { entries };
        for (alias, canonical) in &table.entries {
            let resolved = table.normalize(canonical);
            if &resolved != canonical {
                return Err(AliasError::NotIdempotent {
                    alias: alias.clone(),
                    canonical: canonical.clone(),
                    resolved,
                });
            }
        }
        Ok(table)
    }

    /// Load a `{ "alias": "Canonical Name" }` JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read alias table from {:?}", path))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct AliasFile {
            #[serde(default)]
            aliases: HashMap<String, String>,
        }

        // Accept both a bare map and an { "aliases": { ... } } wrapper
        let entries = match serde_json::from_str::<HashMap<String, String>>(json) {
            Ok(map) => map,
            Err(_) => {
                serde_json::from_str::<AliasFile>(json)
                    .context("Failed to parse alias table JSON")?
                    .aliases
            }
        };

        Ok(Self::new(entries)?)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonicalize a raw speaker label: strip bracketed annotations,
    /// collapse whitespace, then apply the alias mapping. Idempotent.
    pub fn normalize(&self, raw: &str) -> String {
        let cleaned = collapse_whitespace(&strip_bracket_groups(raw));
        match self.entries.get(&cleaned) {
            Some(canonical) => canonical.clone(),
            None => cleaned,
        }
    }

    /// Rewrite every statement's speaker to its canonical name, routing
    /// empty results to the `Unknown` bucket
    pub fn normalize_transcript(&self, parsed: &mut ParsedTranscript) {
        for statement in &mut parsed.statements {
            let canonical = self.normalize(&statement.speaker);
            statement.speaker = if canonical.is_empty() {
                UNKNOWN_PARTICIPANT.to_string()
            } else {
                canonical
            };
        }
    }
}

/// Remove every balanced `[...]` / `(...)` group, at any nesting depth.
/// An opener that never closes keeps its text: closed groups are removed
/// as they complete, everything else survives untouched.
fn strip_bracket_groups(raw: &str) -> String {
    // Stack of buffers: base output, plus one per open bracket group
    let mut buffers: Vec<(Option<char>, String)> = vec![(None, String::new())];

    for c in raw.chars() {
        match c {
            '[' | '(' => buffers.push((Some(c), String::new())),
            ']' | ')' => {
                let opener = if c == ']' { '[' } else { '(' };
                if buffers.last().is_some_and(|(open, _)| *open == Some(opener)) {
                    // A group closed: discard its content
                    buffers.pop();
                } else if let Some((_, buf)) = buffers.last_mut() {
                    // Closer with no matching opener stays literal
                    buf.push(c);
                }
            }
            _ => {
                if let Some((_, buf)) = buffers.last_mut() {
                    buf.push(c);
                }
            }
        }
    }

    // Unclosed groups are flushed back with their opener intact
    let mut result = String::new();
    for (opener, buf) in buffers {
        if let Some(opener) = opener {
            result.push(opener);
        }
        result.push_str(&buf);
    }
    result
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
