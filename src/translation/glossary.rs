/*!
 * User glossary applied to translated text.
 *
 * The glossary is a UTF-8 text file with one `source:target` pair per line.
 * Blank lines are ignored; any other line that does not match the pair
 * format rejects the whole file. After a fragment is translated, every
 * occurrence of a `source` term is replaced with its `target`, longest
 * terms first so that overlapping entries resolve predictably.
 */

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static ENTRY_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^:]+:[^:]+$").expect("valid regex"));

/// One glossary mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossaryEntry {
    /// Text to look for in the translation
    pub source: String,
    /// Replacement
    pub target: String,
}

/// Ordered set of replacements
#[derive(Debug, Clone, Default)]
pub struct Glossary {
    entries: Vec<GlossaryEntry>,
}

impl Glossary {
    /// Parse glossary text
    pub fn parse(content: &str) -> Result<Self> {
        let mut entries = Vec::new();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            if !ENTRY_LINE.is_match(line) {
                return Err(anyhow!(
                    "Invalid glossary line {}: '{}' (expected 'source:target')",
                    number + 1,
                    line
                ));
            }

            if let Some((source, target)) = line.split_once(':') {
                let source = source.trim();
                let target = target.trim();
                if source.is_empty() || target.is_empty() {
                    return Err(anyhow!("Invalid glossary line {}: empty term", number + 1));
                }
                entries.push(GlossaryEntry {
                    source: source.to_string(),
                    target: target.to_string(),
                });
            }
        }

        entries.sort_by(|a, b| b.source.chars().count().cmp(&a.source.chars().count()));
        Ok(Self { entries })
    }

    /// Load a glossary file; only `.txt` files are accepted
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let is_txt = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if !is_txt {
            return Err(anyhow!("Glossary must be a .txt file: {}", path.display()));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read glossary: {}", path.display()))?;
        let glossary = Self::parse(&content)
            .with_context(|| format!("Failed to parse glossary: {}", path.display()))?;

        info!("Loaded {} glossary entries from {}", glossary.len(), path.display());
        Ok(glossary)
    }

    /// Apply every replacement to `text`
    pub fn apply(&self, text: &str) -> String {
        let mut result = text.to_string();
        for entry in &self.entries {
            if result.contains(&entry.source) {
                debug!("Glossary: '{}' -> '{}'", entry.source, entry.target);
                result = result.replace(&entry.source, &entry.target);
            }
        }
        result
    }

    /// Entries, longest source first
    pub fn entries(&self) -> &[GlossaryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
