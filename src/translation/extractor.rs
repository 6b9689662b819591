/*!
 * Translatable fragment extraction.
 *
 * A fragment is a text node whose immediate parent element is on the tag
 * allow-list and whose trimmed text contains at least one Latin letter and
 * is not purely numeric. Extraction is a single pre-order pass with no I/O.
 */

use markup5ever_rcdom::{Handle, NodeData};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static LATIN_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z]").expect("valid regex"));
static DIGITS_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("valid regex"));

/// One translatable text node
#[derive(Clone)]
pub struct Fragment {
    /// The owning text node
    pub node: Handle,
    /// Trimmed text sent for translation
    pub text: String,
    /// Whitespace before the text in the original node
    pub leading: String,
    /// Whitespace after the text in the original node
    pub trailing: String,
}

impl std::fmt::Debug for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fragment").field("text", &self.text).finish()
    }
}

impl Fragment {
    /// Replace the node's text, keeping the original surrounding whitespace
    pub fn replace_text(&self, replacement: &str) {
        if let NodeData::Text { ref contents } = self.node.data {
            let value = format!("{}{}{}", self.leading, replacement, self.trailing);
            *contents.borrow_mut() = value.as_str().into();
        }
    }

    /// Current text of the node
    pub fn current_text(&self) -> String {
        match self.node.data {
            NodeData::Text { ref contents } => contents.borrow().to_string(),
            _ => String::new(),
        }
    }
}

/// Whether trimmed text is worth translating
pub fn is_translatable(text: &str) -> bool {
    let trimmed = text.trim();
    LATIN_LETTER.is_match(trimmed) && !DIGITS_ONLY.is_match(trimmed)
}

/// Collects fragments below a document root
#[derive(Debug, Clone)]
pub struct FragmentExtractor {
    allowed_tags: HashSet<String>,
}

impl FragmentExtractor {
    /// Create an extractor for the given element names (case-insensitive)
    pub fn new<S: AsRef<str>>(allowed_tags: &[S]) -> Self {
        Self {
            allowed_tags: allowed_tags
                .iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Ordered fragments of the tree rooted at `root`
    pub fn extract(&self, root: &Handle) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        self.visit(root, None, &mut fragments);
        fragments
    }

    fn visit(&self, node: &Handle, parent_tag: Option<&str>, out: &mut Vec<Fragment>) {
        match node.data {
            NodeData::Text { ref contents } => {
                let allowed = parent_tag
                    .map(|tag| self.allowed_tags.contains(tag))
                    .unwrap_or(false);
                if !allowed {
                    return;
                }

                let contents = contents.borrow();
                let raw: &str = &contents;
                if !is_translatable(raw) {
                    return;
                }

                let text = raw.trim();
                let start = raw.len() - raw.trim_start().len();
                let end = start + text.len();
                out.push(Fragment {
                    node: node.clone(),
                    text: text.to_string(),
                    leading: raw[..start].to_string(),
                    trailing: raw[end..].to_string(),
                });
            }
            NodeData::Element { ref name, .. } => {
                let tag = name.local.to_lowercase();
                for child in node.children.borrow().iter() {
                    self.visit(child, Some(tag.as_str()), out);
                }
            }
            _ => {
                for child in node.children.borrow().iter() {
                    self.visit(child, None, out);
                }
            }
        }
    }
}
