/*!
 * "Already translated" detection.
 *
 * A chapter whose prose is already in the destination language is marked
 * completed without calling the provider. The check is a trait so jobs can
 * swap the heuristic; `ScriptCheck` looks at the writing system of the
 * letters, `NeverTranslated` disables the shortcut.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::language_utils::{Script, script_for_language};

/// Share of letters that must be in the destination script
pub const DEFAULT_SCRIPT_THRESHOLD: f64 = 0.9;

static LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}").expect("valid regex"));

static HAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Han}").expect("valid regex"));
static KANA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{Hiragana}\p{Katakana}\p{Han}]").expect("valid regex"));
static HANGUL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{Hangul}\p{Han}]").expect("valid regex"));
static CYRILLIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Cyrillic}").expect("valid regex"));
static ARABIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Arabic}").expect("valid regex"));
static HEBREW: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Hebrew}").expect("valid regex"));
static GREEK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Greek}").expect("valid regex"));
static THAI: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Thai}").expect("valid regex"));
static DEVANAGARI: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Devanagari}").expect("valid regex"));

/// Decides whether a chapter's text is already in the destination language
pub trait TranslatedCheck: Send + Sync {
    /// `text` is the chapter's prose, `target_language` the destination tag
    fn is_translated(&self, text: &str, target_language: &str) -> bool;
}

/// Never skips a chapter
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverTranslated;

impl TranslatedCheck for NeverTranslated {
    fn is_translated(&self, _text: &str, _target_language: &str) -> bool {
        false
    }
}

/// Skips chapters written mostly in the destination's non-Latin script
#[derive(Debug, Clone, Copy)]
pub struct ScriptCheck {
    threshold: f64,
}

impl ScriptCheck {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Fraction of letters in `text` that belong to `script`, `None` without letters
    pub fn script_ratio(text: &str, script: Script) -> Option<f64> {
        let pattern: &Regex = match script {
            Script::Latin => return None,
            Script::Han => &*HAN,
            Script::Kana => &*KANA,
            Script::Hangul => &*HANGUL,
            Script::Cyrillic => &*CYRILLIC,
            Script::Arabic => &*ARABIC,
            Script::Hebrew => &*HEBREW,
            Script::Greek => &*GREEK,
            Script::Thai => &*THAI,
            Script::Devanagari => &*DEVANAGARI,
        };

        let letters = LETTER.find_iter(text).count();
        if letters == 0 {
            return None;
        }

        let in_script = pattern.find_iter(text).count();
        Some(in_script as f64 / letters as f64)
    }
}

impl Default for ScriptCheck {
    fn default() -> Self {
        Self::new(DEFAULT_SCRIPT_THRESHOLD)
    }
}

impl TranslatedCheck for ScriptCheck {
    fn is_translated(&self, text: &str, target_language: &str) -> bool {
        // Latin destinations cannot be told apart from Latin sources by script
        let Some(script) = script_for_language(target_language) else {
            return false;
        };

        Self::script_ratio(text, script)
            .map(|ratio| ratio >= self.threshold)
            .unwrap_or(false)
    }
}
