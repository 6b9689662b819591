use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for destination language codes
///
/// Translation backends take Google-style tags: an ISO 639-1 primary
/// subtag with an optional region ("fr", "zh-cn", "pt-BR"). This module
/// validates them and maps them to names and writing systems.

/// Writing system a language is normally written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Latin,
    Han,
    Kana,
    Hangul,
    Cyrillic,
    Arabic,
    Hebrew,
    Greek,
    Thai,
    Devanagari,
}

/// Google uses a few pre-2005 codes that isolang no longer knows
fn legacy_alias(primary: &str) -> &str {
    match primary {
        "iw" => "he",
        "jw" => "jv",
        "in" => "id",
        _ => primary,
    }
}

/// Lowercased primary subtag of a tag ("zh-CN" -> "zh")
pub fn primary_subtag(code: &str) -> String {
    let normalized = code.trim().to_lowercase();
    let primary = normalized
        .split(['-', '_'])
        .next()
        .unwrap_or_default();
    legacy_alias(primary).to_string()
}

/// Validate a destination language tag and return its ISO language
pub fn validate_language_code(code: &str) -> Result<Language> {
    let primary = primary_subtag(code);

    let language = match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => Language::from_639_3(&primary),
        _ => None,
    };

    language.ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Get the English language name from a tag
pub fn get_language_name(code: &str) -> Result<String> {
    let lang = validate_language_code(code)?;
    Ok(lang.to_name().to_string())
}

/// Check if two tags name the same language, ignoring region
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (validate_language_code(code1), validate_language_code(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Writing system of a destination language, if known
pub fn script_for_language(code: &str) -> Option<Script> {
    let script = match primary_subtag(code).as_str() {
        "zh" => Script::Han,
        "ja" => Script::Kana,
        "ko" => Script::Hangul,
        "ru" | "uk" | "be" | "bg" | "sr" | "mk" | "kk" | "mn" => Script::Cyrillic,
        "ar" | "fa" | "ur" | "ps" => Script::Arabic,
        "he" | "yi" => Script::Hebrew,
        "el" => Script::Greek,
        "th" => Script::Thai,
        "hi" | "mr" | "ne" => Script::Devanagari,
        "en" | "fr" | "de" | "es" | "it" | "pt" | "nl" | "sv" | "da" | "no" | "fi" | "pl"
        | "cs" | "sk" | "ro" | "hu" | "tr" | "id" | "ms" | "vi" | "hr" | "sl" | "et" | "lv"
        | "lt" | "jv" | "ca" | "ga" | "cy" | "sq" | "af" | "sw" | "tl" | "eu" | "gl" => {
            Script::Latin
        }
        _ => return None,
    };

    Some(script)
}
