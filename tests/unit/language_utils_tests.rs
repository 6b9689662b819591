/*!
 * Tests for destination language utilities
 */

use epubwai::language_utils::{
    get_language_name, language_codes_match, primary_subtag, script_for_language,
    validate_language_code, Script,
};

/// Region tags resolve to their base language
#[test]
fn test_get_language_name_withRegionTag_shouldReturnBaseName() {
    assert_eq!(get_language_name("zh-cn").unwrap(), "Chinese");
    assert_eq!(get_language_name("pt_BR").unwrap(), "Portuguese");
    assert_eq!(get_language_name("fr").unwrap(), "French");
}

/// Three letter codes are accepted too
#[test]
fn test_validate_language_code_withThreeLetterCode_shouldSucceed() {
    assert!(validate_language_code("deu").is_ok());
    assert!(validate_language_code("q").is_err());
}

#[test]
fn test_primary_subtag_shouldNormalizeCaseAndLegacyCodes() {
    assert_eq!(primary_subtag(" ZH-TW "), "zh");
    assert_eq!(primary_subtag("in"), "id");
}

#[test]
fn test_language_codes_match_withDifferentCase_shouldMatch() {
    assert!(language_codes_match("JA", "ja-JP"));
    assert!(!language_codes_match("ja", "invalid"));
}

/// Scripts drive the already-translated check
#[test]
fn test_script_for_language_shouldCoverNonLatinTargets() {
    assert_eq!(script_for_language("ja"), Some(Script::Kana));
    assert_eq!(script_for_language("ko-KR"), Some(Script::Hangul));
    assert_eq!(script_for_language("ar"), Some(Script::Arabic));
    assert_eq!(script_for_language("de"), Some(Script::Latin));
}
