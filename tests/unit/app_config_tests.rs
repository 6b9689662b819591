/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;
use std::str::FromStr;

use epubwai::app_config::{Config, LogLevel, TranslationMode, TranslationProvider};
use crate::common;

/// The default configuration targets simplified Chinese through Google
#[test]
fn test_default_config_shouldUseGoogleAndReplaceMode() {
    let config = Config::default();

    assert_eq!(config.target_language, "zh-cn");
    assert_eq!(config.translation.provider, TranslationProvider::Google);
    assert_eq!(config.job.mode, TranslationMode::Replace);
    assert!(!config.translation.get_endpoints().is_empty());
    assert!(config.validate().is_ok());
}

/// A config file with only a few keys gets defaults for the rest
#[test]
fn test_from_file_withPartialJson_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{ "target_language": "ja", "job": { "mode": "bilingual", "chapter_workers": 8 } }"#,
    )?;

    let config = Config::from_file(path.to_str().unwrap())?;

    assert_eq!(config.target_language, "ja");
    assert_eq!(config.job.mode, TranslationMode::Bilingual);
    assert_eq!(config.job.chapter_workers, 8);
    assert_eq!(config.job.output_suffix, Config::default().job.output_suffix);
    assert_eq!(config.translation.common.max_attempts, Config::default().translation.common.max_attempts);

    Ok(())
}

/// Saving and loading keeps overridden values
#[test]
fn test_save_to_file_thenLoad_shouldRoundTripOverrides() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");
    let mut config = common::test_config();
    config.translation.common.glossary_path = Some("names.txt".to_string());

    config.save_to_file(path.to_str().unwrap())?;
    let loaded = Config::from_file(path.to_str().unwrap())?;

    assert_eq!(loaded.target_language, "fr");
    assert_eq!(loaded.translation.get_endpoints(), vec!["A", "B"]);
    assert_eq!(loaded.translation.common.glossary_path.as_deref(), Some("names.txt"));
    assert_eq!(loaded.job.chapter_cooldown_max_ms, 0);

    Ok(())
}

/// Malformed JSON is reported, not defaulted
#[test]
fn test_from_file_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;

    assert!(Config::from_file(path.to_str().unwrap()).is_err());

    Ok(())
}

/// Unknown target languages are rejected up front
#[test]
fn test_validate_withUnknownLanguage_shouldFail() {
    let mut config = common::test_config();
    config.target_language = "klingon".to_string();

    assert!(config.validate().is_err());
}

/// Option values accept the spellings the command line offers
#[test]
fn test_fromStr_shouldParseOptionValues() {
    assert_eq!(TranslationProvider::from_str("Zhipu").unwrap(), TranslationProvider::Zhipu);
    assert_eq!(TranslationMode::from_str("2").unwrap(), TranslationMode::Bilingual);
    assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
    assert_eq!(LogLevel::Debug.to_level_filter(), log::LevelFilter::Debug);
    assert!(TranslationProvider::from_str("babelfish").is_err());
}
