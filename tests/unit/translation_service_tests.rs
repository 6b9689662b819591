/*!
 * Tests for fragment translation and batching through the public API
 */

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use epubwai::cancel::CancelToken;
use epubwai::errors::TranslationError;
use epubwai::providers::mock::MockProvider;
use epubwai::translation::{FragmentBatch, RetrySettings, TranslationService};
use crate::common;

fn texts(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// A service built from configuration uses the configured endpoints
#[test]
fn test_from_config_with_provider_shouldUseConfiguredEndpoints() -> Result<()> {
    let service = TranslationService::from_config_with_provider(
        &common::test_config(),
        Arc::new(MockProvider::working()),
        CancelToken::new(),
    )?;

    assert_eq!(service.provider_name(), "mock");
    assert_eq!(service.endpoints(), &["A".to_string(), "B".to_string()]);
    assert!(service.cache().is_enabled());

    Ok(())
}

/// A missing glossary file is a configuration error
#[test]
fn test_from_config_with_provider_withMissingGlossary_shouldFail() {
    let mut config = common::test_config();
    config.translation.common.glossary_path = Some("/nonexistent/glossary.txt".to_string());

    let result = TranslationService::from_config_with_provider(
        &config,
        Arc::new(MockProvider::working()),
        CancelToken::new(),
    );

    assert!(result.is_err());
}

/// Fragments spread over the endpoints and come back in input order
#[tokio::test]
async fn test_translate_all_shouldStartFragmentsOnAlternatingEndpoints() -> Result<()> {
    let provider = MockProvider::working();
    let service = TranslationService::new(
        Arc::new(provider.clone()),
        texts(&["A", "B"]),
        RetrySettings::immediate(3, 2),
        CancelToken::new(),
    )?;
    let batch = FragmentBatch::new(service, 4);
    let progress = Arc::new(AtomicUsize::new(0));
    let seen = progress.clone();

    let results = batch
        .translate_all(&texts(&["one", "two", "three", "four"]), "de", move |done, total| {
            assert_eq!(total, 4);
            seen.fetch_max(done, Ordering::SeqCst);
        })
        .await;

    let translated: Vec<String> = results.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(translated, vec!["[de] one", "[de] two", "[de] three", "[de] four"]);
    assert_eq!(progress.load(Ordering::SeqCst), 4);

    for call in provider.calls() {
        let expected = match call.text.as_str() {
            "one" | "three" => "A",
            _ => "B",
        };
        assert_eq!(call.endpoint, expected, "wrong start endpoint for '{}'", call.text);
    }

    Ok(())
}

/// One exhausted fragment does not hide the others' translations
#[tokio::test]
async fn test_translate_all_withOneFailingText_shouldReportOnlyThatFragment() -> Result<()> {
    let service = TranslationService::new(
        Arc::new(MockProvider::working().failing_on("broken")),
        texts(&["A"]),
        RetrySettings::immediate(2, 2),
        CancelToken::new(),
    )?;
    let batch = FragmentBatch::new(service, 2);

    let results = batch
        .translate_all(&texts(&["fine", "broken text", "also fine"]), "it", |_, _| {})
        .await;

    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(TranslationError::Exhausted { attempts: 2, .. })));
    assert_eq!(results[2].as_ref().unwrap(), "[it] also fine");

    Ok(())
}

/// Nothing is requested once the job is cancelled
#[tokio::test]
async fn test_translate_all_whenCancelled_shouldReturnCancelledResults() -> Result<()> {
    let provider = MockProvider::working();
    let cancel = CancelToken::new();
    let service = TranslationService::new(
        Arc::new(provider.clone()),
        texts(&["A"]),
        RetrySettings::default(),
        cancel.clone(),
    )?;
    cancel.cancel();

    let results = FragmentBatch::new(service, 2)
        .translate_all(&texts(&["one", "two"]), "fr", |_, _| {})
        .await;

    assert!(results.iter().all(|r| matches!(r, Err(TranslationError::Cancelled))));
    assert_eq!(provider.request_count(), 0);

    Ok(())
}

/// The service is usable from synchronous code through a blocking runtime
#[test]
fn test_translate_fragment_fromBlockingContext_shouldSucceed() -> Result<()> {
    let service = TranslationService::new(
        Arc::new(MockProvider::working()),
        texts(&["A"]),
        RetrySettings::immediate(1, 1),
        CancelToken::new(),
    )?;

    let translated = tokio_test::block_on(service.translate_fragment("Good night", "es", 0))?;

    assert_eq!(translated, "[es] Good night");

    Ok(())
}
