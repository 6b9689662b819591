/*!
 * Concurrent fragment dispatch.
 *
 * All fragments of one chapter are translated concurrently, bounded by the
 * job's fragment worker count. Fragment `i` starts on endpoint `i` modulo
 * the endpoint count, so concurrent requests spread across the variants.
 * Results come back in fragment order whatever order they finished in.
 */

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

use crate::errors::TranslationError;

use super::core::TranslationService;

/// Per-fragment results, in input order
pub type FragmentResults = Vec<Result<String, TranslationError>>;

/// Translates a set of fragment texts under a concurrency bound
#[derive(Clone)]
pub struct FragmentBatch {
    service: TranslationService,
    max_concurrent_requests: usize,
}

impl FragmentBatch {
    /// Create a batch runner with at most `max_concurrent_requests` in flight
    pub fn new(service: TranslationService, max_concurrent_requests: usize) -> Self {
        Self {
            service,
            max_concurrent_requests: max_concurrent_requests.max(1),
        }
    }

    pub fn service(&self) -> &TranslationService {
        &self.service
    }

    /// Translate every text; `progress_callback(done, total)` fires as fragments resolve
    pub async fn translate_all(
        &self,
        texts: &[String],
        target_language: &str,
        progress_callback: impl Fn(usize, usize) + Clone,
    ) -> FragmentResults {
        let total = texts.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_requests));
        let processed = Arc::new(AtomicUsize::new(0));
        let endpoint_count = self.service.endpoint_count().max(1);

        let mut results = stream::iter(texts.iter().enumerate())
            .map(|(index, text)| {
                let service = self.service.clone();
                let semaphore = semaphore.clone();
                let processed = processed.clone();
                let progress_callback = progress_callback.clone();

                async move {
                    let result = match semaphore.acquire().await {
                        Ok(_permit) => {
                            // Nothing new starts once the job is cancelled
                            if service.cancel_token().is_cancelled() {
                                Err(TranslationError::Cancelled)
                            } else {
                                service
                                    .translate_fragment(text, target_language, index % endpoint_count)
                                    .await
                            }
                        }
                        Err(_) => Err(TranslationError::Cancelled),
                    };

                    let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(done, total);

                    (index, result)
                }
            })
            .buffer_unordered(self.max_concurrent_requests)
            .collect::<Vec<_>>()
            .await;

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }
}
