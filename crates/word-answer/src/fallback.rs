//! Caller-level fallback for content-policy rejections.

use tracing::warn;

use word_core::Result;

use crate::service::{Answer, RetrievalService};

/// Answer `query`, retrying once with `fallback_query` if the generation
/// provider rejects the prompt under its content policy.
///
/// Any other error, and any error from the retry, is returned as is.
pub async fn answer_with_fallback(
    service: &RetrievalService,
    query: &str,
    fallback_query: &str,
) -> Result<Answer> {
    match service.answer(query).await {
        Err(e) if e.is_content_policy() => {
            warn!(
                "Generation rejected for {:?} ({}), retrying with {:?}",
                query, e, fallback_query
            );
            service.answer(fallback_query).await
        }
        other => other,
    }
}

/// Text-only form of [`answer_with_fallback`].
pub async fn generate_with_fallback(
    service: &RetrievalService,
    query: &str,
    fallback_query: &str,
) -> Result<String> {
    Ok(answer_with_fallback(service, query, fallback_query).await?.text)
}
