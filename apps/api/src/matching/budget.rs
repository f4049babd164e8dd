//! Timeout + retry wrapper for provider calls.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::embedding::EmbeddingError;
use crate::llm_client::LlmError;
use crate::matching::error::MatchError;

const BACKOFF_BASE_MS: u64 = 250;

/// Per-call limits chosen by the caller of a matching run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CallBudget {
    /// Applied to each attempt separately.
    #[serde(with = "millis")]
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
}

impl Default for CallBudget {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Whether a failed attempt may succeed if repeated.
pub trait Retryable: std::fmt::Display {
    fn is_retryable(&self) -> bool;
}

/// Rate limits and server errors are transient; other statuses are not.
fn retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

impl Retryable for LlmError {
    fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(_) => true,
            LlmError::Api { status, .. } => retryable_status(*status),
            LlmError::Parse(_) | LlmError::EmptyContent => false,
        }
    }
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::Http(_) => true,
            EmbeddingError::Api { status, .. } => retryable_status(*status),
            EmbeddingError::Parse(_)
            | EmbeddingError::CountMismatch { .. }
            | EmbeddingError::Empty => false,
        }
    }
}

/// Runs `op` until it succeeds, each attempt bounded by `budget.timeout`, with
/// exponential backoff (250ms, 500ms, 1s, ...) between attempts.
///
/// Timeouts and retryable errors consume the budget; a non-retryable error stops
/// immediately. Either way the failure is `MatchError::ProviderUnavailable`
/// labelled `provider`.
pub async fn call_with_budget<T, E, F, Fut>(
    budget: CallBudget,
    provider: &str,
    mut op: F,
) -> Result<T, MatchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable,
{
    let mut last_error = String::new();

    for attempt in 0..=budget.max_retries {
        if attempt > 0 {
            let delay = Duration::from_millis(BACKOFF_BASE_MS << (attempt - 1).min(6));
            warn!(
                "{} call attempt {} failed ({}), retrying after {}ms...",
                provider,
                attempt,
                last_error,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        match tokio::time::timeout(budget.timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if !e.is_retryable() => {
                return Err(MatchError::provider(
                    provider,
                    format!("attempt {} failed with non-retryable error: {}", attempt + 1, e),
                ));
            }
            Ok(Err(e)) => last_error = e.to_string(),
            Err(_) => last_error = format!("timed out after {}ms", budget.timeout.as_millis()),
        }
    }

    Err(MatchError::provider(
        provider,
        format!(
            "{} attempt(s) failed, last error: {}",
            budget.max_retries + 1,
            last_error
        ),
    ))
}
