use thiserror::Error;

/// Failures a matching run can observe. Only `InvalidPolicy` ever reaches the caller
/// of `rank_candidates`; the others are recovered inside the stage that hit them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("{provider} provider unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    #[error("malformed expansion response: {0}")]
    MalformedExpansionResponse(String),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
}

impl MatchError {
    pub fn provider(provider: &str, reason: impl std::fmt::Display) -> Self {
        MatchError::ProviderUnavailable {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }
}
