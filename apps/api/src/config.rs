use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::DEFAULT_MODEL;
use crate::matching::budget::CallBudget;
use crate::matching::policy::{MatcherKind, MatchingPolicy};

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub llm_model: String,
    /// When unset, embeddings come from the local hashing embedder.
    pub embedding_api_url: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub port: u16,
    pub rust_log: String,
    pub provider_timeout_secs: u64,
    pub provider_max_retries: u32,
    pub provider_concurrency: usize,
    pub match_threshold: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup, so tests can use a map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            anthropic_api_key: optional("ANTHROPIC_API_KEY").with_context(|| {
                "Required environment variable 'ANTHROPIC_API_KEY' is not set".to_string()
            })?,
            llm_model: optional("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            embedding_api_url: optional("EMBEDDING_API_URL"),
            embedding_api_key: optional("EMBEDDING_API_KEY"),
            embedding_model: optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            port: parse_or(&optional, "PORT", 8080)?,
            rust_log: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            provider_timeout_secs: parse_or(&optional, "PROVIDER_TIMEOUT_SECS", 30)?,
            provider_max_retries: parse_or(&optional, "PROVIDER_MAX_RETRIES", 2)?,
            provider_concurrency: parse_or(&optional, "PROVIDER_CONCURRENCY", 8)?,
            match_threshold: parse_or(&optional, "MATCH_THRESHOLD", 0.3)?,
        })
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Policy used when a match request does not bring its own.
    pub fn default_policy(&self) -> MatchingPolicy {
        let defaults = MatchingPolicy::default();
        let matcher = match defaults.matcher {
            MatcherKind::Hybrid {
                weights,
                fallback_min_skill_match,
                fallback_min_experience_match,
                ..
            } => MatcherKind::Hybrid {
                threshold: self.match_threshold,
                weights,
                fallback_min_skill_match,
                fallback_min_experience_match,
            },
            other => other,
        };
        MatchingPolicy {
            matcher,
            call_budget: CallBudget {
                timeout: self.provider_timeout(),
                max_retries: self.provider_max_retries,
            },
            concurrency: self.provider_concurrency,
            ..defaults
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_only_api_key() {
        let config = Config::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.llm_model, DEFAULT_MODEL);
        assert_eq!(config.embedding_api_url, None);
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.provider_timeout(), Duration::from_secs(30));
        assert_eq!(config.provider_max_retries, 2);
        assert_eq!(config.provider_concurrency, 8);
        assert_eq!(config.match_threshold, 0.3);
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let err = Config::from_lookup(lookup(&[("PORT", "9000")])).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = Config::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("PROVIDER_CONCURRENCY", "lots"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PROVIDER_CONCURRENCY"));
    }

    #[test]
    fn test_blank_optional_values_count_as_unset() {
        let config = Config::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("EMBEDDING_API_URL", "  "),
        ]))
        .unwrap();
        assert_eq!(config.embedding_api_url, None);
    }

    #[test]
    fn test_default_policy_follows_config() {
        let config = Config::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("MATCH_THRESHOLD", "0.45"),
            ("PROVIDER_TIMEOUT_SECS", "5"),
            ("PROVIDER_MAX_RETRIES", "1"),
            ("PROVIDER_CONCURRENCY", "3"),
        ]))
        .unwrap();
        let policy = config.default_policy();
        match policy.matcher {
            MatcherKind::Hybrid { threshold, .. } => assert_eq!(threshold, 0.45),
            other => panic!("expected hybrid matcher, got {other:?}"),
        }
        assert_eq!(policy.call_budget.timeout, Duration::from_secs(5));
        assert_eq!(policy.call_budget.max_retries, 1);
        assert_eq!(policy.concurrency, 3);
        assert!(policy.validate().is_ok());
    }
}
