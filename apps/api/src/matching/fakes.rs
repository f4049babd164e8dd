//! Test doubles for the provider traits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::embedding::{Embedder, EmbeddingError, HashEmbedder};
use crate::llm_client::{ChatMessage, LlmError, TextGenerator};
use crate::models::CandidateRecord;

pub fn candidate(id: &str, source: &str, skills: &[&str], years: Option<u32>) -> CandidateRecord {
    CandidateRecord {
        id: id.to_string(),
        name: format!("Candidate {id}"),
        current_title: None,
        skills: skills.iter().map(|s| s.to_string()).collect(),
        experience_years: years,
        education: None,
        location: None,
        source: source.to_string(),
        summary: None,
        profile_url: None,
        extra: HashMap::new(),
    }
}

/// Hash embedder that refuses any text containing `poison`, and can refuse batches.
pub struct FlakyEmbedder {
    inner: HashEmbedder,
    poison: Option<String>,
    fail_batches: bool,
    pub single_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
}

impl FlakyEmbedder {
    pub fn healthy() -> Self {
        Self {
            inner: HashEmbedder::default(),
            poison: None,
            fail_batches: false,
            single_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
        }
    }

    pub fn poisoned(marker: &str) -> Self {
        Self {
            poison: Some(marker.to_string()),
            ..Self::healthy()
        }
    }

    pub fn without_batches(mut self) -> Self {
        self.fail_batches = true;
        self
    }
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = &self.poison {
            if text.contains(marker.as_str()) {
                return Err(EmbeddingError::Api {
                    status: 500,
                    message: format!("cannot embed text containing {marker}"),
                });
            }
        }
        self.inner.embed(text).await
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_batches {
            return Err(EmbeddingError::Api {
                status: 503,
                message: "batch endpoint down".to_string(),
            });
        }
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Always fails, as if the embedding service were down.
pub struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Api {
            status: 503,
            message: "service unavailable".to_string(),
        })
    }

    fn name(&self) -> &str {
        "down"
    }
}

/// Returns a fixed response and records every prompt it was sent.
pub struct ScriptedGenerator {
    response: Result<String, String>,
    delay: Option<Duration>,
    pub prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedGenerator {
    pub fn replying(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn slow(response: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::replying(response)
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(messages.to_vec());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone().map_err(|message| LlmError::Api {
            status: 500,
            message,
        })
    }
}
