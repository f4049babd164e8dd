//! Requirement Expander — related titles and a broader skill list from one LLM call.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{strip_json_fences, ChatMessage, TextGenerator};
use crate::matching::budget::{call_with_budget, CallBudget};
use crate::matching::error::MatchError;
use crate::matching::prompts::{EXPANSION_PROMPT_TEMPLATE, EXPANSION_SYSTEM};

const EXPANSION_MAX_TOKENS: u32 = 1000;
const EXPANSION_TEMPERATURE: f32 = 0.5;
const MAX_TITLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedRequirement {
    pub job_titles: Vec<String>,
    pub skills: Vec<String>,
}

impl ExpandedRequirement {
    /// The unexpanded input, returned whenever expansion fails.
    pub fn unchanged(title: &str, skills: &[String]) -> Self {
        Self {
            job_titles: vec![title.to_string()],
            skills: skills.to_vec(),
        }
    }
}

/// Both fields are required; a response missing either is malformed.
#[derive(Debug, Deserialize)]
struct RawExpansion {
    job_titles: Vec<String>,
    skills: Vec<String>,
}

/// Number of skills to ask for on top of the originals: ~27.5%, at least 2.
pub fn additional_skill_target(original: usize) -> usize {
    ((original as f64 * 0.275) as usize).max(2)
}

/// Trims, drops blanks and removes duplicates (case-insensitive), keeping first spellings.
fn dedupe(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .collect()
}

/// Parses the provider's reply and applies the output guarantees: the original title
/// is present (first, when the reply left it out), every original skill is present,
/// no duplicates, at most five titles.
pub fn parse_expansion(
    raw: &str,
    title: &str,
    skills: &[String],
) -> Result<ExpandedRequirement, MatchError> {
    let parsed: RawExpansion = serde_json::from_str(strip_json_fences(raw))
        .map_err(|e| MatchError::MalformedExpansionResponse(e.to_string()))?;

    let mut job_titles = dedupe(parsed.job_titles);
    let title_key = title.trim().to_lowercase();
    match job_titles.iter().position(|t| t.to_lowercase() == title_key) {
        Some(idx) if idx < MAX_TITLES => {}
        Some(idx) => {
            let original = job_titles.remove(idx);
            job_titles.insert(0, original);
        }
        None => job_titles.insert(0, title.trim().to_string()),
    }
    job_titles.truncate(MAX_TITLES);

    let skills = dedupe(parsed.skills.into_iter().chain(skills.iter().cloned()));

    Ok(ExpandedRequirement { job_titles, skills })
}

pub struct RequirementExpander<'a> {
    generator: &'a dyn TextGenerator,
    budget: CallBudget,
}

impl<'a> RequirementExpander<'a> {
    pub fn new(generator: &'a dyn TextGenerator, budget: CallBudget) -> Self {
        Self { generator, budget }
    }

    /// Strict variant: surfaces provider and parse failures.
    pub async fn try_expand(
        &self,
        title: &str,
        skills: &[String],
    ) -> Result<ExpandedRequirement, MatchError> {
        let prompt = EXPANSION_PROMPT_TEMPLATE
            .replace("{title}", title)
            .replace("{skills}", &skills.join(", "))
            .replace("{additional}", &additional_skill_target(skills.len()).to_string());
        let messages = [
            ChatMessage::system(format!("{EXPANSION_SYSTEM} {JSON_ONLY_SYSTEM}")),
            ChatMessage::user(prompt),
        ];

        let raw = call_with_budget(self.budget, "generative-text", || {
            self.generator
                .complete(&messages, EXPANSION_MAX_TOKENS, EXPANSION_TEMPERATURE)
        })
        .await?;

        parse_expansion(&raw, title, skills)
    }

    /// Never fails: any error returns `{job_titles: [title], skills}` unchanged.
    pub async fn expand(&self, title: &str, skills: &[String]) -> ExpandedRequirement {
        info!("Expanding '{}' ({} skills)", title, skills.len());
        match self.try_expand(title, skills).await {
            Ok(expanded) => {
                info!(
                    "Expanded to {} job titles and {} skills (+{} new)",
                    expanded.job_titles.len(),
                    expanded.skills.len(),
                    expanded.skills.len().saturating_sub(skills.len())
                );
                expanded
            }
            Err(e) => {
                warn!("Requirement expansion failed, keeping the original: {e}");
                ExpandedRequirement::unchanged(title, skills)
            }
        }
    }
}
