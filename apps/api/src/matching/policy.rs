//! Matching policy — the caller-supplied bundle of thresholds, weights and limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::matching::budget::CallBudget;
use crate::matching::error::MatchError;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;
/// Upper bounds on a caller-supplied call budget.
const MAX_CALL_RETRIES: u32 = 10;
const MAX_CALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Skill/semantic split for the semantic matcher. Must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SemanticWeights {
    pub skill_weight: f64,
    pub semantic_weight: f64,
}

impl Default for SemanticWeights {
    fn default() -> Self {
        Self {
            skill_weight: 0.4,
            semantic_weight: 0.6,
        }
    }
}

/// Per-factor weights for the ranker. Callers should normalise them to sum to 1;
/// the ranker itself does not check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    pub skills: f64,
    pub experience: f64,
    pub location: f64,
    pub education: f64,
    pub availability: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            skills: 0.40,
            experience: 0.25,
            location: 0.15,
            education: 0.10,
            availability: 0.10,
        }
    }
}

impl RankingWeights {
    fn values(&self) -> [(&'static str, f64); 5] {
        [
            ("skills", self.skills),
            ("experience", self.experience),
            ("location", self.location),
            ("education", self.education),
            ("availability", self.availability),
        ]
    }
}

/// Which matcher a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatcherKind {
    /// Skill overlap blended with embedding similarity, soft threshold.
    Semantic {
        threshold: f64,
        #[serde(default)]
        weights: SemanticWeights,
    },
    /// Independent skill and experience gates, fixed 60/40 blend.
    HardGate {
        min_skill_match: f64,
        min_experience_match: f64,
    },
    /// Semantic first; a lenient hard gate when the semantic stage keeps nobody.
    Hybrid {
        threshold: f64,
        #[serde(default)]
        weights: SemanticWeights,
        #[serde(default = "default_fallback_gate")]
        fallback_min_skill_match: f64,
        #[serde(default = "default_fallback_gate")]
        fallback_min_experience_match: f64,
    },
}

fn default_fallback_gate() -> f64 {
    0.1
}

fn default_sources() -> Vec<String> {
    ["naukri", "linkedin", "stackoverflow", "github"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingPolicy {
    pub matcher: MatcherKind,
    /// Balancer budget.
    pub max_results: usize,
    /// Declared source populations, in priority order for remainder slots.
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    pub top_n: usize,
    #[serde(default)]
    pub ranking_weights: RankingWeights,
    #[serde(default)]
    pub expand_requirement: bool,
    #[serde(default)]
    pub call_budget: CallBudget,
    /// Max in-flight provider calls per stage.
    pub concurrency: usize,
}

impl Default for MatchingPolicy {
    fn default() -> Self {
        Self {
            matcher: MatcherKind::Hybrid {
                threshold: 0.3,
                weights: SemanticWeights::default(),
                fallback_min_skill_match: default_fallback_gate(),
                fallback_min_experience_match: default_fallback_gate(),
            },
            max_results: 10,
            sources: default_sources(),
            top_n: 10,
            ranking_weights: RankingWeights::default(),
            expand_requirement: false,
            call_budget: CallBudget::default(),
            concurrency: 8,
        }
    }
}

fn check_unit(name: &str, value: f64) -> Result<(), MatchError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(MatchError::InvalidPolicy(format!(
            "{name} must be within [0, 1], got {value}"
        )));
    }
    Ok(())
}

fn check_semantic_weights(weights: &SemanticWeights) -> Result<(), MatchError> {
    check_unit("skill_weight", weights.skill_weight)?;
    check_unit("semantic_weight", weights.semantic_weight)?;
    let sum = weights.skill_weight + weights.semantic_weight;
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(MatchError::InvalidPolicy(format!(
            "skill_weight + semantic_weight must equal 1, got {sum}"
        )));
    }
    Ok(())
}

impl MatchingPolicy {
    /// Rejects configurations that cannot produce a meaningful run. Called before any
    /// provider is touched.
    pub fn validate(&self) -> Result<(), MatchError> {
        match &self.matcher {
            MatcherKind::Semantic { threshold, weights } => {
                check_unit("threshold", *threshold)?;
                check_semantic_weights(weights)?;
            }
            MatcherKind::HardGate {
                min_skill_match,
                min_experience_match,
            } => {
                check_unit("min_skill_match", *min_skill_match)?;
                check_unit("min_experience_match", *min_experience_match)?;
            }
            MatcherKind::Hybrid {
                threshold,
                weights,
                fallback_min_skill_match,
                fallback_min_experience_match,
            } => {
                check_unit("threshold", *threshold)?;
                check_semantic_weights(weights)?;
                check_unit("fallback_min_skill_match", *fallback_min_skill_match)?;
                check_unit("fallback_min_experience_match", *fallback_min_experience_match)?;
            }
        }

        for (name, weight) in self.ranking_weights.values() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(MatchError::InvalidPolicy(format!(
                    "ranking weight '{name}' must be a non-negative number, got {weight}"
                )));
            }
        }

        if self.max_results == 0 {
            return Err(MatchError::InvalidPolicy("max_results must be > 0".to_string()));
        }
        if self.top_n == 0 {
            return Err(MatchError::InvalidPolicy("top_n must be > 0".to_string()));
        }
        if self.concurrency == 0 {
            return Err(MatchError::InvalidPolicy("concurrency must be > 0".to_string()));
        }
        if self.sources.iter().all(|s| s.trim().is_empty()) {
            return Err(MatchError::InvalidPolicy(
                "at least one source must be declared".to_string(),
            ));
        }
        if self.call_budget.timeout.is_zero() {
            return Err(MatchError::InvalidPolicy(
                "call_budget.timeout must be > 0".to_string(),
            ));
        }
        if self.call_budget.timeout > MAX_CALL_TIMEOUT {
            return Err(MatchError::InvalidPolicy(format!(
                "call_budget.timeout must be at most {}ms, got {}ms",
                MAX_CALL_TIMEOUT.as_millis(),
                self.call_budget.timeout.as_millis()
            )));
        }
        if self.call_budget.max_retries > MAX_CALL_RETRIES {
            return Err(MatchError::InvalidPolicy(format!(
                "call_budget.max_retries must be at most {MAX_CALL_RETRIES}, got {}",
                self.call_budget.max_retries
            )));
        }
        Ok(())
    }
}
