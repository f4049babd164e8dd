use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::candidate::CandidateRecord;

/// Scores for one (requirement, candidate) pair. Built once and never mutated;
/// rescoring produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub candidate_id: String,
    pub skill_score: f64,
    /// Only present when the semantic matcher produced the result.
    pub semantic_score: Option<f64>,
    pub experience_score: f64,
    pub combined_score: f64,
    pub matched_skills: BTreeSet<String>,
    pub missing_skills: BTreeSet<String>,
    /// max(0, required years - candidate years)
    pub experience_gap: u32,
}

/// A candidate that survived a matcher, carried with its effective canonical skills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedCandidate {
    pub candidate: CandidateRecord,
    /// Canonical skills used for scoring (explicit, or inferred from title/summary).
    pub skills: BTreeSet<String>,
    pub result: MatchResult,
}

impl MatchedCandidate {
    pub fn combined_score(&self) -> f64 {
        self.result.combined_score
    }
}

/// Per-factor view of a ranked candidate's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub skills_match: f64,
    pub experience_match: f64,
    pub location_match: f64,
    pub education_match: f64,
    pub availability: f64,
    /// Combined score the matcher assigned before ranking.
    pub match_stage_score: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub candidate: CandidateRecord,
    pub match_score: f64,
    pub breakdown: ScoreBreakdown,
    pub reasoning: String,
}

/// The stage that dropped a candidate from a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
    Semantic,
    HardGate,
    Balance,
    Rank,
}

/// Why a candidate is missing from the shortlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub candidate_id: String,
    pub stage: MatchStage,
    pub reason: String,
}

impl Exclusion {
    pub fn new(candidate_id: impl Into<String>, stage: MatchStage, reason: impl Into<String>) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            stage,
            reason: reason.into(),
        }
    }
}
