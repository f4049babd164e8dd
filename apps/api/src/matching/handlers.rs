//! Axum route handlers for the Matching API.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::matching::expander::{ExpandedRequirement, RequirementExpander};
use crate::matching::pipeline::{rank_candidates, run_pipeline, Providers, ShortlistReport};
use crate::matching::policy::MatchingPolicy;
use crate::matching::skills::{SkillCanonicalizer, SkillMatrix};
use crate::models::{CandidateRecord, RankedCandidate, Requirement};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub requirement: Requirement,
    #[serde(default)]
    pub candidates: Vec<CandidateRecord>,
    /// Falls back to the service default built from config.
    #[serde(default)]
    pub policy: Option<MatchingPolicy>,
}

#[derive(Debug, Deserialize)]
pub struct ExpandRequest {
    pub title: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

fn require_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/match
///
/// Runs the full pipeline over the inline candidate pool. Nothing is stored.
pub async fn handle_match(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<ShortlistReport>, AppError> {
    require_title(&request.requirement.title)?;

    let policy = request
        .policy
        .unwrap_or_else(|| state.config.default_policy());
    let providers = Providers {
        embedder: state.embedder.as_ref(),
        generator: state.llm.as_ref(),
    };

    let report = run_pipeline(&request.requirement, &request.candidates, &policy, providers).await?;
    Ok(Json(report))
}

/// POST /api/v1/shortlist
///
/// Same run as /match, returning only the ranked candidates.
pub async fn handle_shortlist(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<Vec<RankedCandidate>>, AppError> {
    require_title(&request.requirement.title)?;

    let policy = request
        .policy
        .unwrap_or_else(|| state.config.default_policy());
    let providers = Providers {
        embedder: state.embedder.as_ref(),
        generator: state.llm.as_ref(),
    };

    let shortlist =
        rank_candidates(&request.requirement, &request.candidates, &policy, providers).await?;
    Ok(Json(shortlist))
}

/// POST /api/v1/expand
///
/// Related titles and an enlarged skill list. Degrades to the input on provider failure.
pub async fn handle_expand(
    State(state): State<AppState>,
    Json(request): Json<ExpandRequest>,
) -> Result<Json<ExpandedRequirement>, AppError> {
    require_title(&request.title)?;

    let budget = state.config.default_policy().call_budget;
    let expander = RequirementExpander::new(state.llm.as_ref(), budget);
    Ok(Json(expander.expand(&request.title, &request.skills).await))
}

/// POST /api/v1/skills/matrix
///
/// Canonical requirement skills bucketed by category.
pub async fn handle_skill_matrix(
    Json(requirement): Json<Requirement>,
) -> Result<Json<SkillMatrix>, AppError> {
    require_title(&requirement.title)?;
    Ok(Json(SkillCanonicalizer::shared().skill_matrix(&requirement)))
}
