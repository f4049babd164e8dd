//! Matching pipeline: optional expansion → canonicalize → match → balance → rank.
//!
//! Stages run strictly in order and each consumes the previous stage's full output.
//! Nothing is persisted, so dropping the returned future cancels a run cleanly.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::embedding::Embedder;
use crate::llm_client::TextGenerator;
use crate::matching::balancer::balance;
use crate::matching::error::MatchError;
use crate::matching::expander::{ExpandedRequirement, RequirementExpander};
use crate::matching::hard_gate::HardGateMatcher;
use crate::matching::policy::{MatcherKind, MatchingPolicy, SemanticWeights};
use crate::matching::ranker::Ranker;
use crate::matching::semantic::SemanticMatcher;
use crate::matching::skills::{CanonicalSkillSet, SkillCanonicalizer};
use crate::models::{CandidateRecord, Exclusion, MatchedCandidate, RankedCandidate, Requirement};

/// External providers a run may call.
#[derive(Clone, Copy)]
pub struct Providers<'a> {
    pub embedder: &'a dyn Embedder,
    pub generator: &'a dyn TextGenerator,
}

/// Which matcher actually produced the matched set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherUsed {
    Semantic,
    HardGate,
    /// Hybrid policy whose semantic stage kept nobody.
    HardGateFallback,
}

/// Candidate counts per stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub candidates_in: usize,
    pub matched: usize,
    pub balanced: usize,
    pub ranked: usize,
    pub provider_failures: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShortlistReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub matcher: Option<MatcherUsed>,
    pub expansion: Option<ExpandedRequirement>,
    pub shortlist: Vec<RankedCandidate>,
    pub excluded: Vec<Exclusion>,
    pub stats: RunStats,
}

impl ShortlistReport {
    fn empty(run_id: Uuid) -> Self {
        Self {
            run_id,
            generated_at: Utc::now(),
            matcher: None,
            expansion: None,
            shortlist: Vec::new(),
            excluded: Vec::new(),
            stats: RunStats::default(),
        }
    }
}

struct MatchStageOutput {
    matched: Vec<MatchedCandidate>,
    excluded: Vec<Exclusion>,
    provider_failures: usize,
    used: MatcherUsed,
}

/// Entry point: ranked, explained shortlist for `requirement`.
///
/// Only an invalid policy fails the call; provider trouble degrades the result.
pub async fn rank_candidates(
    requirement: &Requirement,
    candidates: &[CandidateRecord],
    policy: &MatchingPolicy,
    providers: Providers<'_>,
) -> Result<Vec<RankedCandidate>, MatchError> {
    Ok(run_pipeline(requirement, candidates, policy, providers)
        .await?
        .shortlist)
}

/// Like [`rank_candidates`], with exclusions, stage counts and expansion attached.
pub async fn run_pipeline(
    requirement: &Requirement,
    candidates: &[CandidateRecord],
    policy: &MatchingPolicy,
    providers: Providers<'_>,
) -> Result<ShortlistReport, MatchError> {
    policy.validate()?;

    let run_id = Uuid::new_v4();
    if candidates.is_empty() {
        info!("Run {run_id}: empty candidate pool, nothing to rank");
        return Ok(ShortlistReport::empty(run_id));
    }
    info!(
        "Run {run_id}: matching {} candidates against '{}'",
        candidates.len(),
        requirement.title
    );

    let expansion = if policy.expand_requirement {
        let expander = RequirementExpander::new(providers.generator, policy.call_budget);
        Some(
            expander
                .expand(&requirement.title, &requirement.required_skills)
                .await,
        )
    } else {
        None
    };
    // Matching casts the wider net; ranking still scores against what was asked for.
    let matching_requirement = match &expansion {
        Some(expanded) => requirement.with_skills(expanded.skills.clone()),
        None => requirement.clone(),
    };

    let canonicalizer = SkillCanonicalizer::shared();
    let matrix = canonicalizer.skill_matrix(&matching_requirement);
    let required: CanonicalSkillSet = matrix.all_skills.into_iter().collect();

    let stage = run_matcher(
        canonicalizer,
        &required,
        &matching_requirement,
        candidates,
        policy,
        providers.embedder,
    )
    .await;
    let mut excluded = stage.excluded;
    let matched_count = stage.matched.len();

    let balanced = balance(stage.matched, policy.max_results, &policy.sources);
    excluded.extend(balanced.dropped);
    let balanced_count = balanced.selected.len();

    let ranker = Ranker::new(
        canonicalizer,
        providers.generator,
        policy.call_budget,
        policy.concurrency,
    );
    let ranked = ranker
        .rank(
            requirement,
            balanced.selected,
            &policy.ranking_weights,
            policy.top_n,
        )
        .await;
    excluded.extend(ranked.cut);

    let stats = RunStats {
        candidates_in: candidates.len(),
        matched: matched_count,
        balanced: balanced_count,
        ranked: ranked.ranked.len(),
        provider_failures: stage.provider_failures,
    };
    info!(
        "Run {run_id} finished: {} in, {} matched, {} balanced, {} ranked, {} excluded",
        stats.candidates_in,
        stats.matched,
        stats.balanced,
        stats.ranked,
        excluded.len()
    );

    Ok(ShortlistReport {
        run_id,
        generated_at: Utc::now(),
        matcher: Some(stage.used),
        expansion,
        shortlist: ranked.ranked,
        excluded,
        stats,
    })
}

async fn run_matcher(
    canonicalizer: &SkillCanonicalizer,
    required: &CanonicalSkillSet,
    requirement: &Requirement,
    candidates: &[CandidateRecord],
    policy: &MatchingPolicy,
    embedder: &dyn Embedder,
) -> MatchStageOutput {
    let required_years = requirement.required_years();
    let semantic = |threshold: f64, weights: SemanticWeights| async move {
        SemanticMatcher::new(
            canonicalizer,
            required,
            embedder,
            policy.call_budget,
            policy.concurrency,
        )
        .run(requirement, candidates, threshold, weights)
        .await
    };
    let hard_gate = HardGateMatcher::new(canonicalizer, required, required_years);

    match policy.matcher {
        MatcherKind::Semantic { threshold, weights } => {
            let outcome = semantic(threshold, weights).await;
            MatchStageOutput {
                matched: outcome.matched,
                excluded: outcome.excluded,
                provider_failures: outcome.provider_failures,
                used: MatcherUsed::Semantic,
            }
        }
        MatcherKind::HardGate {
            min_skill_match,
            min_experience_match,
        } => {
            let outcome = hard_gate.run(candidates, min_skill_match, min_experience_match);
            MatchStageOutput {
                matched: outcome.passed,
                excluded: outcome.rejected,
                provider_failures: 0,
                used: MatcherUsed::HardGate,
            }
        }
        MatcherKind::Hybrid {
            threshold,
            weights,
            fallback_min_skill_match,
            fallback_min_experience_match,
        } => {
            let outcome = semantic(threshold, weights).await;
            if !outcome.matched.is_empty() {
                return MatchStageOutput {
                    matched: outcome.matched,
                    excluded: outcome.excluded,
                    provider_failures: outcome.provider_failures,
                    used: MatcherUsed::Semantic,
                };
            }

            warn!(
                "Semantic stage kept nobody (requirement embedded: {}), falling back to hard gate at {:.2}/{:.2}",
                outcome.requirement_embedded, fallback_min_skill_match, fallback_min_experience_match
            );
            let gate = hard_gate.run(
                candidates,
                fallback_min_skill_match,
                fallback_min_experience_match,
            );
            MatchStageOutput {
                matched: gate.passed,
                excluded: gate.rejected,
                provider_failures: outcome.provider_failures,
                used: MatcherUsed::HardGateFallback,
            }
        }
    }
}
