//! Semantic Matcher — canonical skill overlap blended with embedding similarity.
//!
//! One embedding call for the requirement, then candidate texts in batches issued
//! concurrently. A provider failure excludes only the candidates whose text could not
//! be embedded; the run carries on with everyone else.

use std::cmp::Ordering;

use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::embedding::{cosine_similarity, Embedder};
use crate::matching::budget::{call_with_budget, CallBudget};
use crate::matching::error::MatchError;
use crate::matching::hard_gate::experience_coverage_score;
use crate::matching::policy::SemanticWeights;
use crate::matching::skills::{
    effective_candidate_skills, skill_overlap_score, CanonicalSkillSet, SkillCanonicalizer,
};
use crate::models::{
    CandidateRecord, Exclusion, MatchResult, MatchStage, MatchedCandidate, Requirement,
};

/// Texts per `embed_many` request.
const EMBED_BATCH_SIZE: usize = 16;

#[derive(Debug, Clone, Default)]
pub struct SemanticOutcome {
    /// Sorted by combined score, descending; ties keep input order.
    pub matched: Vec<MatchedCandidate>,
    pub excluded: Vec<Exclusion>,
    /// Candidates lost to embedding failures (subset of `excluded`).
    pub provider_failures: usize,
    /// False when the requirement itself could not be embedded.
    pub requirement_embedded: bool,
}

pub struct SemanticMatcher<'a> {
    canonicalizer: &'a SkillCanonicalizer,
    required: &'a CanonicalSkillSet,
    embedder: &'a dyn Embedder,
    budget: CallBudget,
    concurrency: usize,
}

impl<'a> SemanticMatcher<'a> {
    pub fn new(
        canonicalizer: &'a SkillCanonicalizer,
        required: &'a CanonicalSkillSet,
        embedder: &'a dyn Embedder,
        budget: CallBudget,
        concurrency: usize,
    ) -> Self {
        Self {
            canonicalizer,
            required,
            embedder,
            budget,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn run(
        &self,
        requirement: &Requirement,
        candidates: &[CandidateRecord],
        threshold: f64,
        weights: SemanticWeights,
    ) -> SemanticOutcome {
        info!(
            "Semantic matching {} candidates with {} (threshold {:.2}, skill/semantic {:.2}/{:.2})",
            candidates.len(),
            self.embedder.name(),
            threshold,
            weights.skill_weight,
            weights.semantic_weight
        );

        let requirement_text = requirement.embedding_text();
        let job_vector = match call_with_budget(self.budget, "embedding", || {
            self.embedder.embed(&requirement_text)
        })
        .await
        {
            Ok(vector) => vector,
            Err(e) => {
                warn!("Requirement embedding failed, no candidate can be scored: {e}");
                return SemanticOutcome {
                    matched: Vec::new(),
                    provider_failures: candidates.len(),
                    excluded: candidates
                        .iter()
                        .map(|c| Exclusion::new(&c.id, MatchStage::Semantic, e.to_string()))
                        .collect(),
                    requirement_embedded: false,
                };
            }
        };

        let anchored = self.canonicalizer.anchored_extractor(self.required);
        let skill_sets: Vec<CanonicalSkillSet> = candidates
            .iter()
            .map(|c| effective_candidate_skills(self.canonicalizer, &anchored, c))
            .collect();
        let texts: Vec<String> = candidates
            .iter()
            .zip(&skill_sets)
            .map(|(candidate, skills)| candidate_text(candidate, skills))
            .collect();

        let vectors = self.embed_candidates(&texts).await;

        let mut outcome = SemanticOutcome {
            requirement_embedded: true,
            ..SemanticOutcome::default()
        };
        let required_years = requirement.required_years();

        for ((candidate, skills), vector) in candidates.iter().zip(skill_sets).zip(vectors) {
            let vector = match vector {
                Ok(v) => v,
                Err(e) => {
                    warn!("Excluding candidate {}: {e}", candidate.id);
                    outcome.provider_failures += 1;
                    outcome
                        .excluded
                        .push(Exclusion::new(&candidate.id, MatchStage::Semantic, e.to_string()));
                    continue;
                }
            };

            let result = score_candidate(
                self.required,
                required_years,
                candidate,
                &skills,
                cosine_similarity(&job_vector, &vector),
                weights,
            );

            if result.combined_score >= threshold {
                outcome.matched.push(MatchedCandidate {
                    candidate: candidate.clone(),
                    skills,
                    result,
                });
            } else {
                outcome.excluded.push(Exclusion::new(
                    &candidate.id,
                    MatchStage::Semantic,
                    format!(
                        "combined score {:.2} below threshold {:.2}",
                        result.combined_score, threshold
                    ),
                ));
            }
        }

        outcome.matched.sort_by(|a, b| {
            b.result
                .combined_score
                .partial_cmp(&a.result.combined_score)
                .unwrap_or(Ordering::Equal)
        });

        info!(
            "Matched {} candidates above threshold {:.2} ({} provider failures)",
            outcome.matched.len(),
            threshold,
            outcome.provider_failures
        );
        outcome
    }

    /// Embeds candidate texts, one result per text in input order.
    async fn embed_candidates(&self, texts: &[String]) -> Vec<Result<Vec<f32>, MatchError>> {
        let jobs: Vec<_> = texts
            .chunks(EMBED_BATCH_SIZE)
            .enumerate()
            .map(|(i, chunk)| async move { (i * EMBED_BATCH_SIZE, self.embed_chunk(chunk).await) })
            .collect();

        let mut embedded: Vec<(usize, Vec<Result<Vec<f32>, MatchError>>)> = stream::iter(jobs)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        embedded.sort_by_key(|(offset, _)| *offset);
        embedded.into_iter().flat_map(|(_, results)| results).collect()
    }

    /// One batch call; on failure each text is retried alone so a single bad text
    /// only costs its own candidate.
    async fn embed_chunk(&self, chunk: &[String]) -> Vec<Result<Vec<f32>, MatchError>> {
        let batch = call_with_budget(self.budget, "embedding", || self.embedder.embed_many(chunk)).await;

        match batch {
            Ok(vectors) if vectors.len() == chunk.len() => vectors.into_iter().map(Ok).collect(),
            Ok(vectors) => {
                warn!(
                    "Embedding batch returned {} vectors for {} texts, retrying individually",
                    vectors.len(),
                    chunk.len()
                );
                self.embed_individually(chunk).await
            }
            Err(e) => {
                warn!("Embedding batch of {} failed ({e}), retrying individually", chunk.len());
                self.embed_individually(chunk).await
            }
        }
    }

    async fn embed_individually(&self, chunk: &[String]) -> Vec<Result<Vec<f32>, MatchError>> {
        let mut results = Vec::with_capacity(chunk.len());
        for text in chunk {
            results.push(call_with_budget(self.budget, "embedding", || self.embedder.embed(text)).await);
        }
        results
    }
}

/// Embedding text for a candidate: explicit skills as listed, or the inferred set
/// when the record lists none.
fn candidate_text(candidate: &CandidateRecord, effective: &CanonicalSkillSet) -> String {
    if candidate.has_explicit_skills() {
        candidate.embedding_text(&candidate.skills)
    } else {
        let inferred: Vec<String> = effective.iter().cloned().collect();
        candidate.embedding_text(&inferred)
    }
}

/// Builds the semantic pipeline's MatchResult. Cosine similarity is clamped to [0, 1]
/// before blending.
pub fn score_candidate(
    required: &CanonicalSkillSet,
    required_years: u32,
    candidate: &CandidateRecord,
    candidate_skills: &CanonicalSkillSet,
    similarity: f64,
    weights: SemanticWeights,
) -> MatchResult {
    let skill_score = skill_overlap_score(required, candidate_skills);
    let semantic_score = similarity.clamp(0.0, 1.0);
    let candidate_years = candidate.experience_years.unwrap_or(0);
    let matched_skills: CanonicalSkillSet =
        required.intersection(candidate_skills).cloned().collect();
    let missing_skills: CanonicalSkillSet =
        required.difference(&matched_skills).cloned().collect();

    MatchResult {
        candidate_id: candidate.id.clone(),
        skill_score,
        semantic_score: Some(semantic_score),
        experience_score: experience_coverage_score(required_years, candidate_years),
        combined_score: weights.skill_weight * skill_score + weights.semantic_weight * semantic_score,
        matched_skills,
        missing_skills,
        experience_gap: required_years.saturating_sub(candidate_years),
    }
}
