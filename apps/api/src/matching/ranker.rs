//! Multi-Factor Ranker — weighted factor scores, top-N cut, then generated reasoning.
//!
//! Only the candidates that survive the cut are sent to the generative-text provider,
//! and a provider failure costs the candidate its explanation, never its place.

use std::cmp::Ordering;

use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::llm_client::prompts::GROUNDED_REASONING_INSTRUCTION;
use crate::llm_client::{ChatMessage, TextGenerator};
use crate::matching::budget::{call_with_budget, CallBudget};
use crate::matching::policy::RankingWeights;
use crate::matching::prompts::{REASONING_PROMPT_TEMPLATE, REASONING_SYSTEM};
use crate::matching::skills::{skill_match_detail, CanonicalSkillSet, SkillCanonicalizer};
use crate::models::{
    Exclusion, MatchStage, MatchedCandidate, RankedCandidate, Requirement, ScoreBreakdown,
};

/// Education score used until records carry structured education data.
pub const EDUCATION_PLACEHOLDER: f64 = 0.7;
/// Availability score used until records carry availability data.
pub const AVAILABILITY_PLACEHOLDER: f64 = 0.8;
/// Reasoning text when the provider cannot produce one.
pub const REASONING_FALLBACK: &str = "AI reasoning unavailable";

const REASONING_MAX_TOKENS: u32 = 150;
const REASONING_TEMPERATURE: f32 = 0.3;

/// Symmetric distance in years: equal 1.0, within 2 0.8, within 5 0.5, else 0.2.
/// Neutral 0.5 when either side is unknown; 0 years counts as unknown.
pub fn experience_proximity_score(required: Option<u32>, candidate: Option<u32>) -> f64 {
    let known = |years: Option<u32>| years.filter(|y| *y > 0);
    match (known(required), known(candidate)) {
        (Some(required), Some(candidate)) => match required.abs_diff(candidate) {
            0 => 1.0,
            1..=2 => 0.8,
            3..=5 => 0.5,
            _ => 0.2,
        },
        _ => 0.5,
    }
}

/// 1.0 when the required location appears (case-insensitively) in the candidate's,
/// else 0.3. Neutral 0.5 when either side is missing.
pub fn location_score(required: Option<&str>, candidate: Option<&str>) -> f64 {
    let required = required.map(str::trim).filter(|s| !s.is_empty());
    let candidate = candidate.map(str::trim).filter(|s| !s.is_empty());
    match (required, candidate) {
        (Some(required), Some(candidate)) => {
            if candidate.to_lowercase().contains(&required.to_lowercase()) {
                1.0
            } else {
                0.3
            }
        }
        _ => 0.5,
    }
}

/// Ranked shortlist plus the candidates the top-N cut removed.
#[derive(Debug, Clone, Default)]
pub struct RankOutcome {
    pub ranked: Vec<RankedCandidate>,
    pub cut: Vec<Exclusion>,
}

pub struct Ranker<'a> {
    canonicalizer: &'a SkillCanonicalizer,
    generator: &'a dyn TextGenerator,
    budget: CallBudget,
    concurrency: usize,
}

impl<'a> Ranker<'a> {
    pub fn new(
        canonicalizer: &'a SkillCanonicalizer,
        generator: &'a dyn TextGenerator,
        budget: CallBudget,
        concurrency: usize,
    ) -> Self {
        Self {
            canonicalizer,
            generator,
            budget,
            concurrency: concurrency.max(1),
        }
    }

    /// Factor scores and weighted total for one candidate. The skills factor is the
    /// plain overlap ratio, so a requirement without skills gives it zero weight.
    pub fn score(
        &self,
        requirement: &Requirement,
        required: &CanonicalSkillSet,
        matched: &MatchedCandidate,
        weights: &RankingWeights,
    ) -> (f64, ScoreBreakdown) {
        let detail = skill_match_detail(required, &matched.skills);
        let experience = experience_proximity_score(
            requirement.experience_years,
            matched.candidate.experience_years,
        );
        let location = location_score(
            requirement.location.as_deref(),
            matched.candidate.location.as_deref(),
        );

        let total = weights.skills * detail.score
            + weights.experience * experience
            + weights.location * location
            + weights.education * EDUCATION_PLACEHOLDER
            + weights.availability * AVAILABILITY_PLACEHOLDER;

        let breakdown = ScoreBreakdown {
            skills_match: detail.score,
            experience_match: experience,
            location_match: location,
            education_match: EDUCATION_PLACEHOLDER,
            availability: AVAILABILITY_PLACEHOLDER,
            match_stage_score: matched.combined_score(),
            matched_skills: detail.matched_skills,
            missing_skills: detail.missing_skills,
        };
        (total, breakdown)
    }

    /// Scores every candidate, stable-sorts by score descending, keeps `top_n`, then
    /// asks for reasoning for the survivors concurrently.
    pub async fn rank(
        &self,
        requirement: &Requirement,
        candidates: Vec<MatchedCandidate>,
        weights: &RankingWeights,
        top_n: usize,
    ) -> RankOutcome {
        info!(
            "Ranking {} candidates for '{}' (top {})",
            candidates.len(),
            requirement.title,
            top_n
        );

        let required = self.canonicalizer.requirement_skills(requirement);
        let mut scored: Vec<RankedCandidate> = candidates
            .into_iter()
            .map(|matched| {
                let (match_score, breakdown) = self.score(requirement, &required, &matched, weights);
                RankedCandidate {
                    candidate: matched.candidate,
                    match_score,
                    breakdown,
                    reasoning: String::new(),
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.match_score
                .partial_cmp(&a.match_score)
                .unwrap_or(Ordering::Equal)
        });

        let cut: Vec<Exclusion> = scored
            .split_off(top_n.min(scored.len()))
            .into_iter()
            .map(|rc| {
                Exclusion::new(
                    rc.candidate.id,
                    MatchStage::Rank,
                    format!("ranked below the top {top_n} (score {:.2})", rc.match_score),
                )
            })
            .collect();

        let jobs: Vec<_> = scored
            .iter()
            .enumerate()
            .map(|(idx, rc)| async move { (idx, self.reasoning_for(requirement, rc).await) })
            .collect();
        let mut reasons: Vec<(usize, String)> = stream::iter(jobs)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        reasons.sort_by_key(|(idx, _)| *idx);
        for (rc, (_, reasoning)) in scored.iter_mut().zip(reasons) {
            rc.reasoning = reasoning;
        }

        info!(
            "Ranked {} candidates, {} cut below the top {}",
            scored.len(),
            cut.len(),
            top_n
        );
        RankOutcome {
            ranked: scored,
            cut,
        }
    }

    async fn reasoning_for(&self, requirement: &Requirement, ranked: &RankedCandidate) -> String {
        let messages = [
            ChatMessage::system(format!("{REASONING_SYSTEM} {GROUNDED_REASONING_INSTRUCTION}")),
            ChatMessage::user(reasoning_prompt(requirement, ranked)),
        ];

        let result = call_with_budget(self.budget, "generative-text", || {
            self.generator
                .complete(&messages, REASONING_MAX_TOKENS, REASONING_TEMPERATURE)
        })
        .await;

        match result {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Empty reasoning for candidate {}", ranked.candidate.id);
                REASONING_FALLBACK.to_string()
            }
            Err(e) => {
                warn!("Reasoning failed for candidate {}: {e}", ranked.candidate.id);
                REASONING_FALLBACK.to_string()
            }
        }
    }
}

fn years_label(years: Option<u32>) -> String {
    years.map_or_else(|| "Not specified".to_string(), |y| format!("{y} years"))
}

fn list_label(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

fn reasoning_prompt(requirement: &Requirement, ranked: &RankedCandidate) -> String {
    let candidate = &ranked.candidate;
    let breakdown = &ranked.breakdown;
    REASONING_PROMPT_TEMPLATE
        .replace("{job_title}", &requirement.title)
        .replace("{required_skills}", &list_label(&requirement.required_skills))
        .replace("{required_experience}", &years_label(requirement.experience_years))
        .replace("{candidate_name}", &candidate.name)
        .replace(
            "{candidate_title}",
            candidate.current_title.as_deref().unwrap_or("N/A"),
        )
        .replace("{candidate_skills}", &list_label(&candidate.skills))
        .replace("{candidate_experience}", &years_label(candidate.experience_years))
        .replace("{skills_score}", &format!("{:.2}", breakdown.skills_match))
        .replace("{experience_score}", &format!("{:.2}", breakdown.experience_match))
        .replace("{location_score}", &format!("{:.2}", breakdown.location_match))
        .replace("{overall_score}", &format!("{:.2}", ranked.match_score))
        .replace("{matched_skills}", &list_label(&breakdown.matched_skills))
        .replace("{missing_skills}", &list_label(&breakdown.missing_skills))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::fakes::{candidate, ScriptedGenerator};
    use crate::models::MatchResult;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn requirement() -> Requirement {
        Requirement {
            title: "Python Developer".to_string(),
            description: String::new(),
            required_skills: vec!["Python".to_string(), "Django".to_string()],
            experience_years: Some(3),
            location: Some("Pune".to_string()),
        }
    }

    fn matched(id: &str, skills: &[&str], years: Option<u32>, location: Option<&str>) -> MatchedCandidate {
        let mut record = candidate(id, "linkedin", skills, years);
        record.location = location.map(str::to_string);
        let canonical = SkillCanonicalizer::shared().canonicalize_all(&record.skills);
        MatchedCandidate {
            candidate: record,
            skills: canonical,
            result: MatchResult {
                candidate_id: id.to_string(),
                skill_score: 0.5,
                semantic_score: None,
                experience_score: 1.0,
                combined_score: 0.7,
                matched_skills: BTreeSet::new(),
                missing_skills: BTreeSet::new(),
                experience_gap: 0,
            },
        }
    }

    fn budget() -> CallBudget {
        CallBudget {
            timeout: Duration::from_millis(200),
            max_retries: 0,
        }
    }

    #[test]
    fn test_experience_proximity_is_symmetric_distance() {
        assert_eq!(experience_proximity_score(Some(5), Some(5)), 1.0);
        assert_eq!(experience_proximity_score(Some(5), Some(7)), 0.8);
        assert_eq!(experience_proximity_score(Some(5), Some(3)), 0.8);
        assert_eq!(experience_proximity_score(Some(5), Some(10)), 0.5);
        assert_eq!(experience_proximity_score(Some(1), Some(12)), 0.2);
        assert_eq!(experience_proximity_score(None, Some(4)), 0.5);
        assert_eq!(experience_proximity_score(Some(4), None), 0.5);
    }

    #[test]
    fn test_zero_years_is_no_constraint() {
        assert_eq!(experience_proximity_score(Some(0), Some(10)), 0.5);
        assert_eq!(experience_proximity_score(Some(4), Some(0)), 0.5);
        assert_eq!(experience_proximity_score(Some(0), Some(0)), 0.5);
    }

    #[test]
    fn test_location_substring_match() {
        assert_eq!(location_score(Some("Pune"), Some("Pune, Maharashtra")), 1.0);
        assert_eq!(location_score(Some("pune"), Some("PUNE")), 1.0);
        assert_eq!(location_score(Some("Pune"), Some("Chennai")), 0.3);
        assert_eq!(location_score(None, Some("Chennai")), 0.5);
        assert_eq!(location_score(Some("Pune"), Some("  ")), 0.5);
    }

    #[test]
    fn test_score_uses_weights_and_placeholders() {
        let generator = ScriptedGenerator::replying("ok");
        let ranker = Ranker::new(SkillCanonicalizer::shared(), &generator, budget(), 2);
        let req = requirement();
        let required = SkillCanonicalizer::shared().requirement_skills(&req);
        let m = matched("a", &["python"], Some(3), Some("Pune"));

        let (total, breakdown) = ranker.score(&req, &required, &m, &RankingWeights::default());
        assert_eq!(breakdown.skills_match, 0.5);
        assert_eq!(breakdown.matched_skills, vec!["python".to_string()]);
        assert_eq!(breakdown.missing_skills, vec!["django".to_string()]);
        assert_eq!(breakdown.match_stage_score, 0.7);
        let expected = 0.40 * 0.5 + 0.25 * 1.0 + 0.15 * 1.0 + 0.10 * 0.7 + 0.10 * 0.8;
        assert!((total - expected).abs() < 1e-9);
    }

    #[test]
    fn test_skills_factor_is_zero_without_required_skills() {
        let generator = ScriptedGenerator::replying("ok");
        let ranker = Ranker::new(SkillCanonicalizer::shared(), &generator, budget(), 2);
        let req = Requirement {
            title: "Office Manager".to_string(),
            description: String::new(),
            required_skills: Vec::new(),
            experience_years: None,
            location: None,
        };
        let required = SkillCanonicalizer::shared().requirement_skills(&req);
        let (_, breakdown) =
            ranker.score(&req, &required, &matched("a", &["python"], None, None), &RankingWeights::default());
        assert_eq!(breakdown.skills_match, 0.0);
    }

    #[tokio::test]
    async fn test_rank_sorts_and_truncates_to_top_n() {
        let generator = ScriptedGenerator::replying("Strong backend match.");
        let ranker = Ranker::new(SkillCanonicalizer::shared(), &generator, budget(), 2);
        let candidates = vec![
            matched("weak", &["java"], Some(12), Some("Chennai")),
            matched("best", &["python", "django"], Some(3), Some("Pune")),
            matched("mid", &["python"], Some(4), None),
        ];

        let outcome = ranker
            .rank(&requirement(), candidates.clone(), &RankingWeights::default(), 2)
            .await;
        let ids: Vec<_> = outcome.ranked.iter().map(|r| r.candidate.id.as_str()).collect();
        assert_eq!(ids, vec!["best", "mid"]);
        assert_eq!(outcome.cut.len(), 1);
        assert_eq!(outcome.cut[0].candidate_id, "weak");
        assert_eq!(outcome.cut[0].stage, MatchStage::Rank);
        assert!(outcome.ranked.iter().all(|r| r.reasoning == "Strong backend match."));
        // Reasoning is only generated for the survivors.
        assert_eq!(generator.call_count(), 2);

        let all = ranker
            .rank(&requirement(), candidates, &RankingWeights::default(), 10)
            .await;
        assert_eq!(all.ranked.len(), 3);
        assert!(all.cut.is_empty());
        for pair in all.ranked.windows(2) {
            assert!(pair[0].match_score >= pair[1].match_score);
        }
    }

    #[tokio::test]
    async fn test_rank_ties_keep_input_order() {
        let generator = ScriptedGenerator::replying("ok");
        let ranker = Ranker::new(SkillCanonicalizer::shared(), &generator, budget(), 4);
        let candidates = vec![
            matched("z", &["python"], Some(3), None),
            matched("a", &["python"], Some(3), None),
        ];
        let outcome = ranker
            .rank(&requirement(), candidates, &RankingWeights::default(), 5)
            .await;
        let ids: Vec<_> = outcome.ranked.iter().map(|r| r.candidate.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a"]);
    }

    #[tokio::test]
    async fn test_generator_failure_uses_fallback() {
        let generator = ScriptedGenerator::failing("overloaded");
        let ranker = Ranker::new(SkillCanonicalizer::shared(), &generator, budget(), 2);
        let outcome = ranker
            .rank(
                &requirement(),
                vec![matched("a", &["python"], Some(3), None)],
                &RankingWeights::default(),
                5,
            )
            .await;
        assert_eq!(outcome.ranked.len(), 1);
        assert_eq!(outcome.ranked[0].reasoning, REASONING_FALLBACK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_generator_times_out_to_fallback() {
        let generator = ScriptedGenerator::slow("too late", Duration::from_secs(5));
        let ranker = Ranker::new(SkillCanonicalizer::shared(), &generator, budget(), 2);
        let outcome = ranker
            .rank(
                &requirement(),
                vec![matched("a", &["python"], Some(3), None)],
                &RankingWeights::default(),
                5,
            )
            .await;
        assert_eq!(outcome.ranked[0].reasoning, REASONING_FALLBACK);
    }

    #[tokio::test]
    async fn test_reasoning_prompt_carries_scores_and_profile() {
        let generator = ScriptedGenerator::replying("ok");
        let ranker = Ranker::new(SkillCanonicalizer::shared(), &generator, budget(), 1);
        ranker
            .rank(
                &requirement(),
                vec![matched("a", &["python"], Some(4), Some("Pune"))],
                &RankingWeights::default(),
                1,
            )
            .await;

        let prompts = generator.prompts.lock().unwrap();
        let user = &prompts[0][1].content;
        assert!(user.contains("Job: Python Developer"));
        assert!(user.contains("Required Skills: Python, Django"));
        assert!(user.contains("Candidate: Candidate a"));
        assert!(user.contains("Experience: 4 years"));
        assert!(user.contains("Skills match: 0.50"));
        assert!(user.contains("Missing skills: django"));
        assert!(!user.contains('{'));
    }
}
