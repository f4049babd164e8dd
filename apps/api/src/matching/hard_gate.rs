//! Hard Gate Matcher — independent skill and experience gates.
//!
//! Scores are auditable: every result carries matched/missing skills and the
//! experience gap. The 60/40 skill/experience blend is fixed so the gate behaves the
//! same in every deployment.

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::matching::skills::{
    effective_candidate_skills, skill_overlap_score, CanonicalSkillSet, SkillCanonicalizer,
};
use crate::models::{CandidateRecord, Exclusion, MatchResult, MatchStage, MatchedCandidate};

const SKILL_SHARE: f64 = 0.6;
const EXPERIENCE_SHARE: f64 = 0.4;

/// Coverage of required years: 1.0 when met, 0.8 from 70%, 0.5 from 50%, else 0.2.
/// No requirement (0 years) means no constraint.
pub fn experience_coverage_score(required_years: u32, candidate_years: u32) -> f64 {
    if required_years == 0 {
        return 1.0;
    }
    let required = required_years as f64;
    let candidate = candidate_years as f64;
    if candidate >= required {
        1.0
    } else if candidate >= required * 0.7 {
        0.8
    } else if candidate >= required * 0.5 {
        0.5
    } else {
        0.2
    }
}

/// Scores one candidate against the canonical requirement skills.
pub fn score_candidate(
    required: &CanonicalSkillSet,
    required_years: u32,
    candidate: &CandidateRecord,
    candidate_skills: &CanonicalSkillSet,
) -> MatchResult {
    let skill_score = skill_overlap_score(required, candidate_skills);
    let candidate_years = candidate.experience_years.unwrap_or(0);
    let experience_score = experience_coverage_score(required_years, candidate_years);
    let matched_skills: CanonicalSkillSet =
        required.intersection(candidate_skills).cloned().collect();
    let missing_skills: CanonicalSkillSet =
        required.difference(&matched_skills).cloned().collect();

    MatchResult {
        candidate_id: candidate.id.clone(),
        skill_score,
        semantic_score: None,
        experience_score,
        combined_score: SKILL_SHARE * skill_score + EXPERIENCE_SHARE * experience_score,
        matched_skills,
        missing_skills,
        experience_gap: required_years.saturating_sub(candidate_years),
    }
}

/// Descending by combined score, ties broken by candidate id.
pub(crate) fn by_score_then_id(a: &MatchedCandidate, b: &MatchedCandidate) -> Ordering {
    b.result
        .combined_score
        .partial_cmp(&a.result.combined_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.candidate.id.cmp(&b.candidate.id))
}

/// Output of one hard-gate pass.
#[derive(Debug, Clone, Default)]
pub struct GateOutcome {
    pub passed: Vec<MatchedCandidate>,
    pub rejected: Vec<Exclusion>,
}

pub struct HardGateMatcher<'a> {
    canonicalizer: &'a SkillCanonicalizer,
    required: &'a CanonicalSkillSet,
    required_years: u32,
}

impl<'a> HardGateMatcher<'a> {
    pub fn new(
        canonicalizer: &'a SkillCanonicalizer,
        required: &'a CanonicalSkillSet,
        required_years: u32,
    ) -> Self {
        Self {
            canonicalizer,
            required,
            required_years,
        }
    }

    /// Keeps candidates with `skill_score >= min_skill_match` and
    /// `experience_score >= min_experience_match`, sorted deterministically.
    pub fn run(
        &self,
        candidates: &[CandidateRecord],
        min_skill_match: f64,
        min_experience_match: f64,
    ) -> GateOutcome {
        info!(
            "Hard matching {} candidates (required skills: {:?}, required years: {}, min skill: {:.0}%, min experience: {:.0}%)",
            candidates.len(),
            self.required,
            self.required_years,
            min_skill_match * 100.0,
            min_experience_match * 100.0
        );

        let anchored = self.canonicalizer.anchored_extractor(self.required);
        let mut outcome = GateOutcome::default();

        for candidate in candidates {
            let skills = effective_candidate_skills(self.canonicalizer, &anchored, candidate);
            let result = score_candidate(self.required, self.required_years, candidate, &skills);

            if result.skill_score >= min_skill_match && result.experience_score >= min_experience_match
            {
                outcome.passed.push(MatchedCandidate {
                    candidate: candidate.clone(),
                    skills,
                    result,
                });
            } else {
                debug!(
                    "Candidate {} rejected: skill {:.2}, experience {:.2}",
                    candidate.id, result.skill_score, result.experience_score
                );
                outcome.rejected.push(Exclusion::new(
                    &candidate.id,
                    MatchStage::HardGate,
                    format!(
                        "skill score {:.2} (min {:.2}), experience score {:.2} (min {:.2})",
                        result.skill_score,
                        min_skill_match,
                        result.experience_score,
                        min_experience_match
                    ),
                ));
            }
        }

        outcome.passed.sort_by(by_score_then_id);

        info!("{} candidates passed hard matching", outcome.passed.len());
        if !outcome.passed.is_empty() {
            let top: Vec<String> = outcome
                .passed
                .iter()
                .take(3)
                .map(|m| format!("{}: {:.2}", m.candidate.name, m.result.combined_score))
                .collect();
            info!("Top hard-match scores: {:?}", top);
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::fakes::candidate;
    use crate::models::Requirement;

    fn python_requirement() -> Requirement {
        Requirement {
            title: "Python Developer".to_string(),
            description: String::new(),
            required_skills: vec!["Python".to_string(), "Django".to_string()],
            experience_years: Some(3),
            location: None,
        }
    }

    fn run(
        requirement: &Requirement,
        candidates: &[CandidateRecord],
        min_skill: f64,
        min_exp: f64,
    ) -> GateOutcome {
        let canonicalizer = SkillCanonicalizer::shared();
        let required = canonicalizer.requirement_skills(requirement);
        HardGateMatcher::new(canonicalizer, &required, requirement.required_years())
            .run(candidates, min_skill, min_exp)
    }

    #[test]
    fn test_experience_coverage_bands() {
        assert_eq!(experience_coverage_score(0, 0), 1.0);
        assert_eq!(experience_coverage_score(10, 12), 1.0);
        assert_eq!(experience_coverage_score(10, 10), 1.0);
        assert_eq!(experience_coverage_score(10, 7), 0.8);
        assert_eq!(experience_coverage_score(10, 5), 0.5);
        assert_eq!(experience_coverage_score(10, 4), 0.2);
    }

    #[test]
    fn test_python_developer_example() {
        let a = candidate("a", "naukri", &["python", "django", "docker"], Some(4));
        let b = candidate("b", "naukri", &["java"], Some(1));
        let outcome = run(&python_requirement(), &[a, b], 0.3, 0.5);

        assert_eq!(outcome.passed.len(), 1);
        let passed = &outcome.passed[0];
        assert_eq!(passed.candidate.id, "a");
        assert_eq!(passed.result.skill_score, 1.0);
        assert_eq!(passed.result.experience_score, 1.0);
        assert!((passed.result.combined_score - 1.0).abs() < 1e-9);
        assert!(passed.result.missing_skills.is_empty());

        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].candidate_id, "b");
        assert_eq!(outcome.rejected[0].stage, MatchStage::HardGate);
    }

    #[test]
    fn test_missing_skills_and_experience_gap() {
        let c = candidate("c", "linkedin", &["Python"], Some(2));
        let outcome = run(&python_requirement(), &[c], 0.1, 0.1);
        let result = &outcome.passed[0].result;
        assert_eq!(result.skill_score, 0.5);
        assert_eq!(result.experience_score, 0.5); // 1.5 <= 2 < 2.1
        assert_eq!(result.experience_gap, 1);
        assert_eq!(
            result.missing_skills.iter().collect::<Vec<_>>(),
            vec!["django"]
        );
        assert!((result.combined_score - (0.6 * 0.5 + 0.4 * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_experience_gate_rejects_junior() {
        let junior = candidate("j", "github", &["python", "django"], Some(1));
        let outcome = run(&python_requirement(), &[junior], 0.3, 0.5);
        assert!(outcome.passed.is_empty());
        assert!(outcome.rejected[0].reason.contains("experience score 0.20"));
    }

    #[test]
    fn test_skills_inferred_from_title_and_summary() {
        let mut c = candidate("i", "naukri", &[], Some(5));
        c.current_title = Some("Senior Python Engineer".to_string());
        c.summary = Some("Ships Django apps".to_string());
        let outcome = run(&python_requirement(), &[c], 0.3, 0.5);
        assert_eq!(outcome.passed.len(), 1);
        assert_eq!(outcome.passed[0].result.skill_score, 1.0);
    }

    #[test]
    fn test_ties_broken_by_candidate_id() {
        let candidates = vec![
            candidate("z", "naukri", &["python", "django"], Some(5)),
            candidate("m", "naukri", &["python", "django"], Some(5)),
            candidate("a", "naukri", &["python", "django"], Some(5)),
        ];
        let outcome = run(&python_requirement(), &candidates, 0.3, 0.5);
        let ids: Vec<_> = outcome.passed.iter().map(|m| m.candidate.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let candidates: Vec<_> = (0..12)
            .map(|i| {
                let skills: &[&str] = match i % 3 {
                    0 => &["python"],
                    1 => &["python", "django"],
                    _ => &["django", "flask"],
                };
                candidate(&format!("c{i}"), "naukri", skills, Some(i % 6))
            })
            .collect();
        let first = run(&python_requirement(), &candidates, 0.1, 0.1);
        let second = run(&python_requirement(), &candidates, 0.1, 0.1);
        assert_eq!(first.passed, second.passed);
        assert_eq!(first.rejected, second.rejected);
    }

    #[test]
    fn test_no_required_skills_gives_neutral_score() {
        let requirement = Requirement {
            title: "Office Manager".to_string(),
            description: String::new(),
            required_skills: vec![],
            experience_years: None,
            location: None,
        };
        let outcome = run(&requirement, &[candidate("x", "naukri", &["excel"], None)], 0.3, 0.5);
        let result = &outcome.passed[0].result;
        assert_eq!(result.skill_score, 0.5);
        assert_eq!(result.experience_score, 1.0);
    }
}
