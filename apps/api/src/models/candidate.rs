use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A candidate profile as handed over by the sourcing feed. Read-only to matching.
///
/// `skills` may be empty for portals that do not expose a skill list; matching then
/// infers skills from `current_title` and `summary`. Source-specific fields that have
/// no typed home go into `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Stable, source-qualified identifier (e.g. `linkedin:jane-doe-1234`).
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub current_title: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Origin population, e.g. "naukri", "LinkedIn Recruiter".
    pub source: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl CandidateRecord {
    /// True when at least one listed skill is non-blank.
    pub fn has_explicit_skills(&self) -> bool {
        self.skills.iter().any(|s| !s.trim().is_empty())
    }

    /// Text the skill inference scans when the record carries no explicit skills.
    pub fn inference_text(&self) -> String {
        [self.current_title.as_deref(), self.summary.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Synthesized description used as the candidate side of embedding comparisons.
    /// `skills` is the effective skill list (explicit, or inferred when empty).
    pub fn embedding_text(&self, skills: &[String]) -> String {
        let mut parts = vec![
            format!("Title: {}", self.current_title.as_deref().unwrap_or("N/A")),
            format!("Skills: {}", skills.join(", ")),
            format!("Experience: {} years", self.experience_years.unwrap_or(0)),
            format!("Education: {}", self.education.as_deref().unwrap_or("N/A")),
            format!("Location: {}", self.location.as_deref().unwrap_or("N/A")),
        ];
        if let Some(summary) = self.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            parts.push(format!("Summary: {summary}"));
        }
        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_candidate() -> CandidateRecord {
        CandidateRecord {
            id: "naukri:1".to_string(),
            name: "Asha".to_string(),
            current_title: Some("Backend Engineer".to_string()),
            skills: vec![],
            experience_years: Some(4),
            education: None,
            location: Some("Pune".to_string()),
            source: "naukri".to_string(),
            summary: Some("Django and Postgres".to_string()),
            profile_url: None,
            extra: HashMap::new(),
        }
    }

    #[test]
    fn test_inference_text_joins_title_and_summary() {
        assert_eq!(
            make_candidate().inference_text(),
            "Backend Engineer Django and Postgres"
        );
    }

    #[test]
    fn test_embedding_text_uses_placeholders_for_missing_fields() {
        let text = make_candidate().embedding_text(&["django".to_string()]);
        assert!(text.contains("Education: N/A"));
        assert!(text.contains("Skills: django"));
        assert!(text.ends_with("Summary: Django and Postgres"));
    }

    #[test]
    fn test_embedding_text_omits_blank_summary() {
        let mut candidate = make_candidate();
        candidate.summary = Some("  ".to_string());
        assert!(!candidate.embedding_text(&[]).contains("Summary"));
    }

    #[test]
    fn test_blank_skills_are_not_explicit() {
        let mut c = make_candidate();
        assert!(!c.has_explicit_skills());
        c.skills = vec![" ".to_string(), String::new()];
        assert!(!c.has_explicit_skills());
        c.skills.push("Rust".to_string());
        assert!(c.has_explicit_skills());
    }

    #[test]
    fn test_extra_defaults_to_empty() {
        let json = r#"{"id": "gh:1", "name": "Lee", "source": "github"}"#;
        let candidate: CandidateRecord = serde_json::from_str(json).unwrap();
        assert!(candidate.extra.is_empty());
        assert!(candidate.skills.is_empty());
    }
}
