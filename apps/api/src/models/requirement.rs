use serde::{Deserialize, Serialize};

/// A structured job requirement. Treated as immutable once a matching run starts;
/// enrichment produces a new value via [`Requirement::with_skills`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Free-text skills as supplied by the caller, not yet canonical.
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub location: Option<String>,
}

impl Requirement {
    /// Required years, with an unset requirement meaning "no constraint" (0).
    pub fn required_years(&self) -> u32 {
        self.experience_years.unwrap_or(0)
    }

    /// Returns a copy of this requirement with its skill list replaced.
    pub fn with_skills(&self, skills: Vec<String>) -> Self {
        Self {
            required_skills: skills,
            ..self.clone()
        }
    }

    /// Synthesized description used as the requirement side of embedding comparisons.
    pub fn embedding_text(&self) -> String {
        let experience = self.required_years();
        let location = self.location.as_deref().unwrap_or("Any");
        [
            format!("Title: {}", self.title),
            format!("Description: {}", self.description),
            format!("Required Skills: {}", self.required_skills.join(", ")),
            format!("Experience: {experience} years"),
            format!("Location: {location}"),
        ]
        .join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_requirement() -> Requirement {
        Requirement {
            title: "Python Developer".to_string(),
            description: "Build APIs".to_string(),
            required_skills: vec!["Python".to_string(), "Django".to_string()],
            experience_years: Some(3),
            location: None,
        }
    }

    #[test]
    fn test_embedding_text_lists_every_section() {
        let text = make_requirement().embedding_text();
        assert_eq!(
            text,
            "Title: Python Developer | Description: Build APIs | Required Skills: Python, Django | Experience: 3 years | Location: Any"
        );
    }

    #[test]
    fn test_with_skills_keeps_other_fields() {
        let original = make_requirement();
        let expanded = original.with_skills(vec!["Python".to_string(), "Flask".to_string()]);
        assert_eq!(expanded.title, original.title);
        assert_eq!(expanded.experience_years, Some(3));
        assert_eq!(expanded.required_skills, vec!["Python", "Flask"]);
        assert_eq!(original.required_skills, vec!["Python", "Django"]);
    }

    #[test]
    fn test_deserializes_with_only_title() {
        let req: Requirement = serde_json::from_str(r#"{"title": "SRE"}"#).unwrap();
        assert!(req.required_skills.is_empty());
        assert_eq!(req.required_years(), 0);
        assert!(req.location.is_none());
    }
}
