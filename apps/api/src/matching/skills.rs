//! Skill Canonicalizer — maps free-text skill spellings onto one canonical vocabulary.
//!
//! The vocabulary is open: unknown tokens canonicalize to their own lower-cased form,
//! so a job asking for "Elixir" still matches a candidate listing "elixir". Free-text
//! extraction is closed: only spellings present in the variation table are found.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::RegexSet;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::Requirement;

/// Canonical skill identifiers. Ordered so every derived list is deterministic.
pub type CanonicalSkillSet = BTreeSet<String>;

/// Display buckets for the skill matrix. Never consulted by scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    Languages,
    Frameworks,
    DataStores,
    CloudDevops,
    DataMl,
    Other,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 6] = [
        SkillCategory::Languages,
        SkillCategory::Frameworks,
        SkillCategory::DataStores,
        SkillCategory::CloudDevops,
        SkillCategory::DataMl,
        SkillCategory::Other,
    ];
}

use SkillCategory::*;

/// canonical id, category, spellings (the canonical id itself need not be repeated).
const SKILL_TABLE: &[(&str, SkillCategory, &[&str])] = &[
    // Languages
    ("python", Languages, &["python", "python3", "py", "python developer", "senior python"]),
    ("java", Languages, &["java", "java8", "java11", "jdk"]),
    ("javascript", Languages, &["javascript", "js", "es6", "es2015"]),
    ("typescript", Languages, &["typescript", "ts"]),
    ("go", Languages, &["golang", "go"]),
    ("rust", Languages, &["rust"]),
    ("c++", Languages, &["c++", "cpp", "cplusplus"]),
    ("c#", Languages, &["c#", "csharp", "c sharp"]),
    ("ruby", Languages, &["ruby", "rails", "ruby on rails"]),
    ("php", Languages, &["php"]),
    ("swift", Languages, &["swift"]),
    ("kotlin", Languages, &["kotlin"]),
    ("scala", Languages, &["scala"]),
    // Frameworks
    ("django", Frameworks, &["django"]),
    ("flask", Frameworks, &["flask"]),
    ("fastapi", Frameworks, &["fastapi", "fast api"]),
    ("react", Frameworks, &["react", "reactjs", "react.js"]),
    ("angular", Frameworks, &["angular", "angularjs"]),
    ("vue", Frameworks, &["vue", "vuejs", "vue.js"]),
    ("node", Frameworks, &["node", "nodejs", "node.js"]),
    ("express", Frameworks, &["express", "expressjs"]),
    ("spring", Frameworks, &["spring", "spring boot", "springboot"]),
    // Data stores
    ("sql", DataStores, &["sql", "mysql", "postgresql", "postgres", "mssql", "oracle"]),
    ("mongodb", DataStores, &["mongodb", "mongo"]),
    ("redis", DataStores, &["redis"]),
    ("elasticsearch", DataStores, &["elasticsearch", "elastic search"]),
    ("cassandra", DataStores, &["cassandra"]),
    // Cloud & DevOps
    ("aws", CloudDevops, &["aws", "amazon web services"]),
    ("azure", CloudDevops, &["azure", "microsoft azure"]),
    ("gcp", CloudDevops, &["gcp", "google cloud", "google cloud platform"]),
    ("docker", CloudDevops, &["docker", "containerization"]),
    ("kubernetes", CloudDevops, &["kubernetes", "k8s"]),
    ("jenkins", CloudDevops, &["jenkins"]),
    ("terraform", CloudDevops, &["terraform"]),
    ("ansible", CloudDevops, &["ansible"]),
    // Data & ML
    ("machine learning", DataMl, &["machine learning", "ml", "deep learning", "dl"]),
    ("data science", DataMl, &["data science", "data scientist"]),
    ("pandas", DataMl, &["pandas"]),
    ("numpy", DataMl, &["numpy"]),
    ("tensorflow", DataMl, &["tensorflow", "tf"]),
    ("pytorch", DataMl, &["pytorch"]),
    ("scikit-learn", DataMl, &["scikit-learn", "sklearn"]),
    // Other
    ("git", Other, &["git", "github", "gitlab", "version control"]),
    ("rest api", Other, &["rest", "restful", "rest api", "api"]),
    ("graphql", Other, &["graphql"]),
    ("microservices", Other, &["microservices", "micro services"]),
    ("agile", Other, &["agile", "scrum", "kanban"]),
];

static SHARED: LazyLock<SkillCanonicalizer> = LazyLock::new(SkillCanonicalizer::new);

/// Lookup key: trimmed, lower-cased, whitespace collapsed, `-` `_` `.` removed.
pub fn lookup_key(raw: &str) -> String {
    collapse_whitespace(&raw.to_lowercase())
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | '.'))
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Regex fragment matching `phrase` as a whole word or whole phrase.
///
/// `+` and `#` count as word characters so "c" never matches inside "c++".
fn boundary_pattern(phrase: &str) -> String {
    let body = phrase
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    format!(r"(?:^|[^a-z0-9_+#]){body}(?:$|[^a-z0-9_+#])")
}

/// Variation table plus the compiled free-text extractor.
pub struct SkillCanonicalizer {
    by_key: HashMap<String, &'static str>,
    categories: HashMap<&'static str, SkillCategory>,
    spellings: HashMap<&'static str, Vec<&'static str>>,
    extractor: SkillExtractor,
}

impl SkillCanonicalizer {
    pub fn new() -> Self {
        let mut by_key = HashMap::new();
        let mut categories = HashMap::new();
        let mut spellings: HashMap<&'static str, Vec<&'static str>> = HashMap::new();

        // Canonical ids first so canonicalize() is a fixed point on them.
        for &(canonical, category, _) in SKILL_TABLE {
            by_key.insert(lookup_key(canonical), canonical);
            categories.insert(canonical, category);
            spellings.entry(canonical).or_default().push(canonical);
        }
        for &(canonical, _, variations) in SKILL_TABLE {
            for &variation in variations {
                by_key.entry(lookup_key(variation)).or_insert(canonical);
                let known = spellings.entry(canonical).or_default();
                if !known.contains(&variation) {
                    known.push(variation);
                }
            }
        }

        let phrases = spellings
            .iter()
            .flat_map(|(canonical, variants)| {
                variants.iter().map(move |v| (v.to_string(), canonical.to_string()))
            })
            .collect::<Vec<_>>();
        let extractor = SkillExtractor::build(phrases);

        Self {
            by_key,
            categories,
            spellings,
            extractor,
        }
    }

    /// Process-wide instance; the table is static so building it once is enough.
    pub fn shared() -> &'static SkillCanonicalizer {
        &SHARED
    }

    /// Maps one raw skill to its canonical id. Unknown skills become their own
    /// trimmed, lower-cased form. Idempotent.
    pub fn canonicalize(&self, raw: &str) -> String {
        match self.by_key.get(&lookup_key(raw)) {
            Some(canonical) => canonical.to_string(),
            None => collapse_whitespace(&raw.to_lowercase()),
        }
    }

    /// Canonicalizes a list, dropping blanks and duplicates.
    pub fn canonicalize_all<S: AsRef<str>>(&self, raw: &[S]) -> CanonicalSkillSet {
        raw.iter()
            .map(|s| s.as_ref())
            .filter(|s| !s.trim().is_empty())
            .map(|s| self.canonicalize(s))
            .collect()
    }

    /// Finds every known skill spelled anywhere in `text` (whole words/phrases only).
    pub fn extract_skills(&self, text: &str) -> CanonicalSkillSet {
        self.extractor.extract(text)
    }

    /// Builds an extractor that only recognises the given canonical skills, through
    /// all their known spellings plus the id itself (covers open-vocabulary ids).
    pub fn anchored_extractor(&self, vocabulary: &CanonicalSkillSet) -> SkillExtractor {
        let phrases = vocabulary
            .iter()
            .flat_map(|canonical| {
                let mut variants: Vec<String> = self
                    .spellings
                    .get(canonical.as_str())
                    .map(|v| v.iter().map(|s| s.to_string()).collect())
                    .unwrap_or_default();
                if !variants.iter().any(|v| v == canonical) {
                    variants.push(canonical.clone());
                }
                variants.into_iter().map(move |v| (v, canonical.clone()))
            })
            .collect::<Vec<_>>();
        SkillExtractor::build(phrases)
    }

    pub fn category_of(&self, canonical: &str) -> SkillCategory {
        self.categories.get(canonical).copied().unwrap_or(Other)
    }

    /// Canonical skills a requirement asks for: text-extracted from title and
    /// description, unioned with the canonicalized explicit skill list.
    pub fn requirement_skills(&self, requirement: &Requirement) -> CanonicalSkillSet {
        let text = format!("{} {}", requirement.title, requirement.description);
        let mut skills = self.extract_skills(&text);
        skills.extend(self.canonicalize_all(&requirement.required_skills));
        skills
    }

    /// Requirement skills bucketed by category, for display and logging.
    pub fn skill_matrix(&self, requirement: &Requirement) -> SkillMatrix {
        let all_skills = self.requirement_skills(requirement);

        let mut by_category: BTreeMap<SkillCategory, Vec<String>> = SkillCategory::ALL
            .iter()
            .map(|c| (*c, Vec::new()))
            .collect();
        for skill in &all_skills {
            by_category
                .entry(self.category_of(skill))
                .or_default()
                .push(skill.clone());
        }
        let counts = by_category
            .iter()
            .map(|(category, skills)| (*category, skills.len()))
            .collect::<BTreeMap<_, _>>();

        info!(
            "Extracted {} skills from requirement '{}' (languages={}, frameworks={}, data_stores={})",
            all_skills.len(),
            requirement.title,
            counts[&Languages],
            counts[&Frameworks],
            counts[&DataStores],
        );

        SkillMatrix {
            total_count: all_skills.len(),
            all_skills: all_skills.into_iter().collect(),
            by_category,
            counts,
            experience_years: requirement.required_years(),
            location: requirement.location.clone().unwrap_or_default(),
        }
    }
}

impl Default for SkillCanonicalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Compiled set of whole-word skill patterns.
pub struct SkillExtractor {
    set: Option<RegexSet>,
    labels: Vec<String>,
}

impl SkillExtractor {
    fn build(phrases: Vec<(String, String)>) -> Self {
        let (patterns, labels): (Vec<String>, Vec<String>) = phrases
            .into_iter()
            .filter(|(phrase, _)| !phrase.trim().is_empty())
            .map(|(phrase, canonical)| (boundary_pattern(&phrase.to_lowercase()), canonical))
            .unzip();

        let set = if patterns.is_empty() {
            None
        } else {
            match RegexSet::new(&patterns) {
                Ok(set) => Some(set),
                Err(e) => {
                    // Every fragment is regex::escape'd; only a size limit can trip this.
                    warn!("Skill pattern set failed to compile, extraction disabled: {e}");
                    None
                }
            }
        };

        Self { set, labels }
    }

    pub fn extract(&self, text: &str) -> CanonicalSkillSet {
        let Some(set) = &self.set else {
            return CanonicalSkillSet::new();
        };
        if text.trim().is_empty() {
            return CanonicalSkillSet::new();
        }
        let lowered = text.to_lowercase();
        set.matches(&lowered)
            .into_iter()
            .map(|idx| self.labels[idx].clone())
            .collect()
    }
}

/// Requirement skills with display buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMatrix {
    pub all_skills: Vec<String>,
    pub by_category: BTreeMap<SkillCategory, Vec<String>>,
    pub counts: BTreeMap<SkillCategory, usize>,
    pub total_count: usize,
    pub experience_years: u32,
    pub location: String,
}

/// Detailed overlap between a job's skills and a candidate's, both canonical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMatchDetail {
    pub score: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub extra_skills: Vec<String>,
    pub match_count: usize,
    pub required_count: usize,
}

/// Overlap detail for explanations. An empty job skill set scores 0 here; the
/// matchers apply their own neutral value through [`skill_overlap_score`].
pub fn skill_match_detail(
    job_skills: &CanonicalSkillSet,
    candidate_skills: &CanonicalSkillSet,
) -> SkillMatchDetail {
    let matched: Vec<String> = job_skills.intersection(candidate_skills).cloned().collect();
    let missing: Vec<String> = job_skills.difference(candidate_skills).cloned().collect();
    let extra: Vec<String> = candidate_skills.difference(job_skills).cloned().collect();
    let score = if job_skills.is_empty() {
        0.0
    } else {
        matched.len() as f64 / job_skills.len() as f64
    };
    SkillMatchDetail {
        score,
        match_count: matched.len(),
        required_count: job_skills.len(),
        matched_skills: matched,
        missing_skills: missing,
        extra_skills: extra,
    }
}

/// Score used when the requirement names no skills: no signal either way.
pub const NEUTRAL_SKILL_SCORE: f64 = 0.5;

/// |candidate ∩ required| / |required|, or the neutral 0.5 when nothing is required.
pub fn skill_overlap_score(required: &CanonicalSkillSet, candidate: &CanonicalSkillSet) -> f64 {
    if required.is_empty() {
        return NEUTRAL_SKILL_SCORE;
    }
    required.intersection(candidate).count() as f64 / required.len() as f64
}

/// Canonical skills to score a candidate with: the explicit list when present,
/// otherwise skills inferred from title and summary against the requirement's own
/// vocabulary.
pub fn effective_candidate_skills(
    canonicalizer: &SkillCanonicalizer,
    anchored: &SkillExtractor,
    candidate: &crate::models::CandidateRecord,
) -> CanonicalSkillSet {
    if candidate.has_explicit_skills() {
        canonicalizer.canonicalize_all(&candidate.skills)
    } else {
        anchored.extract(&candidate.inference_text())
    }
}
