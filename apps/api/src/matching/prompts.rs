// Prompt constants for the matching pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for requirement expansion.
pub const EXPANSION_SYSTEM: &str =
    "You are a recruitment expert who understands job titles and skill relationships.";

/// Requirement expansion template. Replace `{title}`, `{skills}`, `{additional}` before sending.
pub const EXPANSION_PROMPT_TEMPLATE: &str = r#"Given a job title and required skills, suggest related job titles and an expanded skill list.

Job Title: {title}
Required Skills: {skills}

Return a JSON object with this EXACT schema (no extra fields):
{
  "job_titles": ["Original Title", "Related Title 1", "Related Title 2", "Related Title 3"],
  "skills": ["Skill 1", "Skill 2"]
}

Rules:
- job_titles: 4-5 titles, the original title first, then titles for roles doing similar work.
- skills: every original skill, plus about {additional} closely related skills a candidate for this role would likely list."#;

/// System prompt for shortlist reasoning.
pub const REASONING_SYSTEM: &str = "You are a technical recruiter explaining shortlist decisions \
    to a hiring manager. Be concise and specific.";

/// Reasoning template. Replace every `{placeholder}` before sending.
pub const REASONING_PROMPT_TEMPLATE: &str = r#"Explain why this candidate fits (or does not fit) the job.

Job: {job_title}
Required Skills: {required_skills}
Required Experience: {required_experience}

Candidate: {candidate_name}
Current Title: {candidate_title}
Skills: {candidate_skills}
Experience: {candidate_experience}

Scores (0-1):
- Skills match: {skills_score}
- Experience match: {experience_score}
- Location match: {location_score}
- Overall: {overall_score}
Matched skills: {matched_skills}
Missing skills: {missing_skills}

Write 2-3 sentences of reasoning."#;
