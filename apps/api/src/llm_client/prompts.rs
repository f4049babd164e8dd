// Shared prompt fragments. Each matching component keeps its own templates in
// matching/prompts.rs; only cross-cutting instructions live here.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps generated explanations tied to the numbers they were given.
pub const GROUNDED_REASONING_INSTRUCTION: &str = "\
    Base your reasoning only on the scores and profile details provided. \
    Do NOT invent employers, projects, or credentials.";
