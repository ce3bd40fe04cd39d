// Prompt templates for the assessment pipeline, and the functions that fill them.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::assessment::models::{
    AssessmentRequest, BusinessProfile, CriterionResponse, EsgScores, SizeClass,
};
use crate::llm_client::prompts::{ESG_ANALYST_PREAMBLE, SME_CONTEXT_INSTRUCTION};

/// Responses included in the scoring prompt. Bounds the cost of the model call.
pub const SCORING_RESPONSE_LIMIT: usize = 5;
/// Responses included in the recommendation prompt.
pub const RECOMMENDATION_RESPONSE_LIMIT: usize = 3;

const UNKNOWN: &str = "Unknown";

/// Scoring prompt template.
/// Replace: {preamble}, {name}, {industry}, {size}, {employees}, {framework},
///          {responses_json}, {sme_context}
pub const SCORING_PROMPT_TEMPLATE: &str = r#"{preamble}

Analyze this Malaysian SME's ESG assessment and provide numerical scores (0-100):

Company: {name}
Industry: {industry}
Size: {size} ({employees} employees)
Framework: {framework}

Assessment Responses: {responses_json}

Provide scores in this exact format:
Environmental Score: [0-100]
Social Score: [0-100]
Governance Score: [0-100]
Overall Score: [0-100]
Compliance Level: [Excellent|Good|Needs Improvement|Poor]

Weight the categories Environmental 40%, Social 35%, Governance 25%.
{sme_context}"#;

/// Recommendation prompt template.
/// Replace: {name}, {industry}, {employees}, {environmental}, {social},
///          {governance}, {overall}, {responses_json}, {schema}
pub const RECOMMENDATION_PROMPT_TEMPLATE: &str = r#"Based on the ESG assessment results for {name} in the {industry} industry with {employees} employees:

ESG Scores:
- Environmental: {environmental}
- Social: {social}
- Governance: {governance}
- Overall: {overall}

Assessment Responses: {responses_json}

Generate 3-5 specific, actionable ESG improvement recommendations for Malaysian SMEs.
Focus on practical steps with clear timeframes and expected impacts.

Return as JSON array with format:
{schema}"#;

/// Simplified prompt for the secondary recommendation fallback.
/// Replace: {industry}, {size}, {schema}, {sme_context}
pub const FALLBACK_RECOMMENDATION_PROMPT_TEMPLATE: &str = r#"Generate 4-5 diverse ESG improvement recommendations for Malaysian SMEs.

Business Context: {industry} industry
Company Size: {size}

Focus Areas (vary priorities and timeframes):
- Environmental: Energy efficiency, waste reduction, sustainable sourcing
- Social: Employee welfare, community engagement, workplace safety
- Governance: Transparency, ethics, stakeholder engagement
- Operational: Digital transformation, supply chain sustainability

Return as JSON array with this exact format:
{schema}

{sme_context}"#;

/// Record shape the model is asked to produce.
pub const RECOMMENDATION_SCHEMA: &str = r#"[{
    "id": "rec_001",
    "type": "improvement",
    "title": "Short recommendation title",
    "description": "Detailed recommendation description",
    "priority": "high|medium|low",
    "estimatedImpact": "Expected impact description with specific metrics",
    "timeframe": "Implementation timeframe (e.g., 3-6 months)",
    "requiredActions": ["Specific action 1", "Specific action 2", "Specific action 3"],
    "relatedCriteria": ["Environmental management", "Energy efficiency"],
    "resources": [{"title": "Resource name", "type": "document", "description": "Resource description"}]
}]"#;

/// Renders the score-extraction prompt. Only the first five responses are included.
pub fn build_scoring_prompt(request: &AssessmentRequest) -> String {
    let business = &request.business;
    render(
        SCORING_PROMPT_TEMPLATE,
        &[
            ("preamble", ESG_ANALYST_PREAMBLE),
            ("name", text_or_unknown(&business.name)),
            ("industry", text_or_unknown(&business.industry)),
            ("size", size_label(business)),
            ("employees", &employees_label(business)),
            ("framework", request.framework.label()),
            (
                "responses_json",
                &responses_json(&request.responses, SCORING_RESPONSE_LIMIT),
            ),
            ("sme_context", SME_CONTEXT_INSTRUCTION),
        ],
    )
}

/// Renders the recommendation prompt from whichever scores were obtained.
/// Only the first three responses are included.
pub fn build_recommendation_prompt(request: &AssessmentRequest, scores: &EsgScores) -> String {
    let business = &request.business;
    render(
        RECOMMENDATION_PROMPT_TEMPLATE,
        &[
            ("name", business.name.as_deref().unwrap_or("this company")),
            ("industry", business.industry.as_deref().unwrap_or("unknown")),
            ("employees", &employees_label(business)),
            ("environmental", &scores.environmental_score.to_string()),
            ("social", &scores.social_score.to_string()),
            ("governance", &scores.governance_score.to_string()),
            ("overall", &scores.overall_score.to_string()),
            (
                "responses_json",
                &responses_json(&request.responses, RECOMMENDATION_RESPONSE_LIMIT),
            ),
            ("schema", RECOMMENDATION_SCHEMA),
        ],
    )
}

/// Renders the context-light prompt used when the main recommendation call
/// produced nothing usable.
pub fn build_fallback_recommendation_prompt(business: &BusinessProfile) -> String {
    let size = match business.size {
        SizeClass::Unknown => "SME",
        known => known.as_str(),
    };
    render(
        FALLBACK_RECOMMENDATION_PROMPT_TEMPLATE,
        &[
            ("industry", business.industry.as_deref().unwrap_or("General")),
            ("size", size),
            ("schema", RECOMMENDATION_SCHEMA),
            ("sme_context", SME_CONTEXT_INSTRUCTION),
        ],
    )
}

/// Fills `{key}` placeholders in one pass over the template. Substituted
/// values are never scanned again, so placeholder-like text in user input
/// stays literal. Unknown `{...}` sequences are copied as is.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_brace = &rest[open + 1..];
        let hit = values.iter().find_map(|(key, value)| {
            let after = after_brace.strip_prefix(key)?.strip_prefix('}')?;
            Some((*value, after))
        });
        match hit {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = after_brace;
            }
        }
    }

    out.push_str(rest);
    out
}

fn text_or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(UNKNOWN)
}

fn size_label(business: &BusinessProfile) -> &'static str {
    match business.size {
        SizeClass::Unknown => UNKNOWN,
        known => known.as_str(),
    }
}

fn employees_label(business: &BusinessProfile) -> String {
    match business.employees {
        Some(n) if n.fract() == 0.0 => format!("{}", n as i64),
        Some(n) => n.to_string(),
        None => UNKNOWN.to_string(),
    }
}

/// JSON rendering of the first `limit` responses.
fn responses_json(responses: &[CriterionResponse], limit: usize) -> String {
    let bounded = &responses[..responses.len().min(limit)];
    serde_json::to_string(bounded).unwrap_or_else(|_| "[]".to_string())
}
