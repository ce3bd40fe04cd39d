//! Response Parser: turns free-text model replies into structured values.
//!
//! Default: `LenientParser`, which scans labeled lines for scores and takes the
//! span from the first `[` to the last `]` as the recommendation array.
//! Stray brackets in prose or nested arrays inside values can defeat that
//! scan; a stricter parser can replace it behind the `ResponseParser` trait
//! without touching the orchestrator.
//!
//! Parsing never fails. A field that cannot be extracted is reported as absent
//! and the degradation policy decides what to substitute.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::assessment::models::{
    clamp_score, ComplianceLevel, Priority, Recommendation, RecommendationType, Resource,
};

/// Recommendations kept from any single reply.
pub const MAX_RECOMMENDATIONS: usize = 5;

const ENVIRONMENTAL_LABEL: &str = "Environmental Score:";
const SOCIAL_LABEL: &str = "Social Score:";
const GOVERNANCE_LABEL: &str = "Governance Score:";
const OVERALL_LABEL: &str = "Overall Score:";
const COMPLIANCE_LABEL: &str = "Compliance Level:";

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

/// Scores as found in a reply. `None` means the label was missing or its value
/// did not parse; it is never coerced to zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedScores {
    pub environmental: Option<f64>,
    pub social: Option<f64>,
    pub governance: Option<f64>,
    pub overall: Option<f64>,
    pub compliance_level: Option<ComplianceLevel>,
}

impl ParsedScores {
    pub fn is_empty(&self) -> bool {
        self.environmental.is_none()
            && self.social.is_none()
            && self.governance.is_none()
            && self.overall.is_none()
            && self.compliance_level.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.environmental.is_some()
            && self.social.is_some()
            && self.governance.is_some()
            && self.overall.is_some()
            && self.compliance_level.is_some()
    }
}

/// Field defaults applied to each recommendation record.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationDefaults {
    pub title: &'static str,
    pub description: &'static str,
    pub estimated_impact: &'static str,
    pub timeframe: &'static str,
    pub required_actions: &'static [&'static str],
    pub related_criteria: &'static [&'static str],
}

impl RecommendationDefaults {
    /// Defaults for the main recommendation call.
    pub const PRIMARY: RecommendationDefaults = RecommendationDefaults {
        title: "ESG Improvement",
        description: "No description available",
        estimated_impact: "Positive impact on ESG score",
        timeframe: "3-6 months",
        required_actions: &["Review current practices", "Implement improvements"],
        related_criteria: &[],
    };

    /// Defaults for the simplified secondary call.
    pub const SECONDARY: RecommendationDefaults = RecommendationDefaults {
        title: "ESG Improvement",
        description: "Improve ESG practices",
        estimated_impact: "Positive impact on ESG performance",
        timeframe: "3-6 months",
        required_actions: &["Review current practices", "Implement improvements"],
        related_criteria: &["ESG Management"],
    };
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Implement this to swap extraction strategies without touching callers.
///
/// Carried by `AssessmentOrchestrator` as `Box<dyn ResponseParser>`.
pub trait ResponseParser: Send + Sync {
    fn parse_scores(&self, text: &str) -> ParsedScores;

    /// Returns at most `MAX_RECOMMENDATIONS` records; empty when no usable
    /// array was found.
    fn parse_recommendations(
        &self,
        text: &str,
        defaults: &RecommendationDefaults,
    ) -> Vec<Recommendation>;
}

// ────────────────────────────────────────────────────────────────────────────
// LenientParser: default implementation
// ────────────────────────────────────────────────────────────────────────────

/// Tolerates surrounding prose, code fences, missing fields and odd casing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LenientParser;

impl ResponseParser for LenientParser {
    fn parse_scores(&self, text: &str) -> ParsedScores {
        let mut scores = ParsedScores::default();

        for line in text.lines() {
            if let Some(value) = labeled_value(line, ENVIRONMENTAL_LABEL) {
                if let Some(v) = parse_score(value) {
                    scores.environmental = Some(v);
                }
            } else if let Some(value) = labeled_value(line, SOCIAL_LABEL) {
                if let Some(v) = parse_score(value) {
                    scores.social = Some(v);
                }
            } else if let Some(value) = labeled_value(line, GOVERNANCE_LABEL) {
                if let Some(v) = parse_score(value) {
                    scores.governance = Some(v);
                }
            } else if let Some(value) = labeled_value(line, OVERALL_LABEL) {
                if let Some(v) = parse_score(value) {
                    scores.overall = Some(v);
                }
            } else if let Some(value) = labeled_value(line, COMPLIANCE_LABEL) {
                if let Ok(level) = value.parse::<ComplianceLevel>() {
                    scores.compliance_level = Some(level);
                }
            }
        }

        scores
    }

    fn parse_recommendations(
        &self,
        text: &str,
        defaults: &RecommendationDefaults,
    ) -> Vec<Recommendation> {
        let records = match extract_json_array(text) {
            Some(records) => records,
            None => return Vec::new(),
        };

        let mut seen_ids = HashSet::new();
        records
            .iter()
            .take(MAX_RECOMMENDATIONS)
            .enumerate()
            .filter_map(|(index, record)| {
                let object = record.as_object()?;
                let mut rec = build_recommendation(index, object, defaults);
                if seen_ids.contains(&rec.id) {
                    rec.id = generated_id(index);
                    let mut suffix = 2;
                    while seen_ids.contains(&rec.id) {
                        rec.id = format!("{}_{suffix}", generated_id(index));
                        suffix += 1;
                    }
                }
                seen_ids.insert(rec.id.clone());
                Some(rec)
            })
            .collect()
    }
}

/// Text after `label` on this line, up to the next `:`.
fn labeled_value<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let start = line.find(label)? + label.len();
    let rest = &line[start..];
    Some(rest.split(':').next().unwrap_or(rest).trim())
}

fn parse_score(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(clamp_score)
}

/// Slices from the first `[` to the last `]` and decodes it as a JSON array.
pub fn extract_json_array(text: &str) -> Option<Vec<Value>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn generated_id(index: usize) -> String {
    format!("rec_{:03}", index + 1)
}

fn build_recommendation(
    index: usize,
    record: &Map<String, Value>,
    defaults: &RecommendationDefaults,
) -> Recommendation {
    let text = |key: &str| {
        record
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let required_actions = string_list(record.get("requiredActions"))
        .filter(|actions| !actions.is_empty())
        .unwrap_or_else(|| owned(defaults.required_actions));

    Recommendation {
        id: text("id")
            .map(str::to_string)
            .unwrap_or_else(|| generated_id(index)),
        rec_type: text("type")
            .and_then(RecommendationType::from_label)
            .unwrap_or_default(),
        title: text("title").unwrap_or(defaults.title).to_string(),
        description: text("description")
            .unwrap_or(defaults.description)
            .to_string(),
        priority: text("priority")
            .and_then(Priority::from_label)
            .unwrap_or_default(),
        estimated_impact: text("estimatedImpact")
            .unwrap_or(defaults.estimated_impact)
            .to_string(),
        timeframe: text("timeframe").unwrap_or(defaults.timeframe).to_string(),
        required_actions,
        related_criteria: string_list(record.get("relatedCriteria"))
            .unwrap_or_else(|| owned(defaults.related_criteria)),
        resources: resources(record.get("resources")),
    }
}

/// Non-empty strings from a JSON array; `None` when the value is not an array.
fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let items = value?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

fn resources(value: Option<&Value>) -> Vec<Resource> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|obj| {
            let field = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
            Some(Resource {
                title: field("title")?,
                resource_type: field("type").unwrap_or_else(|| "document".to_string()),
                description: field("description").unwrap_or_default(),
                url: field("url"),
            })
        })
        .collect()
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
