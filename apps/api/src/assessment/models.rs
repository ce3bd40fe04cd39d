//! Request and result types for an ESG assessment.
//!
//! Inbound types are deliberately forgiving: a missing or oddly-typed field
//! becomes its default instead of rejecting the whole payload.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Weights used for the locally computed overall score.
pub const ENVIRONMENTAL_WEIGHT: f64 = 0.40;
pub const SOCIAL_WEIGHT: f64 = 0.35;
pub const GOVERNANCE_WEIGHT: f64 = 0.25;

// ────────────────────────────────────────────────────────────────────────────
// Inbound
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentRequest {
    #[serde(deserialize_with = "object_or_default")]
    pub business: BusinessProfile,
    /// Every array element counts; an unreadable element becomes an empty response.
    #[serde(deserialize_with = "lenient_responses")]
    pub responses: Vec<CriterionResponse>,
    pub framework: Framework,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BusinessProfile {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub industry: Option<String>,
    pub size: SizeClass,
    #[serde(deserialize_with = "lenient_number")]
    pub employees: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub revenue: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub established_year: Option<f64>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,
}

/// A single assessment answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CriterionResponse {
    #[serde(deserialize_with = "lenient_string")]
    pub criterion_id: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub score: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub evidence: Option<String>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(deserialize_with = "lenient_string_list", skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<String>,
}

/// Business size class. Anything unrecognised is `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SizeClass {
    Micro,
    Small,
    Medium,
    Large,
    #[default]
    Unknown,
}

impl SizeClass {
    pub fn as_str(self) -> &'static str {
        match self {
            SizeClass::Micro => "micro",
            SizeClass::Small => "small",
            SizeClass::Medium => "medium",
            SizeClass::Large => "large",
            SizeClass::Unknown => "unknown",
        }
    }

    /// Micro, small and medium enterprises.
    pub fn is_sme(self) -> bool {
        matches!(self, SizeClass::Micro | SizeClass::Small | SizeClass::Medium)
    }

    fn from_label(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "micro" => SizeClass::Micro,
            "small" => SizeClass::Small,
            "medium" => SizeClass::Medium,
            "large" => SizeClass::Large,
            _ => SizeClass::Unknown,
        }
    }
}

impl Serialize for SizeClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SizeClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = lenient_string(deserializer)?;
        Ok(raw.map(|r| SizeClass::from_label(&r)).unwrap_or_default())
    }
}

/// Supported ESG assessment frameworks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Framework {
    #[default]
    Nsrf,
    Iesg,
    SmeCorp,
}

impl Framework {
    pub const ALL: [Framework; 3] = [Framework::Nsrf, Framework::Iesg, Framework::SmeCorp];

    /// Label as sent to the model and returned to callers.
    pub fn label(self) -> &'static str {
        match self {
            Framework::Nsrf => "NSRF",
            Framework::Iesg => "i-ESG",
            Framework::SmeCorp => "SME Corp Guide",
        }
    }

    /// Short URL-safe identifier.
    pub fn id(self) -> &'static str {
        match self {
            Framework::Nsrf => "nsrf",
            Framework::Iesg => "iesg",
            Framework::SmeCorp => "sme-corp",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "nsrf" => Some(Framework::Nsrf),
            "iesg" => Some(Framework::Iesg),
            "smecorp" | "smecorpguide" => Some(Framework::SmeCorp),
            _ => None,
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Framework {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Framework {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = lenient_string(deserializer)?;
        Ok(match raw {
            None => Framework::default(),
            Some(label) => Framework::from_label(&label).unwrap_or_else(|| {
                tracing::warn!("Unknown framework '{label}', assessing against NSRF");
                Framework::default()
            }),
        })
    }
}

/// Accepts strings, numbers and booleans as text; anything else is absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Accepts numbers and numeric strings; anything else is absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

/// A single string becomes a one-item list; non-text items and other shapes are dropped.
fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = |value: Value| match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    };
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(text).collect(),
        other => text(other).into_iter().collect(),
    })
}

/// Falls back to `T::default()` unless the value is an object `T` accepts.
fn object_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(object_value_or_default(Value::deserialize(deserializer)?))
}

fn object_value_or_default<T: DeserializeOwned + Default>(value: Value) -> T {
    match value {
        Value::Object(_) => T::deserialize(value).unwrap_or_default(),
        _ => T::default(),
    }
}

fn lenient_responses<'de, D>(deserializer: D) -> Result<Vec<CriterionResponse>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(object_value_or_default::<CriterionResponse>)
            .collect(),
        _ => Vec::new(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Scores
// ────────────────────────────────────────────────────────────────────────────

/// Compliance label. Covers both the tiered financing-readiness scale and the
/// coarser four-step scale the scoring prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceLevel {
    #[serde(rename = "Needs Foundation")]
    NeedsFoundation,
    #[serde(rename = "Progressing")]
    Progressing,
    #[serde(rename = "Financing-Ready")]
    FinancingReady,
    #[serde(rename = "Poor")]
    Poor,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
    #[serde(rename = "Good")]
    Good,
    #[serde(rename = "Excellent")]
    Excellent,
}

impl ComplianceLevel {
    pub fn label(self) -> &'static str {
        match self {
            ComplianceLevel::NeedsFoundation => "Needs Foundation",
            ComplianceLevel::Progressing => "Progressing",
            ComplianceLevel::FinancingReady => "Financing-Ready",
            ComplianceLevel::Poor => "Poor",
            ComplianceLevel::NeedsImprovement => "Needs Improvement",
            ComplianceLevel::Good => "Good",
            ComplianceLevel::Excellent => "Excellent",
        }
    }

    /// Financing-readiness tier for a 0–100 score: 0–49, 50–74, 75+.
    pub fn tier_for(score: f64) -> Self {
        if score >= 75.0 {
            ComplianceLevel::FinancingReady
        } else if score >= 50.0 {
            ComplianceLevel::Progressing
        } else {
            ComplianceLevel::NeedsFoundation
        }
    }
}

impl fmt::Display for ComplianceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ComplianceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '.')
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "needsfoundation" => Ok(ComplianceLevel::NeedsFoundation),
            "progressing" => Ok(ComplianceLevel::Progressing),
            "financingready" => Ok(ComplianceLevel::FinancingReady),
            "poor" => Ok(ComplianceLevel::Poor),
            "needsimprovement" => Ok(ComplianceLevel::NeedsImprovement),
            "good" => Ok(ComplianceLevel::Good),
            "excellent" => Ok(ComplianceLevel::Excellent),
            _ => Err(format!("unknown compliance level '{s}'")),
        }
    }
}

/// Final category scores for one assessment.
///
/// `overall_score` is whatever the scoring authority stated (the model, or the
/// fallback policy). `weighted_overall_score` is always recomputed locally from
/// the three categories. The two are reported side by side and never reconciled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsgScores {
    pub environmental_score: f64,
    pub social_score: f64,
    pub governance_score: f64,
    pub overall_score: f64,
    pub weighted_overall_score: f64,
    pub compliance_level: ComplianceLevel,
    /// Tiered label for `weighted_overall_score`, independent of `compliance_level`.
    pub financing_tier: ComplianceLevel,
}

impl EsgScores {
    pub fn new(
        environmental: f64,
        social: f64,
        governance: f64,
        overall: f64,
        compliance_level: ComplianceLevel,
    ) -> Self {
        let environmental = clamp_score(environmental);
        let social = clamp_score(social);
        let governance = clamp_score(governance);
        let weighted = weighted_overall(environmental, social, governance);
        Self {
            environmental_score: environmental,
            social_score: social,
            governance_score: governance,
            overall_score: clamp_score(overall),
            weighted_overall_score: weighted,
            compliance_level,
            financing_tier: ComplianceLevel::tier_for(weighted),
        }
    }
}

/// 0.40·E + 0.35·S + 0.25·G, rounded to one decimal place.
pub fn weighted_overall(environmental: f64, social: f64, governance: f64) -> f64 {
    let raw = ENVIRONMENTAL_WEIGHT * environmental
        + SOCIAL_WEIGHT * social
        + GOVERNANCE_WEIGHT * governance;
    (clamp_score(raw) * 10.0).round() / 10.0
}

pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Recommendations
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    #[default]
    Improvement,
    Grant,
    MarketOpportunity,
    Certification,
}

impl RecommendationType {
    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "improvement" => Some(RecommendationType::Improvement),
            "grant" => Some(RecommendationType::Grant),
            "market_opportunity" => Some(RecommendationType::MarketOpportunity),
            "certification" => Some(RecommendationType::Certification),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Case-insensitive; the model often answers "HIGH" or "High".
    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Resource {
    pub fn new(title: &str, resource_type: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            resource_type: resource_type.to_string(),
            description: description.to_string(),
            url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: String,
    #[serde(rename = "type")]
    pub rec_type: RecommendationType,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub estimated_impact: String,
    pub timeframe: String,
    /// Never empty.
    pub required_actions: Vec<String>,
    pub related_criteria: Vec<String>,
    pub resources: Vec<Resource>,
}

// ────────────────────────────────────────────────────────────────────────────
// Opportunities and result
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantOpportunity {
    pub name: String,
    pub provider: String,
    pub amount: String,
    /// 0.0 – 1.0
    pub eligibility_match_score: f64,
    pub description: String,
    pub deadline: String,
    pub requirements: Vec<String>,
}

/// The `data` block of an assessment response. Built once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub scores: EsgScores,
    /// At most 5.
    pub recommendations: Vec<Recommendation>,
    /// At most 3, best match first.
    pub opportunities: Vec<GrantOpportunity>,
    pub analysis_timestamp: String,
    pub compliance_gaps: Vec<String>,
}
