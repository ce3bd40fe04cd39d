//! Eligibility matching: scores a fixed catalog of funding programs against
//! an assessment's final scores and the business profile.
//!
//! Algorithm (deterministic, no external calls):
//! 1. +0.3 each for environmental, social and governance thresholds met
//! 2. +0.4 for the overall threshold met
//! 3. +0.2 when the business is micro, small or medium
//! 4. cap at 1.0; keep programs scoring above 0.5
//! 5. stable sort descending, keep the top 3
//!
//! An absent threshold is always met; a present one is met when
//! `threshold <= score`.

use serde::Serialize;

use crate::assessment::models::{BusinessProfile, EsgScores, GrantOpportunity};

pub const MAX_OPPORTUNITIES: usize = 3;

// Points are counted in tenths so sums stay exact.
const CATEGORY_POINTS: u32 = 3;
const OVERALL_POINTS: u32 = 4;
const SME_POINTS: u32 = 2;
const MAX_POINTS: u32 = 10;
const INCLUSION_POINTS: u32 = 5;

/// A funding program definition. Read-only; shared across requests.
#[derive(Debug, Clone, Serialize)]
pub struct GrantProgram {
    pub name: &'static str,
    pub provider: &'static str,
    pub amount: &'static str,
    pub description: &'static str,
    pub deadline: &'static str,
    pub requirements: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_environmental_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_social_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_governance_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_overall_score: Option<f64>,
}

/// Malaysian programs the matcher knows about.
pub static GRANT_CATALOG: &[GrantProgram] = &[
    GrantProgram {
        name: "Malaysian Green Technology Financing Scheme",
        provider: "Malaysia Green Technology Corporation",
        amount: "Up to RM 50 million",
        description: "Funding for green technology adoption and sustainable practices",
        deadline: "2024-12-31",
        requirements: &[
            "Green tech project",
            "60% local content",
            "Environmental impact assessment",
        ],
        min_environmental_score: Some(65.0),
        min_social_score: None,
        min_governance_score: None,
        min_overall_score: None,
    },
    GrantProgram {
        name: "SME ESG Excellence Grant",
        provider: "SME Corporation Malaysia",
        amount: "Up to RM 200,000",
        description: "Grant for SMEs achieving ESG excellence",
        deadline: "2024-06-30",
        requirements: &[
            "SME status",
            "ESG assessment completion",
            "Sustainability plan",
        ],
        min_environmental_score: None,
        min_social_score: None,
        min_governance_score: None,
        min_overall_score: Some(60.0),
    },
    GrantProgram {
        name: "Digital Sustainability Fund",
        provider: "Malaysia Digital Economy Corporation",
        amount: "Up to RM 1 million",
        description: "Digital solutions for sustainability and ESG compliance",
        deadline: "2024-09-30",
        requirements: &[
            "Digital solution focus",
            "Sustainability metrics",
            "Malaysian company",
        ],
        min_environmental_score: None,
        min_social_score: None,
        min_governance_score: Some(70.0),
        min_overall_score: None,
    },
];

fn meets(threshold: Option<f64>, score: f64) -> bool {
    threshold.map_or(true, |min| min <= score)
}

/// Match score for one program, in [0, 1].
pub fn eligibility_score(
    program: &GrantProgram,
    scores: &EsgScores,
    business: &BusinessProfile,
) -> f64 {
    eligibility_points(program, scores, business) as f64 / MAX_POINTS as f64
}

fn eligibility_points(
    program: &GrantProgram,
    scores: &EsgScores,
    business: &BusinessProfile,
) -> u32 {
    let mut points = 0;

    if meets(program.min_environmental_score, scores.environmental_score) {
        points += CATEGORY_POINTS;
    }
    if meets(program.min_social_score, scores.social_score) {
        points += CATEGORY_POINTS;
    }
    if meets(program.min_governance_score, scores.governance_score) {
        points += CATEGORY_POINTS;
    }
    if meets(program.min_overall_score, scores.overall_score) {
        points += OVERALL_POINTS;
    }
    if business.size.is_sme() {
        points += SME_POINTS;
    }

    points.min(MAX_POINTS)
}

/// Eligible programs, best match first, at most `MAX_OPPORTUNITIES`.
/// Ties keep catalog order.
pub fn match_opportunities(
    scores: &EsgScores,
    business: &BusinessProfile,
    catalog: &[GrantProgram],
) -> Vec<GrantOpportunity> {
    let mut eligible: Vec<(u32, &GrantProgram)> = catalog
        .iter()
        .map(|program| (eligibility_points(program, scores, business), program))
        .filter(|(points, _)| *points > INCLUSION_POINTS)
        .collect();

    // sort_by is stable, so equal scores stay in catalog order
    eligible.sort_by(|a, b| b.0.cmp(&a.0));

    eligible
        .into_iter()
        .take(MAX_OPPORTUNITIES)
        .map(|(points, program)| GrantOpportunity {
            name: program.name.to_string(),
            provider: program.provider.to_string(),
            amount: program.amount.to_string(),
            eligibility_match_score: points as f64 / MAX_POINTS as f64,
            description: program.description.to_string(),
            deadline: program.deadline.to_string(),
            requirements: program.requirements.iter().map(|r| r.to_string()).collect(),
        })
        .collect()
}
