//! Degradation policy: deterministic stand-ins for anything the model could
//! not provide. Nothing here calls out or fails.

use crate::assessment::models::{
    ComplianceLevel, EsgScores, Priority, Recommendation, RecommendationType, Resource,
};
use crate::assessment::parser::ParsedScores;

/// Gap reported when the request payload itself could not be read.
pub const UNPROCESSABLE_GAP: &str =
    "Assessment processing encountered issues - manual review recommended";

/// Fallback scores depend only on how many responses were submitted:
/// base = 65 + 2n, environmental +5, governance −5, all capped at 100.
pub fn fallback_scores(response_count: usize) -> EsgScores {
    let base = 65.0 + 2.0 * response_count as f64;
    let compliance_level = if base > 70.0 {
        ComplianceLevel::Good
    } else {
        ComplianceLevel::NeedsImprovement
    };
    EsgScores::new(
        (base + 5.0).min(100.0),
        base.min(100.0),
        (base - 5.0).min(100.0),
        base.min(100.0),
        compliance_level,
    )
}

/// Completes a partial parse with the fallback value for each absent field.
///
/// Returns `None` when nothing at all was parsed; the caller treats that as a
/// parse failure rather than a partial success.
pub fn fill_missing(parsed: &ParsedScores, response_count: usize) -> Option<EsgScores> {
    if parsed.is_empty() {
        return None;
    }
    let fallback = fallback_scores(response_count);
    Some(EsgScores::new(
        parsed.environmental.unwrap_or(fallback.environmental_score),
        parsed.social.unwrap_or(fallback.social_score),
        parsed.governance.unwrap_or(fallback.governance_score),
        parsed.overall.unwrap_or(fallback.overall_score),
        parsed.compliance_level.unwrap_or(fallback.compliance_level),
    ))
}

/// Last-resort recommendation set, used only when the secondary model call
/// also produced nothing.
pub fn static_recommendations() -> Vec<Recommendation> {
    vec![
        static_recommendation(
            "rec_001",
            "Implement Energy Management System",
            "Establish systematic tracking and reduction of energy consumption across all operations",
            Priority::High,
            "10-15% reduction in energy costs and 8-12% reduction in carbon footprint",
            "3-6 months",
            &[
                "Install smart sub-metering systems",
                "Conduct comprehensive energy audit",
                "Set measurable reduction targets",
                "Train staff on energy monitoring",
            ],
            &["Environmental Management", "Energy Efficiency"],
            Resource::new(
                "Energy Audit Guide",
                "document",
                "Comprehensive guide for conducting energy audits",
            ),
        ),
        static_recommendation(
            "rec_002",
            "Enhance Workplace Safety Program",
            "Strengthen safety training and incident reporting systems to improve workplace culture",
            Priority::High,
            "50% reduction in workplace incidents and 20% decrease in insurance premiums",
            "2-4 months",
            &[
                "Update safety protocols and procedures",
                "Increase training frequency to monthly",
                "Implement digital incident reporting system",
                "Conduct regular safety audits",
            ],
            &["Workplace Safety", "Employee Welfare"],
            Resource::new(
                "DOSH Safety Guidelines",
                "website",
                "Malaysian workplace safety regulations",
            ),
        ),
        static_recommendation(
            "rec_003",
            "Establish Waste Reduction Program",
            "Implement comprehensive waste management and circular economy practices",
            Priority::Medium,
            "30-40% reduction in waste disposal costs and improved environmental compliance",
            "4-6 months",
            &[
                "Conduct waste audit",
                "Implement recycling programs",
                "Partner with waste management vendors",
                "Train employees on waste reduction",
            ],
            &["Environmental Management", "Waste Management"],
            Resource::new(
                "Malaysian Waste Management Guidelines",
                "document",
                "Government guidelines for SME waste management",
            ),
        ),
        static_recommendation(
            "rec_004",
            "Develop Employee Engagement Initiative",
            "Create structured programs for employee wellness, development, and community involvement",
            Priority::Medium,
            "25% improvement in employee retention and 15% increase in productivity",
            "3-5 months",
            &[
                "Launch employee wellness program",
                "Establish skills development pathways",
                "Create community volunteer opportunities",
                "Implement feedback systems",
            ],
            &["Employee Welfare", "Community Engagement"],
            Resource::new(
                "Employee Engagement Best Practices",
                "guide",
                "Comprehensive guide for SME employee programs",
            ),
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn static_recommendation(
    id: &str,
    title: &str,
    description: &str,
    priority: Priority,
    estimated_impact: &str,
    timeframe: &str,
    required_actions: &[&str],
    related_criteria: &[&str],
    resource: Resource,
) -> Recommendation {
    Recommendation {
        id: id.to_string(),
        rec_type: RecommendationType::Improvement,
        title: title.to_string(),
        description: description.to_string(),
        priority,
        estimated_impact: estimated_impact.to_string(),
        timeframe: timeframe.to_string(),
        required_actions: required_actions.iter().map(|s| s.to_string()).collect(),
        related_criteria: related_criteria.iter().map(|s| s.to_string()).collect(),
        resources: vec![resource],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fallback_overall_is_65_plus_2n_capped() {
        for n in 0..30 {
            let scores = fallback_scores(n);
            let expected = (65.0 + 2.0 * n as f64).min(100.0);
            assert_eq!(scores.overall_score, expected, "n={n}");
            assert!((0.0..=100.0).contains(&scores.overall_score));
        }
    }

    #[test]
    fn test_fallback_category_offsets() {
        // n=5 → base 75
        let scores = fallback_scores(5);
        assert_eq!(scores.environmental_score, 80.0);
        assert_eq!(scores.social_score, 75.0);
        assert_eq!(scores.governance_score, 70.0);
        assert_eq!(scores.overall_score, 75.0);
        assert_eq!(scores.compliance_level, ComplianceLevel::Good);
    }

    #[test]
    fn test_fallback_label_threshold_is_strictly_above_70() {
        // n=2 → base 69; n=3 → base 71
        assert_eq!(
            fallback_scores(2).compliance_level,
            ComplianceLevel::NeedsImprovement
        );
        assert_eq!(fallback_scores(3).compliance_level, ComplianceLevel::Good);
    }

    #[test]
    fn test_fallback_caps_environmental_at_100() {
        // n=16 → base 97, environmental 102 → 100
        let scores = fallback_scores(16);
        assert_eq!(scores.environmental_score, 100.0);
        assert_eq!(scores.governance_score, 92.0);
    }

    #[test]
    fn test_fill_missing_uses_fallback_per_field() {
        let parsed = ParsedScores {
            environmental: Some(40.0),
            overall: Some(55.0),
            ..Default::default()
        };
        let scores = fill_missing(&parsed, 0).unwrap();
        assert_eq!(scores.environmental_score, 40.0);
        assert_eq!(scores.social_score, 65.0);
        assert_eq!(scores.governance_score, 60.0);
        assert_eq!(scores.overall_score, 55.0);
        assert_eq!(scores.compliance_level, ComplianceLevel::NeedsImprovement);
    }

    #[test]
    fn test_fill_missing_rejects_empty_parse() {
        assert!(fill_missing(&ParsedScores::default(), 3).is_none());
    }

    #[test]
    fn test_static_recommendations_are_well_formed() {
        let recs = static_recommendations();
        assert_eq!(recs.len(), 4);
        let ids: HashSet<&str> = recs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 4);
        for rec in &recs {
            assert!(!rec.required_actions.is_empty());
            assert_eq!(rec.rec_type, RecommendationType::Improvement);
        }
        assert_eq!(recs[0].title, "Implement Energy Management System");
        assert_eq!(recs[1].priority, Priority::High);
        assert_eq!(recs[3].priority, Priority::Medium);
    }

    #[test]
    fn test_static_resource_types() {
        let types: Vec<String> = static_recommendations()
            .into_iter()
            .map(|r| r.resources[0].resource_type.clone())
            .collect();
        assert_eq!(types, vec!["document", "website", "document", "guide"]);
    }
}
