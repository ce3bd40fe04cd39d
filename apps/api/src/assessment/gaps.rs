use crate::assessment::models::EsgScores;

/// Category scores below this are reported as compliance gaps.
pub const GAP_THRESHOLD: f64 = 60.0;

/// Lists the categories whose score falls below `GAP_THRESHOLD`, in
/// environmental, social, governance order.
pub fn identify_compliance_gaps(scores: &EsgScores) -> Vec<String> {
    let checks = [
        (
            scores.environmental_score,
            "Environmental management systems need strengthening",
        ),
        (
            scores.social_score,
            "Workplace safety and employee welfare require attention",
        ),
        (
            scores.governance_score,
            "Corporate governance framework needs implementation",
        ),
    ];

    checks
        .into_iter()
        .filter(|(score, _)| *score < GAP_THRESHOLD)
        .map(|(_, gap)| gap.to_string())
        .collect()
}
