//! Assessment Orchestrator: runs one assessment end to end.
//!
//! Flow: scoring prompt → model → parse scores → recommendation prompt →
//!       model → parse recommendations → eligibility matching → gaps.
//!
//! Each model-backed stage degrades on its own. A failed recommendation call
//! never discards scores that were already obtained, and a failed scoring call
//! still lets the recommendation call run against the fallback scores.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use crate::assessment::eligibility::{match_opportunities, GrantProgram, GRANT_CATALOG};
use crate::assessment::fallback::{
    fallback_scores, fill_missing, static_recommendations, UNPROCESSABLE_GAP,
};
use crate::assessment::gaps::identify_compliance_gaps;
use crate::assessment::models::{
    AssessmentRequest, AssessmentResult, BusinessProfile, EsgScores, Recommendation,
};
use crate::assessment::parser::{LenientParser, RecommendationDefaults, ResponseParser};
use crate::assessment::prompts::{
    build_fallback_recommendation_prompt, build_recommendation_prompt, build_scoring_prompt,
};
use crate::llm_client::{LlmError, ModelGateway, ModelRequest};

/// Output budget and sampling temperature for one kind of model call.
#[derive(Debug, Clone, Copy)]
struct CallProfile {
    max_tokens: u32,
    temperature: f32,
}

const SCORING_CALL: CallProfile = CallProfile {
    max_tokens: 2000,
    temperature: 0.3,
};
const RECOMMENDATION_CALL: CallProfile = CallProfile {
    max_tokens: 3000,
    temperature: 0.5,
};
const FALLBACK_RECOMMENDATION_CALL: CallProfile = CallProfile {
    max_tokens: 4000,
    temperature: 0.7,
};

// ────────────────────────────────────────────────────────────────────────────
// Stage outcomes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scores,
    Recommendations,
    Request,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Scores => "scores",
            Stage::Recommendations => "recommendations",
            Stage::Request => "request",
        })
    }
}

/// Why a stage fell back. Both kinds are recoverable.
#[derive(Debug, Clone, PartialEq)]
pub enum DegradationReason {
    /// The model call could not be completed (network, auth, throttling, timeout).
    Gateway(String),
    /// The model replied but nothing usable could be extracted.
    Parse(String),
    /// The inbound payload could not be read.
    Input(String),
}

impl fmt::Display for DegradationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradationReason::Gateway(msg) => write!(f, "model call failed: {msg}"),
            DegradationReason::Parse(msg) => write!(f, "unusable model reply: {msg}"),
            DegradationReason::Input(msg) => write!(f, "unreadable request: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Degradation {
    pub stage: Stage,
    pub reason: DegradationReason,
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.reason)
    }
}

/// Result of one stage: either what the model produced, or a fallback plus
/// the reason it was needed.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Fresh(T),
    Degraded { value: T, reason: DegradationReason },
}

impl<T> StageOutcome<T> {
    fn split(self, stage: Stage) -> (T, Option<Degradation>) {
        match self {
            StageOutcome::Fresh(value) => (value, None),
            StageOutcome::Degraded { value, reason } => {
                (value, Some(Degradation { stage, reason }))
            }
        }
    }
}

/// A finished assessment and the stages that had to fall back.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub result: AssessmentResult,
    pub degradations: Vec<Degradation>,
}

impl Assessment {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// Degradation reasons joined for the outer `error` field.
    pub fn error_summary(&self) -> Option<String> {
        if self.degradations.is_empty() {
            return None;
        }
        Some(
            self.degradations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

/// Holds no per-request state; one instance is shared across all requests.
pub struct AssessmentOrchestrator {
    gateway: Arc<dyn ModelGateway>,
    parser: Box<dyn ResponseParser>,
    catalog: &'static [GrantProgram],
    model_id: String,
    call_timeout: Duration,
}

impl AssessmentOrchestrator {
    pub fn new(gateway: Arc<dyn ModelGateway>, model_id: String, call_timeout: Duration) -> Self {
        Self {
            gateway,
            parser: Box::new(LenientParser),
            catalog: GRANT_CATALOG,
            model_id,
            call_timeout,
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_parser(mut self, parser: Box<dyn ResponseParser>) -> Self {
        self.parser = parser;
        self
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_catalog(mut self, catalog: &'static [GrantProgram]) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn catalog(&self) -> &'static [GrantProgram] {
        self.catalog
    }

    /// Runs the full pipeline. Never fails; degraded stages are listed on the
    /// returned `Assessment`.
    pub async fn assess(&self, request: &AssessmentRequest) -> Assessment {
        info!(
            "Assessing {} against {} ({} responses)",
            request.business.name.as_deref().unwrap_or("Unknown Company"),
            request.framework,
            request.responses.len()
        );

        let (scores, score_degradation) = self.score(request).await.split(Stage::Scores);
        info!(
            "Scores: overall={} weighted={} level={}",
            scores.overall_score, scores.weighted_overall_score, scores.compliance_level
        );

        let (recommendations, rec_degradation) = self
            .recommend(request, &scores)
            .await
            .split(Stage::Recommendations);

        let opportunities = match_opportunities(&scores, &request.business, self.catalog);
        let compliance_gaps = identify_compliance_gaps(&scores);

        info!(
            "Assessment complete: {} recommendations, {} opportunities, {} gaps",
            recommendations.len(),
            opportunities.len(),
            compliance_gaps.len()
        );

        Assessment {
            result: AssessmentResult {
                scores,
                recommendations,
                opportunities,
                analysis_timestamp: now_timestamp(),
                compliance_gaps,
            },
            degradations: score_degradation.into_iter().chain(rec_degradation).collect(),
        }
    }

    /// Result for a payload that could not be read at all. Scores fall back
    /// on the responses that were recoverable (usually none) and no
    /// opportunities are offered.
    pub async fn unreadable_request(&self, request: &AssessmentRequest, detail: String) -> Assessment {
        warn!("Serving fallback assessment for unreadable request: {detail}");
        let scores = fallback_scores(request.responses.len());
        let recommendations = self.fallback_recommendations(&request.business).await;

        Assessment {
            result: AssessmentResult {
                scores,
                recommendations,
                opportunities: Vec::new(),
                analysis_timestamp: now_timestamp(),
                compliance_gaps: vec![UNPROCESSABLE_GAP.to_string()],
            },
            degradations: vec![Degradation {
                stage: Stage::Request,
                reason: DegradationReason::Input(detail),
            }],
        }
    }

    async fn score(&self, request: &AssessmentRequest) -> StageOutcome<EsgScores> {
        let response_count = request.responses.len();
        let prompt = build_scoring_prompt(request);

        let text = match self.call_model(&prompt, SCORING_CALL).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Scoring call failed, using fallback scores: {e}");
                return StageOutcome::Degraded {
                    value: fallback_scores(response_count),
                    reason: DegradationReason::Gateway(e.to_string()),
                };
            }
        };

        let parsed = self.parser.parse_scores(&text);
        if !parsed.is_complete() && !parsed.is_empty() {
            warn!("Scoring reply was partial, filling absent fields: {parsed:?}");
        }

        match fill_missing(&parsed, response_count) {
            Some(scores) => StageOutcome::Fresh(scores),
            None => {
                warn!("No labeled scores in model reply, using fallback scores");
                StageOutcome::Degraded {
                    value: fallback_scores(response_count),
                    reason: DegradationReason::Parse("no labeled score fields".to_string()),
                }
            }
        }
    }

    async fn recommend(
        &self,
        request: &AssessmentRequest,
        scores: &EsgScores,
    ) -> StageOutcome<Vec<Recommendation>> {
        let prompt = build_recommendation_prompt(request, scores);

        let reason = match self.call_model(&prompt, RECOMMENDATION_CALL).await {
            Ok(text) => {
                let recs = self
                    .parser
                    .parse_recommendations(&text, &RecommendationDefaults::PRIMARY);
                if !recs.is_empty() {
                    return StageOutcome::Fresh(recs);
                }
                DegradationReason::Parse("no recommendation array".to_string())
            }
            Err(e) => DegradationReason::Gateway(e.to_string()),
        };

        warn!("Recommendation stage degraded ({reason}), trying simplified prompt");
        StageOutcome::Degraded {
            value: self.fallback_recommendations(&request.business).await,
            reason,
        }
    }

    /// Secondary model call with a simplified prompt, then the static list.
    async fn fallback_recommendations(&self, business: &BusinessProfile) -> Vec<Recommendation> {
        let prompt = build_fallback_recommendation_prompt(business);

        match self.call_model(&prompt, FALLBACK_RECOMMENDATION_CALL).await {
            Ok(text) => {
                let recs = self
                    .parser
                    .parse_recommendations(&text, &RecommendationDefaults::SECONDARY);
                if !recs.is_empty() {
                    info!("Simplified prompt produced {} recommendations", recs.len());
                    return recs;
                }
                warn!("Simplified prompt produced no recommendations, using static set");
            }
            Err(e) => warn!("Simplified recommendation call failed, using static set: {e}"),
        }

        static_recommendations()
    }

    /// One bounded model call. A timeout is reported like any other gateway failure.
    async fn call_model(&self, prompt: &str, profile: CallProfile) -> Result<String, LlmError> {
        let request = ModelRequest {
            model: &self.model_id,
            prompt,
            max_tokens: profile.max_tokens,
            temperature: profile.temperature,
        };

        match tokio::time::timeout(self.call_timeout, self.gateway.invoke(request)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.call_timeout.as_secs())),
        }
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::models::{
        ComplianceLevel, CriterionResponse, Priority, SizeClass,
    };
    use crate::assessment::parser::ParsedScores;
    use crate::assessment::test_support::{Reply, ScriptedGateway};

    const FULL_SCORES: &str = "Environmental Score: 70\nSocial Score: 80\nGovernance Score: 90\nOverall Score: 81\nCompliance Level: Excellent";

    fn small_business_request(response_count: usize, score: f64) -> AssessmentRequest {
        AssessmentRequest {
            business: BusinessProfile {
                name: Some("Kedai Hijau".to_string()),
                industry: Some("Retail".to_string()),
                size: SizeClass::Small,
                employees: Some(12.0),
                ..Default::default()
            },
            responses: (0..response_count)
                .map(|i| CriterionResponse {
                    criterion_id: Some(format!("criterion-{i}")),
                    score: Some(score),
                    evidence: Some("documented".to_string()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn orchestrator(gateway: Arc<ScriptedGateway>) -> AssessmentOrchestrator {
        AssessmentOrchestrator::new(gateway, "test-model".to_string(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_unreachable_gateway_degrades_every_stage() {
        let gateway = Arc::new(ScriptedGateway::always(Reply::Fail));
        let assessment = orchestrator(gateway.clone())
            .assess(&small_business_request(5, 80.0))
            .await;

        let result = &assessment.result;
        assert!(assessment.is_degraded());
        assert_eq!(result.scores.overall_score, 75.0);
        assert_eq!(result.scores.compliance_level, ComplianceLevel::Good);
        assert_eq!(result.recommendations, static_recommendations());
        // fallback scores clear every default threshold
        assert_eq!(result.opportunities.len(), 3);
        assert!(result.compliance_gaps.is_empty());

        let stages: Vec<Stage> = assessment.degradations.iter().map(|d| d.stage).collect();
        assert_eq!(stages, vec![Stage::Scores, Stage::Recommendations]);
        assert!(matches!(
            assessment.degradations[0].reason,
            DegradationReason::Gateway(_)
        ));
        // scoring, recommendation, simplified recommendation
        assert_eq!(gateway.calls(), 3);
    }

    #[tokio::test]
    async fn test_happy_path_uses_model_output() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Reply::Text(FULL_SCORES.to_string()),
            Reply::Text(r#"Here you go: [{"title":"X","priority":"HIGH"}]"#.to_string()),
        ]));
        let assessment = orchestrator(gateway.clone())
            .assess(&small_business_request(2, 70.0))
            .await;

        assert!(!assessment.is_degraded());
        assert!(assessment.error_summary().is_none());
        let scores = &assessment.result.scores;
        assert_eq!(scores.environmental_score, 70.0);
        assert_eq!(scores.social_score, 80.0);
        assert_eq!(scores.governance_score, 90.0);
        assert_eq!(scores.overall_score, 81.0);
        assert_eq!(scores.compliance_level, ComplianceLevel::Excellent);

        let recs = &assessment.result.recommendations;
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, Priority::High);
        assert_eq!(recs[0].id, "rec_001");
        assert_eq!(recs[0].required_actions.len(), 2);
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test]
    async fn test_recommendation_prompt_uses_obtained_scores() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Reply::Text(FULL_SCORES.to_string()),
            Reply::Text("[{}]".to_string()),
        ]));
        orchestrator(gateway.clone())
            .assess(&small_business_request(1, 70.0))
            .await;

        let prompts = gateway.prompts();
        assert!(prompts[1].contains("- Governance: 90"));
        assert!(prompts[1].contains("- Overall: 81"));
    }

    #[tokio::test]
    async fn test_recommendation_failure_keeps_model_scores() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Reply::Text(FULL_SCORES.to_string()),
            Reply::Fail,
            Reply::Fail,
        ]));
        let assessment = orchestrator(gateway)
            .assess(&small_business_request(3, 70.0))
            .await;

        assert_eq!(assessment.result.scores.overall_score, 81.0);
        assert_eq!(assessment.result.recommendations, static_recommendations());
        assert_eq!(assessment.degradations.len(), 1);
        assert_eq!(assessment.degradations[0].stage, Stage::Recommendations);
    }

    #[tokio::test]
    async fn test_score_failure_still_gets_model_recommendations() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Reply::Fail,
            Reply::Text(r#"[{"title": "Solar rooftop", "priority": "low"}]"#.to_string()),
        ]));
        let assessment = orchestrator(gateway.clone())
            .assess(&small_business_request(0, 0.0))
            .await;

        // n=0 → base 65
        assert_eq!(assessment.result.scores.overall_score, 65.0);
        assert_eq!(
            assessment.result.scores.compliance_level,
            ComplianceLevel::NeedsImprovement
        );
        assert_eq!(assessment.result.recommendations[0].title, "Solar rooftop");
        assert_eq!(assessment.degradations.len(), 1);
        assert_eq!(assessment.degradations[0].stage, Stage::Scores);
        // the recommendation prompt saw the fallback scores
        assert!(gateway.prompts()[1].contains("- Environmental: 70"));
    }

    #[tokio::test]
    async fn test_unparseable_scores_degrade_as_parse_failure() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Reply::Text("I'm sorry, I can't score this company.".to_string()),
            Reply::Text("[{}]".to_string()),
        ]));
        let assessment = orchestrator(gateway)
            .assess(&small_business_request(4, 50.0))
            .await;

        assert_eq!(assessment.result.scores, fallback_scores(4));
        assert!(matches!(
            assessment.degradations[0].reason,
            DegradationReason::Parse(_)
        ));
    }

    #[tokio::test]
    async fn test_partial_scores_are_completed_not_degraded() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Reply::Text("Environmental Score: 40\nOverall Score: 52".to_string()),
            Reply::Text("[{}]".to_string()),
        ]));
        let assessment = orchestrator(gateway)
            .assess(&small_business_request(0, 0.0))
            .await;

        let scores = &assessment.result.scores;
        assert_eq!(scores.environmental_score, 40.0);
        assert_eq!(scores.overall_score, 52.0);
        assert_eq!(scores.social_score, 65.0);
        assert!(!assessment.is_degraded());
        assert_eq!(
            assessment.result.compliance_gaps,
            vec!["Environmental management systems need strengthening"]
        );
    }

    #[tokio::test]
    async fn test_secondary_tier_used_before_static_list() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Reply::Text(FULL_SCORES.to_string()),
            Reply::Text("No JSON today.".to_string()),
            Reply::Text(r#"[{"title": "Rainwater harvesting"}]"#.to_string()),
        ]));
        let assessment = orchestrator(gateway.clone())
            .assess(&small_business_request(2, 60.0))
            .await;

        let recs = &assessment.result.recommendations;
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].title, "Rainwater harvesting");
        assert_eq!(recs[0].related_criteria, vec!["ESG Management"]);
        assert!(gateway.prompts()[2].contains("Generate 4-5 diverse ESG improvement"));
        assert!(matches!(
            assessment.degradations[0].reason,
            DegradationReason::Parse(_)
        ));
    }

    #[tokio::test]
    async fn test_secondary_tier_empty_falls_to_static() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Reply::Text(FULL_SCORES.to_string()),
            Reply::Text("[]".to_string()),
            Reply::Text("[]".to_string()),
        ]));
        let assessment = orchestrator(gateway)
            .assess(&small_business_request(2, 60.0))
            .await;
        assert_eq!(assessment.result.recommendations, static_recommendations());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_gateway_times_out_and_degrades() {
        let gateway = Arc::new(ScriptedGateway::always(Reply::Hang));
        let assessment = AssessmentOrchestrator::new(
            gateway,
            "test-model".to_string(),
            Duration::from_millis(50),
        )
        .assess(&small_business_request(5, 80.0))
        .await;

        assert_eq!(assessment.result.scores.overall_score, 75.0);
        assert_eq!(assessment.result.recommendations, static_recommendations());
        let summary = assessment.error_summary().unwrap();
        assert!(summary.contains("timed out"), "summary was {summary}");
    }

    #[tokio::test]
    async fn test_model_calls_use_configured_profiles() {
        let gateway = Arc::new(ScriptedGateway::always(Reply::Fail));
        orchestrator(gateway.clone())
            .assess(&small_business_request(1, 50.0))
            .await;

        let calls = gateway.requests();
        assert_eq!(calls[0].max_tokens, 2000);
        assert!((calls[0].temperature - 0.3).abs() < 1e-6);
        assert_eq!(calls[1].max_tokens, 3000);
        assert_eq!(calls[2].max_tokens, 4000);
        assert!(calls.iter().all(|c| c.model == "test-model"));
    }

    #[tokio::test]
    async fn test_unreadable_request_result() {
        let gateway = Arc::new(ScriptedGateway::always(Reply::Fail));
        let assessment = orchestrator(gateway)
            .unreadable_request(&AssessmentRequest::default(), "expected value".to_string())
            .await;

        assert_eq!(assessment.result.scores, fallback_scores(0));
        assert!(assessment.result.opportunities.is_empty());
        assert_eq!(assessment.result.compliance_gaps, vec![UNPROCESSABLE_GAP]);
        assert_eq!(assessment.degradations[0].stage, Stage::Request);
    }

    #[tokio::test]
    async fn test_custom_parser_is_used() {
        struct FixedParser;
        impl ResponseParser for FixedParser {
            fn parse_scores(&self, _text: &str) -> ParsedScores {
                ParsedScores {
                    environmental: Some(10.0),
                    social: Some(20.0),
                    governance: Some(30.0),
                    overall: Some(20.0),
                    compliance_level: Some(ComplianceLevel::Poor),
                }
            }

            fn parse_recommendations(
                &self,
                _text: &str,
                _defaults: &RecommendationDefaults,
            ) -> Vec<Recommendation> {
                Vec::new()
            }
        }

        let gateway = Arc::new(ScriptedGateway::always(Reply::Text("anything".to_string())));
        let assessment = orchestrator(gateway)
            .with_parser(Box::new(FixedParser))
            .with_catalog(&[])
            .assess(&small_business_request(1, 50.0))
            .await;

        assert_eq!(assessment.result.scores.compliance_level, ComplianceLevel::Poor);
        assert_eq!(assessment.result.compliance_gaps.len(), 3);
        assert!(assessment.result.opportunities.is_empty());
        assert_eq!(assessment.result.recommendations, static_recommendations());
    }

    #[test]
    fn test_timestamp_is_rfc3339_utc() {
        let ts = now_timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
