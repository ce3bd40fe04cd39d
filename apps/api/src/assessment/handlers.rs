//! Axum route handlers for the Assessment API.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

use crate::assessment::models::{AssessmentRequest, AssessmentResult};
use crate::assessment::orchestrator::Assessment;
use crate::errors::AppError;
use crate::state::AppState;

const SUCCESS_MESSAGE: &str = "ESG assessment processed successfully";
const FALLBACK_MESSAGE: &str = "ESG assessment processed with fallback data";

/// Largest request body read for an assessment. Bigger bodies get the
/// unreadable-request fallback rather than a 413.
pub const MAX_REQUEST_BYTES: usize = 2 * 1024 * 1024;

// ────────────────────────────────────────────────────────────────────────────
// Response envelope
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AssessmentEnvelope {
    pub success: bool,
    pub data: AssessmentResult,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Assessment> for AssessmentEnvelope {
    fn from(assessment: Assessment) -> Self {
        let error = assessment.error_summary();
        let success = error.is_none();
        AssessmentEnvelope {
            success,
            data: assessment.result,
            message: if success {
                SUCCESS_MESSAGE
            } else {
                FALLBACK_MESSAGE
            }
            .to_string(),
            error,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request decoding
// ────────────────────────────────────────────────────────────────────────────

/// Decodes the raw body into an `AssessmentRequest`.
///
/// Accepts the request object directly, or wrapped as `{"body": "<json>"}` /
/// `{"body": {...}}` the way an API gateway proxy delivers it.
pub fn decode_request(raw: &[u8]) -> Result<AssessmentRequest, AppError> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| AppError::Validation(format!("request body is not JSON: {e}")))?;

    let value = match value {
        Value::Object(mut outer) if outer.contains_key("body") => {
            match outer.remove("body").unwrap_or(Value::Null) {
                Value::String(inner) => serde_json::from_str(&inner).map_err(|e| {
                    AppError::Validation(format!("wrapped body is not JSON: {e}"))
                })?,
                inner => inner,
            }
        }
        other => other,
    };

    if !value.is_object() {
        return Err(AppError::Validation(
            "request body must be a JSON object".to_string(),
        ));
    }

    serde_json::from_value(value)
        .map_err(|e| AppError::Validation(format!("malformed assessment request: {e}")))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/assessments (also POST /assess)
///
/// Always answers 200. Model failures, unreadable payloads and oversized or
/// aborted bodies produce fallback data with `success: false`.
pub async fn handle_assess(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<AssessmentEnvelope> {
    let request_id = Uuid::new_v4();
    let span = info_span!("assessment", %request_id);

    async move {
        let decoded = body
            .map_err(|e| AppError::Validation(format!("request body could not be read: {e}")))
            .and_then(|raw| decode_request(&raw));
        let assessment = match decoded {
            Ok(request) => state.orchestrator.assess(&request).await,
            Err(e) => {
                warn!("Rejected assessment payload: {e}");
                state
                    .orchestrator
                    .unreadable_request(&AssessmentRequest::default(), e.to_string())
                    .await
            }
        };
        Json(AssessmentEnvelope::from(assessment))
    }
    .instrument(span)
    .await
}
