use std::sync::Arc;

use crate::assessment::orchestrator::AssessmentOrchestrator;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Stateless between requests; one instance serves every assessment.
    pub orchestrator: Arc<AssessmentOrchestrator>,
    pub config: Config,
}
