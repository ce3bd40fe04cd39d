//! Read-only catalog routes: supported frameworks and grant programs.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::assessment::eligibility::GrantProgram;
use crate::assessment::models::Framework;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, PartialEq)]
pub struct FrameworkInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

impl From<Framework> for FrameworkInfo {
    fn from(framework: Framework) -> Self {
        let description = match framework {
            Framework::Nsrf => "National Sustainability Reporting Framework",
            Framework::Iesg => "Integrated ESG framework for Malaysian businesses",
            Framework::SmeCorp => "SME Corp Malaysia ESG guide for small and medium enterprises",
        };
        FrameworkInfo {
            id: framework.id(),
            name: framework.label(),
            description,
        }
    }
}

/// GET /api/v1/frameworks
pub async fn handle_list_frameworks() -> Json<Vec<FrameworkInfo>> {
    Json(Framework::ALL.into_iter().map(FrameworkInfo::from).collect())
}

/// GET /api/v1/frameworks/:id
///
/// Matches the short id or any accepted label ("nsrf", "i-ESG", ...).
pub async fn handle_get_framework(Path(id): Path<String>) -> Result<Json<FrameworkInfo>, AppError> {
    Framework::ALL
        .into_iter()
        .find(|f| f.id() == id)
        .or_else(|| Framework::from_label(&id))
        .map(|f| Json(FrameworkInfo::from(f)))
        .ok_or_else(|| AppError::NotFound(format!("framework '{id}'")))
}

/// GET /api/v1/grants
pub async fn handle_list_grants(State(state): State<AppState>) -> Json<&'static [GrantProgram]> {
    Json(state.orchestrator.catalog())
}
