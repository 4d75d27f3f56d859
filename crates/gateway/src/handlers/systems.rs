//! Star system handlers

use axum::{extract::State, http::StatusCode, Json};
use colonia_common::{db::models::System, errors::Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use validator::Validate;

use crate::extract::{AppPath, ValidatedJson};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateSystemRequest {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
}

pub async fn list_systems(State(state): State<AppState>) -> Result<Json<Vec<System>>> {
    Ok(Json(state.projects.list_systems().await?))
}

#[tracing::instrument(skip(state, request), fields(name = %request.name))]
pub async fn create_system(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateSystemRequest>,
) -> Result<(StatusCode, Json<System>)> {
    let system = state.projects.create_system(&request.name).await?;
    Ok((StatusCode::CREATED, Json(system)))
}

/// Outstanding commodities across the system's projects
#[tracing::instrument(skip(state))]
pub async fn system_aggregate(
    State(state): State<AppState>,
    AppPath(system_id): AppPath<i32>,
) -> Result<Json<BTreeMap<String, i64>>> {
    Ok(Json(state.projects.system_aggregate(system_id).await?))
}
