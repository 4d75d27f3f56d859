//! Construction project handlers
//!
//! Every successful mutation is followed by a live update broadcast.

use axum::{extract::State, http::StatusCode, Json};
use colonia_common::{
    errors::Result,
    live::UpdateEvent,
    projects::{NewProject, ProjectView},
};
use serde::Deserialize;
use validator::Validate;

use crate::extract::{AppPath, ValidatedJson};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,

    pub system_id: i32,

    #[serde(default)]
    pub requirement_profile_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProgressUpdateRequest {
    #[validate(length(min = 1, max = 200, message = "commodity must be 1-200 characters"))]
    pub commodity: String,

    pub remaining: i64,
}

pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<ProjectView>>> {
    Ok(Json(state.projects.list_all().await?))
}

#[tracing::instrument(skip(state, request), fields(system_id = request.system_id))]
pub async fn create_project(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectView>)> {
    let view = state
        .projects
        .create(NewProject {
            name: request.name,
            system_id: request.system_id,
            requirement_profile_id: request.requirement_profile_id,
        })
        .await?;

    state.bus.broadcast(&UpdateEvent::project(view.id)).await;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_project(
    State(state): State<AppState>,
    AppPath(project_id): AppPath<i32>,
) -> Result<Json<ProjectView>> {
    Ok(Json(state.projects.get(project_id).await?))
}

#[tracing::instrument(skip(state))]
pub async fn delete_project(
    State(state): State<AppState>,
    AppPath(project_id): AppPath<i32>,
) -> Result<StatusCode> {
    state.projects.delete(project_id).await?;
    state.bus.broadcast(&UpdateEvent::project(project_id)).await;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, request), fields(commodity = %request.commodity))]
pub async fn update_progress(
    State(state): State<AppState>,
    AppPath(project_id): AppPath<i32>,
    ValidatedJson(request): ValidatedJson<ProgressUpdateRequest>,
) -> Result<Json<ProjectView>> {
    state
        .projects
        .update_progress(project_id, &request.commodity, request.remaining)
        .await?;

    state.bus.broadcast(&UpdateEvent::project(project_id)).await;
    Ok(Json(state.projects.get(project_id).await?))
}
