//! Station requirement catalog handlers

use axum::{extract::State, Json};
use colonia_common::{
    catalog::{CatalogSource, PartialPath, RefreshSummary, RequirementView},
    errors::Result,
};
use serde::Deserialize;

use crate::extract::AppQuery;
use crate::AppState;

/// `?level=N` plus the already chosen prefix
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LevelsQuery {
    pub level: u8,
    pub tier: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub listed_type: Option<String>,
    pub building_type: Option<String>,
    pub layout: Option<String>,
}

impl LevelsQuery {
    fn split(self) -> (u8, PartialPath) {
        (
            self.level,
            PartialPath {
                tier: self.tier,
                location: self.location,
                category: self.category,
                listed_type: self.listed_type,
                building_type: self.building_type,
                layout: self.layout,
            },
        )
    }
}

pub async fn resolve_level(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<LevelsQuery>,
) -> Result<Json<Vec<String>>> {
    let (level, partial) = query.split();
    Ok(Json(state.catalog.resolve_level(level, &partial).await?))
}

pub async fn lookup(
    State(state): State<AppState>,
    AppQuery(partial): AppQuery<PartialPath>,
) -> Result<Json<RequirementView>> {
    Ok(Json(state.catalog.lookup(&partial).await?))
}

/// Reload the catalog from the configured sheet
#[tracing::instrument(skip(state))]
pub async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshSummary>> {
    let source = CatalogSource::from_config(&state.config.catalog)?;
    let rows = source.load().await?;
    Ok(Json(state.catalog.refresh(rows).await?))
}
