//! Project store
//!
//! Projects track the remaining quantity of every commodity their station
//! requirement asks for. Progress is seeded from the requirement at creation
//! and then mutated one commodity at a time; writes are last-write-wins per
//! commodity.

use crate::aggregate::{completion_of, system_aggregate};
use crate::catalog::RequirementView;
use crate::db::models::{Progress, Project, StationRequirement, System};
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::metrics;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Project as shown to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: i32,
    pub name: String,
    pub system_id: i32,
    pub requirement_profile_id: Option<i32>,
    pub station_requirement: Option<RequirementView>,
    pub progress: Progress,
    pub completion: u8,
}

impl ProjectView {
    fn assemble(project: Project, requirement: Option<StationRequirement>) -> Self {
        let completion = completion_of(
            requirement.as_ref().map(|r| &r.commodities),
            &project.progress,
        );

        Self {
            id: project.id,
            name: project.name,
            system_id: project.system_id,
            requirement_profile_id: project.station_requirement_id,
            station_requirement: requirement.map(RequirementView::from),
            progress: project.progress,
            completion,
        }
    }
}

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub system_id: i32,
    pub requirement_profile_id: Option<i32>,
}

#[derive(Clone)]
pub struct ProjectStore {
    repo: Repository,
}

impl ProjectStore {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    // ========================================================================
    // Systems
    // ========================================================================

    pub async fn list_systems(&self) -> Result<Vec<System>> {
        self.repo.list_systems().await
    }

    pub async fn create_system(&self, name: &str) -> Result<System> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name", "system name must not be blank"));
        }

        let system = self.repo.create_system(name.to_string()).await?;
        info!(system_id = system.id, name = %system.name, "System created");
        Ok(system)
    }

    // ========================================================================
    // Projects
    // ========================================================================

    pub async fn create(&self, input: NewProject) -> Result<ProjectView> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name", "project name must not be blank"));
        }

        let (project, requirement) = self
            .repo
            .create_project(name.to_string(), input.system_id, input.requirement_profile_id)
            .await?;

        info!(
            project_id = project.id,
            system_id = project.system_id,
            requirement_id = ?project.station_requirement_id,
            commodities = project.progress.0.len(),
            "Project created"
        );

        Ok(ProjectView::assemble(project, requirement))
    }

    pub async fn get(&self, project_id: i32) -> Result<ProjectView> {
        let (project, requirement) = self
            .repo
            .find_project(project_id)
            .await?
            .ok_or(AppError::ProjectNotFound { id: project_id })?;

        Ok(ProjectView::assemble(project, requirement))
    }

    pub async fn list_all(&self) -> Result<Vec<ProjectView>> {
        let rows = self.repo.list_projects().await?;
        Ok(rows
            .into_iter()
            .map(|(project, requirement)| ProjectView::assemble(project, requirement))
            .collect())
    }

    /// Set the remaining quantity of one commodity.
    ///
    /// No bounds are enforced: values above the requirement or below zero are
    /// stored as given so that players can correct earlier reports.
    pub async fn update_progress(
        &self,
        project_id: i32,
        commodity: &str,
        remaining: i64,
    ) -> Result<()> {
        let commodity = commodity.trim();
        if commodity.is_empty() {
            return Err(AppError::validation("commodity", "commodity must not be blank"));
        }

        if !self
            .repo
            .set_progress_entry(project_id, commodity, remaining)
            .await?
        {
            return Err(AppError::ProjectNotFound { id: project_id });
        }

        metrics::record_progress_update();
        info!(project_id, commodity, remaining, "Progress updated");
        Ok(())
    }

    pub async fn delete(&self, project_id: i32) -> Result<()> {
        if !self.repo.delete_project(project_id).await? {
            return Err(AppError::ProjectNotFound { id: project_id });
        }

        info!(project_id, "Project deleted");
        Ok(())
    }

    // ========================================================================
    // Aggregation
    // ========================================================================

    /// Outstanding commodities across every project of a system.
    /// A known system without data yields an empty map.
    pub async fn system_aggregate(&self, system_id: i32) -> Result<BTreeMap<String, i64>> {
        if self.repo.find_system_by_id(system_id).await?.is_none() {
            return Err(AppError::SystemNotFound { id: system_id });
        }

        let rows = self.repo.projects_for_system(system_id).await?;
        Ok(system_aggregate(rows.iter().map(|(project, requirement)| {
            (requirement.as_ref().map(|r| &r.commodities), &project.progress)
        })))
    }
}
