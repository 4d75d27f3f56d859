//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::catalog::RequirementPath;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    NotSet, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, Statement, TransactionTrait,
};

/// Outcome of writing one requirement row during a catalog refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.connection()
    }

    // ========================================================================
    // System Operations
    // ========================================================================

    /// All systems, oldest first
    pub async fn list_systems(&self) -> Result<Vec<System>> {
        SystemEntity::find()
            .order_by_asc(SystemColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find system by ID
    pub async fn find_system_by_id(&self, id: i32) -> Result<Option<System>> {
        SystemEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Create a system with a unique name
    pub async fn create_system(&self, name: String) -> Result<System> {
        let existing = SystemEntity::find()
            .filter(SystemColumn::Name.eq(name.as_str()))
            .one(self.conn())
            .await?;

        if existing.is_some() {
            return Err(AppError::DuplicateSystem { name });
        }

        let system = SystemActiveModel {
            id: NotSet,
            name: Set(name.clone()),
        };

        // A concurrent insert of the same name surfaces as a unique violation
        match system.insert(self.conn()).await {
            Ok(system) => Ok(system),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(AppError::DuplicateSystem { name })
            }
            Err(e) => Err(e.into()),
        }
    }

    // ========================================================================
    // Station Requirement Operations
    // ========================================================================

    /// Distinct values of `target` among requirements matching every filter
    pub async fn distinct_requirement_values(
        &self,
        target: StationRequirementColumn,
        filters: &[(StationRequirementColumn, &str)],
    ) -> Result<Vec<String>> {
        let mut query = StationRequirementEntity::find()
            .select_only()
            .column(target)
            .distinct();

        for (column, value) in filters {
            query = query.filter(column.eq(*value));
        }

        query
            .order_by_asc(target)
            .into_tuple::<String>()
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Exact match on all six path components
    pub async fn find_requirement_by_path(
        &self,
        path: &RequirementPath,
    ) -> Result<Option<StationRequirement>> {
        find_by_path(self.conn(), path).await
    }

    /// Insert or replace every entry inside one transaction.
    ///
    /// Any failure rolls the whole batch back: the transaction is dropped
    /// without a commit.
    pub async fn upsert_requirements(
        &self,
        entries: Vec<(RequirementPath, Commodities)>,
    ) -> Result<Vec<UpsertOutcome>> {
        let txn = self.conn().begin().await?;
        let mut outcomes = Vec::with_capacity(entries.len());

        for (path, commodities) in entries {
            let outcome = match find_by_path(&txn, &path).await? {
                Some(row) if row.commodities == commodities => UpsertOutcome::Unchanged,
                Some(row) => {
                    let mut active: StationRequirementActiveModel = row.into();
                    active.commodities = Set(commodities);
                    active.update(&txn).await?;
                    UpsertOutcome::Updated
                }
                None => {
                    let row = StationRequirementActiveModel {
                        id: NotSet,
                        tier: Set(path.tier),
                        location: Set(path.location),
                        category: Set(path.category),
                        listed_type: Set(path.listed_type),
                        building_type: Set(path.building_type),
                        layout: Set(path.layout),
                        commodities: Set(commodities),
                    };
                    row.insert(&txn).await?;
                    UpsertOutcome::Inserted
                }
            };
            outcomes.push(outcome);
        }

        txn.commit().await?;
        Ok(outcomes)
    }

    // ========================================================================
    // Project Operations
    // ========================================================================

    /// Create a project, seeding progress from its requirement when given
    pub async fn create_project(
        &self,
        name: String,
        system_id: i32,
        requirement_id: Option<i32>,
    ) -> Result<(Project, Option<StationRequirement>)> {
        let txn = self.conn().begin().await?;

        SystemEntity::find_by_id(system_id)
            .one(&txn)
            .await?
            .ok_or(AppError::SystemNotFound { id: system_id })?;

        let requirement = match requirement_id {
            Some(id) => Some(
                StationRequirementEntity::find_by_id(id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| AppError::RequirementNotFound {
                        path: format!("id {}", id),
                    })?,
            ),
            None => None,
        };

        let progress = requirement
            .as_ref()
            .map(|r| Progress::seeded_from(&r.commodities))
            .unwrap_or_default();

        let project = ProjectActiveModel {
            id: NotSet,
            name: Set(name),
            system_id: Set(system_id),
            station_requirement_id: Set(requirement_id),
            progress: Set(progress),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok((project, requirement))
    }

    /// Find project by ID together with its requirement
    pub async fn find_project(
        &self,
        id: i32,
    ) -> Result<Option<(Project, Option<StationRequirement>)>> {
        ProjectEntity::find_by_id(id)
            .find_also_related(StationRequirementEntity)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Every project with its requirement, oldest first
    pub async fn list_projects(&self) -> Result<Vec<(Project, Option<StationRequirement>)>> {
        ProjectEntity::find()
            .find_also_related(StationRequirementEntity)
            .order_by_asc(ProjectColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Projects of one system with their requirements
    pub async fn projects_for_system(
        &self,
        system_id: i32,
    ) -> Result<Vec<(Project, Option<StationRequirement>)>> {
        ProjectEntity::find()
            .filter(ProjectColumn::SystemId.eq(system_id))
            .find_also_related(StationRequirementEntity)
            .order_by_asc(ProjectColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Set a single progress entry in place.
    ///
    /// The merge happens inside the database so that writers touching
    /// different commodities of the same project never overwrite each other.
    /// Returns false when the project does not exist.
    pub async fn set_progress_entry(
        &self,
        project_id: i32,
        commodity: &str,
        remaining: i64,
    ) -> Result<bool> {
        let backend = self.conn().get_database_backend();
        let sql = match backend {
            DbBackend::Postgres => {
                "UPDATE projects SET progress = progress || jsonb_build_object($1::text, $2::bigint) WHERE id = $3"
            }
            DbBackend::Sqlite => {
                "UPDATE projects SET progress = json_patch(progress, json_object(?, ?)) WHERE id = ?"
            }
            DbBackend::MySql => {
                "UPDATE projects SET progress = JSON_MERGE_PATCH(progress, JSON_OBJECT(?, ?)) WHERE id = ?"
            }
        };

        let stmt = Statement::from_sql_and_values(
            backend,
            sql,
            vec![commodity.into(), remaining.into(), project_id.into()],
        );

        let result = self.conn().execute(stmt).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete project by ID; returns false when it did not exist
    pub async fn delete_project(&self, id: i32) -> Result<bool> {
        let txn = self.conn().begin().await?;

        if ProjectEntity::find_by_id(id).one(&txn).await?.is_none() {
            return Ok(false);
        }

        let result = ProjectEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        Ok(result.rows_affected > 0)
    }
}

async fn find_by_path<C: ConnectionTrait>(
    conn: &C,
    path: &RequirementPath,
) -> Result<Option<StationRequirement>> {
    StationRequirementEntity::find()
        .filter(StationRequirementColumn::Tier.eq(path.tier.as_str()))
        .filter(StationRequirementColumn::Location.eq(path.location.as_str()))
        .filter(StationRequirementColumn::Category.eq(path.category.as_str()))
        .filter(StationRequirementColumn::ListedType.eq(path.listed_type.as_str()))
        .filter(StationRequirementColumn::BuildingType.eq(path.building_type.as_str()))
        .filter(StationRequirementColumn::Layout.eq(path.layout.as_str()))
        .one(conn)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_pool;

    fn path(layout: &str) -> RequirementPath {
        RequirementPath {
            tier: "T1".into(),
            location: "Orbital".into(),
            category: "Starport".into(),
            listed_type: "Outpost".into(),
            building_type: "Civilian".into(),
            layout: layout.into(),
        }
    }

    #[tokio::test]
    async fn test_create_system_rejects_duplicate_name() {
        let repo = Repository::new(memory_pool().await);
        repo.create_system("Sol".into()).await.unwrap();

        let err = repo.create_system("Sol".into()).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateSystem { .. }));
        assert_eq!(repo.list_systems().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_progress_entry_merges_single_key() {
        let repo = Repository::new(memory_pool().await);
        let system = repo.create_system("Sol".into()).await.unwrap();
        let steel: Commodities = [("Steel", 500), ("Polymers", 80)].into_iter().collect();
        repo.upsert_requirements(vec![(path("Vulture"), steel)]).await.unwrap();
        let requirement = repo.find_requirement_by_path(&path("Vulture")).await.unwrap().unwrap();

        let (project, _) = repo
            .create_project("Dock".into(), system.id, Some(requirement.id))
            .await
            .unwrap();

        assert!(repo.set_progress_entry(project.id, "Steel", 120).await.unwrap());
        let (stored, _) = repo.find_project(project.id).await.unwrap().unwrap();
        assert_eq!(stored.progress.get("Steel"), Some(120));
        assert_eq!(stored.progress.get("Polymers"), Some(80));
    }

    #[tokio::test]
    async fn test_set_progress_entry_on_missing_project() {
        let repo = Repository::new(memory_pool().await);
        assert!(!repo.set_progress_entry(42, "Steel", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_distinct_values_are_deduplicated() {
        let repo = Repository::new(memory_pool().await);
        let bill: Commodities = [("Steel", 1)].into_iter().collect();
        repo.upsert_requirements(vec![
            (path("Vulture"), bill.clone()),
            (path("Dodec"), bill.clone()),
        ])
        .await
        .unwrap();

        let categories = repo
            .distinct_requirement_values(
                StationRequirementColumn::Category,
                &[(StationRequirementColumn::Tier, "T1")],
            )
            .await
            .unwrap();
        assert_eq!(categories, vec!["Starport".to_string()]);

        let layouts = repo
            .distinct_requirement_values(StationRequirementColumn::Layout, &[])
            .await
            .unwrap();
        assert_eq!(layouts, vec!["Dodec".to_string(), "Vulture".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_project_reports_absence() {
        let repo = Repository::new(memory_pool().await);
        let system = repo.create_system("Sol".into()).await.unwrap();
        let (project, _) = repo.create_project("Dock".into(), system.id, None).await.unwrap();

        assert!(repo.delete_project(project.id).await.unwrap());
        assert!(!repo.delete_project(project.id).await.unwrap());
        assert!(repo.find_project(project.id).await.unwrap().is_none());
    }
}
