//! Database layer for Colonia
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Connection pool management with a startup retry loop
//! - Schema bootstrap

pub mod models;
mod repository;

pub use repository::{Repository, UpsertOutcome};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use backoff::ExponentialBackoffBuilder;
use models::{ProjectEntity, StationRequirementColumn, StationRequirementEntity, SystemEntity};
use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::time::Duration;
use tracing::{info, warn};

/// Name of the unique index over the 6-level requirement path
pub const REQUIREMENT_PATH_INDEX: &str = "uq_station_requirements_path";

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration.
    ///
    /// An unreachable database is retried with exponential backoff for up to
    /// `startup_retry_secs` before giving up.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(false);

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_max_interval(Duration::from_secs(5))
            .with_max_elapsed_time(Some(Duration::from_secs(config.startup_retry_secs)))
            .build();

        let conn = backoff::future::retry_notify(
            policy,
            || {
                let opts = opts.clone();
                async move {
                    Database::connect(opts)
                        .await
                        .map_err(backoff::Error::transient)
                }
            },
            |err, wait: Duration| {
                warn!(error = %err, retry_in_ms = wait.as_millis() as u64, "Database not ready, retrying");
            },
        )
        .await
        .map_err(|e| AppError::DatabaseConnection {
            message: format!("Failed to connect: {}", e),
        })?;

        info!("Database connection established");

        Ok(Self { conn })
    }

    /// Wrap an already open connection
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Connection used for all reads and writes
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }

    /// Create the tables and the requirement path index when missing
    pub async fn ensure_schema(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);

        let tables = [
            schema.create_table_from_entity(SystemEntity),
            schema.create_table_from_entity(StationRequirementEntity),
            schema.create_table_from_entity(ProjectEntity),
        ];

        for mut table in tables {
            table.if_not_exists();
            self.conn.execute(backend.build(&table)).await?;
        }

        let path_index = Index::create()
            .name(REQUIREMENT_PATH_INDEX)
            .table(StationRequirementEntity)
            .col(StationRequirementColumn::Tier)
            .col(StationRequirementColumn::Location)
            .col(StationRequirementColumn::Category)
            .col(StationRequirementColumn::ListedType)
            .col(StationRequirementColumn::BuildingType)
            .col(StationRequirementColumn::Layout)
            .unique()
            .if_not_exists()
            .to_owned();

        self.conn.execute(backend.build(&path_index)).await?;

        info!("Database schema ready");
        Ok(())
    }
}
