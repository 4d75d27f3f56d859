//! Colonia Common Library
//!
//! Shared code for the colonisation tracker:
//! - Database models and repository
//! - Station requirement catalog
//! - Project store and progress aggregation
//! - Live update bus
//! - Error types, configuration and metrics

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod live;
pub mod metrics;
pub mod projects;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogSource, PartialPath, RefreshSummary, RequirementView};
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use live::{LiveUpdateBus, Observer, UpdateEvent};
pub use projects::{NewProject, ProjectStore, ProjectView};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
