//! Requirement catalog
//!
//! Station requirements are addressed by a 6-level path:
//! tier → location → category → listed type → building type → layout.
//! The catalog answers "which values exist at level N given levels 1..N-1",
//! resolves a full path to its bill of materials, and refreshes the whole
//! table from tabular source rows in one transaction.

mod source;

pub use source::{parse_table, CatalogSource, SourceRow};

use crate::db::models::{Commodities, StationRequirement, StationRequirementColumn};
use crate::db::{Repository, UpsertOutcome};
use crate::errors::{AppError, Result};
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

/// Number of levels in a requirement path
pub const HIERARCHY_DEPTH: usize = 6;

/// One level of the classification hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HierarchyLevel {
    Tier,
    Location,
    Category,
    ListedType,
    BuildingType,
    Layout,
}

impl HierarchyLevel {
    pub const ALL: [HierarchyLevel; HIERARCHY_DEPTH] = [
        HierarchyLevel::Tier,
        HierarchyLevel::Location,
        HierarchyLevel::Category,
        HierarchyLevel::ListedType,
        HierarchyLevel::BuildingType,
        HierarchyLevel::Layout,
    ];

    /// Level from its 1-based position
    pub fn from_number(level: u8) -> Result<Self> {
        match level {
            1..=6 => Ok(Self::ALL[usize::from(level) - 1]),
            _ => Err(AppError::validation(
                "level",
                format!("level must be between 1 and {}, got {}", HIERARCHY_DEPTH, level),
            )),
        }
    }

    /// 1-based position
    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    /// Name used in query strings
    pub fn param_name(self) -> &'static str {
        match self {
            HierarchyLevel::Tier => "tier",
            HierarchyLevel::Location => "location",
            HierarchyLevel::Category => "category",
            HierarchyLevel::ListedType => "listedType",
            HierarchyLevel::BuildingType => "buildingType",
            HierarchyLevel::Layout => "layout",
        }
    }

    fn column(self) -> StationRequirementColumn {
        match self {
            HierarchyLevel::Tier => StationRequirementColumn::Tier,
            HierarchyLevel::Location => StationRequirementColumn::Location,
            HierarchyLevel::Category => StationRequirementColumn::Category,
            HierarchyLevel::ListedType => StationRequirementColumn::ListedType,
            HierarchyLevel::BuildingType => StationRequirementColumn::BuildingType,
            HierarchyLevel::Layout => StationRequirementColumn::Layout,
        }
    }
}

/// A path as chosen so far by a client. Blank values count as unset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialPath {
    pub tier: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub listed_type: Option<String>,
    pub building_type: Option<String>,
    pub layout: Option<String>,
}

impl PartialPath {
    pub fn get(&self, level: HierarchyLevel) -> Option<&str> {
        let value = match level {
            HierarchyLevel::Tier => &self.tier,
            HierarchyLevel::Location => &self.location,
            HierarchyLevel::Category => &self.category,
            HierarchyLevel::ListedType => &self.listed_type,
            HierarchyLevel::BuildingType => &self.building_type,
            HierarchyLevel::Layout => &self.layout,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    fn require(&self, level: HierarchyLevel, needed_by: &str) -> Result<&str> {
        self.get(level).ok_or_else(|| {
            AppError::validation(
                level.param_name(),
                format!("{} requires `{}`", needed_by, level.param_name()),
            )
        })
    }

    /// Every level strictly above `level`, all of which must be set
    pub fn prefix_for(&self, level: HierarchyLevel) -> Result<Vec<(HierarchyLevel, &str)>> {
        let needed_by = format!("level {}", level.number());
        HierarchyLevel::ALL
            .iter()
            .take_while(|l| **l < level)
            .map(|l| self.require(*l, &needed_by).map(|v| (*l, v)))
            .collect()
    }

    /// Full path, failing on the first missing component
    pub fn complete(&self) -> Result<RequirementPath> {
        let needed_by = "lookup";
        Ok(RequirementPath {
            tier: self.require(HierarchyLevel::Tier, needed_by)?.to_string(),
            location: self.require(HierarchyLevel::Location, needed_by)?.to_string(),
            category: self.require(HierarchyLevel::Category, needed_by)?.to_string(),
            listed_type: self.require(HierarchyLevel::ListedType, needed_by)?.to_string(),
            building_type: self.require(HierarchyLevel::BuildingType, needed_by)?.to_string(),
            layout: self.require(HierarchyLevel::Layout, needed_by)?.to_string(),
        })
    }
}

/// A complete 6-level path; the natural key of a station requirement
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementPath {
    pub tier: String,
    pub location: String,
    pub category: String,
    pub listed_type: String,
    pub building_type: String,
    pub layout: String,
}

impl RequirementPath {
    /// Build from trimmed components; `None` if any component is blank
    pub fn from_components(components: [&str; HIERARCHY_DEPTH]) -> Option<Self> {
        let [tier, location, category, listed_type, building_type, layout] =
            components.map(str::trim);
        if [tier, location, category, listed_type, building_type, layout]
            .iter()
            .any(|c| c.is_empty())
        {
            return None;
        }
        Some(Self {
            tier: tier.to_string(),
            location: location.to_string(),
            category: category.to_string(),
            listed_type: listed_type.to_string(),
            building_type: building_type.to_string(),
            layout: layout.to_string(),
        })
    }
}

impl std::fmt::Display for RequirementPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} / {} / {} / {} / {} / {}",
            self.tier, self.location, self.category, self.listed_type, self.building_type, self.layout
        )
    }
}

/// Station requirement as returned to clients: zero quantities removed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementView {
    pub id: i32,
    pub tier: String,
    pub location: String,
    pub category: String,
    pub listed_type: String,
    pub building_type: String,
    pub layout: String,
    pub commodities: Commodities,
}

impl From<StationRequirement> for RequirementView {
    fn from(row: StationRequirement) -> Self {
        Self {
            id: row.id,
            commodities: row.commodities.non_zero(),
            tier: row.tier,
            location: row.location,
            category: row.category,
            listed_type: row.listed_type,
            building_type: row.building_type,
            layout: row.layout,
        }
    }
}

/// Counts reported after a refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

/// Coerce a sheet cell to a quantity. Blank, non-numeric and negative cells
/// become zero; `1,200` and `40.0` are accepted.
pub fn coerce_quantity(cell: &str) -> i64 {
    let cleaned: String = cell.trim().chars().filter(|c| *c != ',').collect();
    if let Ok(value) = cleaned.parse::<i64>() {
        return value.max(0);
    }
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 && value.fract() == 0.0 => value as i64,
        _ => 0,
    }
}

/// Requirement catalog backed by the repository
#[derive(Clone)]
pub struct Catalog {
    repo: Repository,
}

impl Catalog {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Distinct values available at `level` under the chosen prefix
    pub async fn resolve_level(&self, level: u8, partial: &PartialPath) -> Result<Vec<String>> {
        let level = HierarchyLevel::from_number(level)?;
        let prefix = partial.prefix_for(level)?;
        let filters: Vec<_> = prefix.iter().map(|(l, v)| (l.column(), *v)).collect();

        self.repo
            .distinct_requirement_values(level.column(), &filters)
            .await
    }

    /// Exact lookup of a full path
    pub async fn lookup(&self, partial: &PartialPath) -> Result<RequirementView> {
        let path = partial.complete()?;
        self.repo
            .find_requirement_by_path(&path)
            .await?
            .map(RequirementView::from)
            .ok_or_else(|| AppError::RequirementNotFound {
                path: path.to_string(),
            })
    }

    /// Upsert every usable row in one transaction.
    ///
    /// Rows with a blank hierarchy component are skipped. When a path occurs
    /// more than once, the last row wins.
    pub async fn refresh(&self, rows: Vec<SourceRow>) -> Result<RefreshSummary> {
        let started = Instant::now();
        let mut summary = RefreshSummary::default();
        let mut entries: BTreeMap<RequirementPath, Commodities> = BTreeMap::new();

        for row in rows {
            let Some(path) = row.path() else {
                summary.skipped += 1;
                continue;
            };
            entries.insert(path, row.commodities());
        }

        let outcomes = self
            .repo
            .upsert_requirements(entries.into_iter().collect())
            .await
            .map_err(|e| AppError::Ingestion {
                message: format!("catalog refresh rolled back: {}", e),
            })?;

        for outcome in outcomes {
            match outcome {
                UpsertOutcome::Inserted => summary.inserted += 1,
                UpsertOutcome::Updated => summary.updated += 1,
                UpsertOutcome::Unchanged => summary.unchanged += 1,
            }
        }

        metrics::record_catalog_refresh(started.elapsed().as_secs_f64(), &summary);
        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            "Station requirements refreshed"
        );

        Ok(summary)
    }
}
