//! Tabular source for the requirement catalog
//!
//! The sheet has one header row. The first six columns are the hierarchy
//! (tier, location, category, listed type, building type, layout); every
//! further column is a commodity and its cells hold required quantities.

use super::{coerce_quantity, RequirementPath, HIERARCHY_DEPTH};
use crate::config::CatalogConfig;
use crate::db::models::Commodities;
use crate::errors::{AppError, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Hierarchy columns plus at least one commodity
pub const MIN_COLUMNS: usize = HIERARCHY_DEPTH + 1;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One raw sheet row, before coercion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub hierarchy: Vec<String>,
    pub cells: Vec<(String, String)>,
}

impl SourceRow {
    /// The row's path, or `None` when any hierarchy cell is blank
    pub fn path(&self) -> Option<RequirementPath> {
        let get = |i: usize| self.hierarchy.get(i).map(String::as_str).unwrap_or("");
        RequirementPath::from_components([get(0), get(1), get(2), get(3), get(4), get(5)])
    }

    /// Quantities with unusable cells coerced to zero
    pub fn commodities(&self) -> Commodities {
        self.cells
            .iter()
            .map(|(name, cell)| (name.clone(), coerce_quantity(cell)))
            .collect()
    }
}

/// Parse a CSV document into source rows
pub fn parse_table(text: &str) -> Result<Vec<SourceRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.len() < MIN_COLUMNS {
        return Err(AppError::Ingestion {
            message: format!(
                "expected at least {} columns, found {}",
                MIN_COLUMNS,
                headers.len()
            ),
        });
    }

    let commodity_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .skip(HIERARCHY_DEPTH)
        .filter(|(_, name)| !name.is_empty())
        .map(|(i, name)| (i, name.to_string()))
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let hierarchy = (0..HIERARCHY_DEPTH)
            .map(|i| record.get(i).unwrap_or("").to_string())
            .collect();
        let cells = commodity_columns
            .iter()
            .map(|(i, name)| (name.clone(), record.get(*i).unwrap_or("").to_string()))
            .collect();
        rows.push(SourceRow { hierarchy, cells });
    }

    debug!(rows = rows.len(), commodities = commodity_columns.len(), "Parsed requirement sheet");
    Ok(rows)
}

/// Where the sheet is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Url(String),
    File(PathBuf),
}

impl CatalogSource {
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        match (&config.source_url, &config.source_path) {
            (Some(url), _) => Ok(CatalogSource::Url(url.clone())),
            (None, Some(path)) => Ok(CatalogSource::File(PathBuf::from(path))),
            (None, None) => Err(AppError::Configuration {
                message: "no catalog source configured (catalog.source_url or catalog.source_path)"
                    .to_string(),
            }),
        }
    }

    /// Read and parse the sheet
    pub async fn load(&self) -> Result<Vec<SourceRow>> {
        let text = match self {
            CatalogSource::Url(url) => {
                info!(%url, "Fetching requirement sheet");
                fetch(url).await.map_err(|e| AppError::Ingestion {
                    message: format!("failed to fetch {}: {}", url, e),
                })?
            }
            CatalogSource::File(path) => {
                info!(path = %path.display(), "Reading requirement sheet");
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| AppError::Ingestion {
                        message: format!("failed to read {}: {}", path.display(), e),
                    })?
            }
        };

        parse_table(&text)
    }
}

async fn fetch(url: &str) -> std::result::Result<String, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()?
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "\
Tier,Location,Category,Listed Type,Building Type,Layout,Steel,Titanium,CMM Composite
T1,Orbital,Starport,Outpost,Civilian,Vulture,500,0,\"1,200\"
T1,Orbital,Starport,Outpost,Military,Plutus,40,,n/a
,Orbital,Starport,Outpost,Military,Plutus,1,1,1
";

    #[test]
    fn test_parse_table_maps_columns() {
        let rows = parse_table(SHEET).unwrap();
        assert_eq!(rows.len(), 3);

        let first = &rows[0];
        assert_eq!(first.path().unwrap().layout, "Vulture");
        let commodities = first.commodities();
        assert_eq!(commodities.0.get("Steel"), Some(&500));
        assert_eq!(commodities.0.get("Titanium"), Some(&0));
        assert_eq!(commodities.0.get("CMM Composite"), Some(&1200));

        let second = rows[1].commodities();
        assert_eq!(second.0.get("Titanium"), Some(&0));
        assert_eq!(second.0.get("CMM Composite"), Some(&0));

        assert!(rows[2].path().is_none());
    }

    #[test]
    fn test_parse_table_rejects_narrow_sheets() {
        let err = parse_table("Tier,Location,Category\nT1,X,Y\n").unwrap_err();
        match err {
            AppError::Ingestion { message } => {
                assert_eq!(message, "expected at least 7 columns, found 3")
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_short_rows_pad_with_blanks() {
        let rows = parse_table("a,b,c,d,e,f,Steel\nT1,X,Y,Z,W\n").unwrap();
        assert!(rows[0].path().is_none());
        assert_eq!(rows[0].commodities().0.get("Steel"), Some(&0));
    }

    #[test]
    fn test_source_from_config() {
        let config = CatalogConfig {
            source_url: None,
            source_path: Some("data/requirements.csv".into()),
        };
        assert_eq!(
            CatalogSource::from_config(&config).unwrap(),
            CatalogSource::File(PathBuf::from("data/requirements.csv"))
        );

        let err = CatalogSource::from_config(&CatalogConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("colonia-sheet-{}.csv", std::process::id()));
        tokio::fs::write(&path, SHEET).await.unwrap();

        let rows = CatalogSource::File(path.clone()).load().await.unwrap();
        assert_eq!(rows.len(), 3);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_ingestion_failure() {
        let source = CatalogSource::File(PathBuf::from("/nonexistent/colonia/sheet.csv"));
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, AppError::Ingestion { .. }));
    }
}
