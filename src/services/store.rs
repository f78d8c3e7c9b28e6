// src/services/store.rs
use async_trait::async_trait;
use csv::{Reader, Writer};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::models::Asset;
use crate::services::dates;

/// Value given to assets that have never been priced.
pub const DEFAULT_VALUE: &str = "0,0000";

/// Where the asset table lives between runs.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn load(&self) -> Result<Vec<Asset>>;
    async fn save(&self, assets: &[Asset]) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    code: String,
    #[serde(default)]
    value: String,
    /// DD/MM/YYYY, same as the spreadsheet
    #[serde(default)]
    ref_date: String,
}

/// Local `code,value,ref_date` file standing in for the spreadsheet.
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvStore { path: path.into() }
    }
}

#[async_trait]
impl AssetStore for CsvStore {
    async fn load(&self) -> Result<Vec<Asset>> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        let mut rdr = Reader::from_reader(text.as_bytes());

        let mut assets = Vec::new();
        for record in rdr.deserialize() {
            let row: CsvRow = record?;
            let code = row.code.trim();
            if code.is_empty() {
                continue;
            }
            let value = if row.value.trim().is_empty() {
                DEFAULT_VALUE.to_string()
            } else {
                row.value
            };
            let ref_date = dates::to_internal(&row.ref_date).unwrap_or_default();
            assets.push(Asset::new(code.to_uppercase(), ref_date, value));
        }
        info!("Read {} asset(s) from {}", assets.len(), self.path.display());
        Ok(assets)
    }

    async fn save(&self, assets: &[Asset]) -> Result<()> {
        let mut wtr = Writer::from_writer(Vec::new());
        for a in assets {
            wtr.serialize(CsvRow {
                code: a.code.clone(),
                value: a.value.clone(),
                ref_date: dates::to_external(&a.ref_date).unwrap_or_default(),
            })?;
        }
        let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
        tokio::fs::write(&self.path, bytes).await?;
        info!("Wrote {} asset(s) to {}", assets.len(), self.path.display());
        Ok(())
    }
}
