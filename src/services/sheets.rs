// src/services/sheets.rs

use async_trait::async_trait;
use log::{error, info};
use reqwest::Client;
use serde_json::json;
use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::models::Asset;
use crate::services::dates;
use crate::services::google_oauth::fetch_access_token_from_file;
use crate::services::store::{AssetStore, DEFAULT_VALUE};

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Column layout of the asset table
const CODE_COLUMN: usize = 0;
const VALUE_COLUMN: usize = 1;
const REF_DATE_COLUMN: usize = 2;

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub service_account_json_path: PathBuf,
    pub sheet_name: String,
    /// Zero-based index of the first asset row
    pub start_row: usize,
    pub api_base: String,
}

impl SheetsConfig {
    pub fn new(spreadsheet_id: impl Into<String>, service_account_json_path: impl Into<PathBuf>) -> Self {
        SheetsConfig {
            spreadsheet_id: spreadsheet_id.into(),
            service_account_json_path: service_account_json_path.into(),
            sheet_name: "DataSheet".to_string(),
            start_row: 9,
            api_base: SHEETS_API_BASE.to_string(),
        }
    }
}

pub struct SheetsStore {
    pub config: SheetsConfig,
    client: Client,
}

impl SheetsStore {
    pub fn new(config: SheetsConfig) -> Self {
        SheetsStore {
            config,
            client: Client::new(),
        }
    }

    pub async fn get_auth_token(&self) -> Result<String> {
        fetch_access_token_from_file(&self.client, &self.config.service_account_json_path).await
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.spreadsheet_id,
            range
        )
    }

    /// A1 range covering `count` asset rows in columns A:C.
    fn write_range(&self, count: usize) -> String {
        let first = self.config.start_row + 1;
        format!("{}!A{}:C{}", self.config.sheet_name, first, first + count.saturating_sub(1))
    }

    async fn fetch_rows(&self, token: &str) -> Result<Vec<Vec<String>>> {
        let response: serde_json::Value = self
            .client
            .get(self.values_url(&self.config.sheet_name))
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let rows: Vec<Vec<String>> = response["values"]
            .as_array()
            .map(|values| {
                values
                    .iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| {
                                cells
                                    .iter()
                                    .map(|c| match c {
                                        serde_json::Value::String(s) => s.clone(),
                                        other => other.to_string(),
                                    })
                                    .collect::<Vec<String>>()
                            })
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    async fn put_rows(&self, token: &str, rows: Vec<Vec<String>>) -> Result<()> {
        let range = self.write_range(rows.len());
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": rows,
        });

        let response = self
            .client
            .put(self.values_url(&range))
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::Sheets(format!("Failed to update the asset rows: {}", error_text)));
        }
        info!("Updated range {}", range);
        Ok(())
    }
}

#[async_trait]
impl AssetStore for SheetsStore {
    async fn load(&self) -> Result<Vec<Asset>> {
        let token = self.get_auth_token().await?;
        let rows = self.fetch_rows(&token).await?;
        if rows.is_empty() {
            error!("The spreadsheet '{}' returned no data", self.config.spreadsheet_id);
            return Ok(Vec::new());
        }
        Ok(assets_from_rows(&rows, self.config.start_row))
    }

    async fn save(&self, assets: &[Asset]) -> Result<()> {
        if assets.is_empty() {
            return Ok(());
        }
        let token = self.get_auth_token().await?;
        self.put_rows(&token, rows_from_assets(assets)).await
    }
}

/// Rows from `start_row` on with a code in the first column become assets.
pub fn assets_from_rows(rows: &[Vec<String>], start_row: usize) -> Vec<Asset> {
    rows.iter()
        .skip(start_row)
        .filter_map(|row| {
            let code = row.get(CODE_COLUMN).map(|c| c.trim()).filter(|c| !c.is_empty())?;
            let value = row
                .get(VALUE_COLUMN)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .unwrap_or(DEFAULT_VALUE)
                .to_string();
            let ref_date = row
                .get(REF_DATE_COLUMN)
                .and_then(|d| dates::to_internal(d))
                .unwrap_or_default();
            Some(Asset::new(code.to_uppercase(), ref_date, value))
        })
        .collect()
}

pub fn rows_from_assets(assets: &[Asset]) -> Vec<Vec<String>> {
    assets
        .iter()
        .map(|a| {
            vec![
                a.code.clone(),
                a.value.clone(),
                dates::to_external(&a.ref_date).unwrap_or_default(),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn store(server: &MockServer) -> SheetsStore {
        let mut config = SheetsConfig::new("sheet-id", "/unused.json");
        config.start_row = 2;
        config.api_base = server.uri();
        SheetsStore::new(config)
    }

    #[test]
    fn parses_asset_rows_after_the_header_block() {
        let rows = vec![
            row(&["Title"]),
            row(&[]),
            row(&["abc12", "1.000,0000", "02/01/2024"]),
            row(&["XYZ99"]),
            row(&["DEF34", "2,5", "not a date"]),
        ];
        let assets = assets_from_rows(&rows, 2);
        assert_eq!(
            assets,
            vec![
                Asset::new("ABC12", "2024-01-02", "1.000,0000"),
                Asset::new("XYZ99", "", "0,0000"),
                Asset::new("DEF34", "", "2,5"),
            ]
        );
    }

    #[test]
    fn skips_rows_without_a_code() {
        let rows = vec![
            row(&[]),
            row(&["", "", "note"]),
            row(&[" ", "1,0"]),
            row(&["ABC12"]),
            row(&[" def34 ", " "]),
        ];
        assert_eq!(
            assets_from_rows(&rows, 0),
            vec![Asset::new("ABC12", "", "0,0000"), Asset::new("DEF34", "", "0,0000")]
        );
    }

    #[test]
    fn writes_dates_back_in_sheet_format() {
        let rows = rows_from_assets(&[Asset::new("ABC12", "2024-01-02", "1,0"), Asset::new("XYZ99", "", "0,0000")]);
        assert_eq!(rows, vec![row(&["ABC12", "1,0", "02/01/2024"]), row(&["XYZ99", "0,0000", ""])]);
    }

    #[tokio::test]
    async fn reads_values_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-id/values/DataSheet"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "DataSheet!A1:C4",
                "values": [["h"], [], ["ABC12", "1,0", "02/01/2024"]]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let rows = store(&server).fetch_rows("tok").await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(assets_from_rows(&rows, 2), vec![Asset::new("ABC12", "2024-01-02", "1,0")]);
    }

    #[tokio::test]
    async fn writes_rows_from_the_start_row() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v4/spreadsheets/sheet-id/values/DataSheet!A3:C4"))
            .and(query_param("valueInputOption", "RAW"))
            .and(body_json(json!({
                "range": "DataSheet!A3:C4",
                "majorDimension": "ROWS",
                "values": [["ABC12", "1,0", "02/01/2024"], ["XYZ99", "0,0000", ""]]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let rows = rows_from_assets(&[Asset::new("ABC12", "2024-01-02", "1,0"), Asset::new("XYZ99", "", "0,0000")]);
        store(&server).put_rows("tok", rows).await.unwrap();
    }

    #[tokio::test]
    async fn surfaces_write_failures() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
            .mount(&server)
            .await;

        let err = store(&server)
            .put_rows("tok", vec![row(&["ABC12", "1,0", ""])])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Sheets(msg) if msg.contains("PERMISSION_DENIED")));
    }
}
