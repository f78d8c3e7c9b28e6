// src/services/tabular.rs
//! Primary source: the historical nominal-price table served by the
//! debentures registry. One form POST per asset, answered with an HTML
//! table whose rows are `code | ref date | ... | ... | ... | PU PAR`.

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{info, warn};
use regex::Regex;
use reqwest::{header::CONTENT_TYPE, Client};
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{LookupError, Result};
use crate::models::{Asset, Quote, Source, SourceReport};
use crate::services::dates;
use crate::services::resolver::PriceSource;

pub const DEFAULT_ENDPOINT: &str =
    "https://www.debentures.com.br/exploreosnd/consultaadados/emissoesdedebentures/puhistorico_r.asp";

/// Width the `ativo` field is padded to.
const CODE_WIDTH: usize = 10;
const REF_DATE_COLUMN: usize = 1;
const VALUE_COLUMN: usize = 5;

fn value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,3}(\.\d{3})*,\d+").expect("valid value regex"))
}

pub struct TabularClient {
    client: Client,
    endpoint: String,
}

impl TabularClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(timeout)
            .build()?;
        Ok(TabularClient {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Request the table for `code` and pull its quote out.
    pub async fn lookup(&self, code: &str, today: NaiveDate) -> std::result::Result<Quote, LookupError> {
        let html = self.request(code, today).await.map_err(|e| match e {
            LookupError::Transport(reason) => LookupError::Transport(format!(
                "Couldn't get the results for the asset '{}'. Make sure its code is correct. Will try again...: {}",
                code, reason
            )),
            other => other,
        })?;
        info!("💰 Scraping for the nominal price of '{}'", code);
        extract_quote(&html, code)
    }

    async fn request(&self, code: &str, today: NaiveDate) -> std::result::Result<String, LookupError> {
        let (start, end) = dates::lookup_window(today);
        // Spaces are form-encoded as '+', which is the padding the endpoint expects.
        let padded = format!("{:<width$}", code, width = CODE_WIDTH);
        let start = dates::format_external(start);
        let end = dates::format_external(end);
        let form = [
            ("ativo", padded.as_str()),
            ("dt_ini", start.as_str()),
            ("dt_fim", end.as_str()),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let textual = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| !ct.contains("json") && !ct.starts_with("image/") && !ct.contains("octet-stream"))
            .unwrap_or(true);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        match String::from_utf8(bytes.to_vec()) {
            Ok(body) if textual => Ok(body),
            Ok(body) => Err(LookupError::Format(format!(
                "Unknown data type for the asset '{}': {}",
                code, body
            ))),
            Err(_) => Err(LookupError::Format(format!(
                "Unknown data type for the asset '{}': {} non-text bytes",
                code,
                bytes.len()
            ))),
        }
    }
}

/// Positional extraction of the quote for `code` from the table page.
pub fn extract_quote(html: &str, code: &str) -> std::result::Result<Quote, LookupError> {
    // An empty code would match the first blank cell of any row.
    if code.trim().is_empty() {
        return Err(LookupError::NotFound("Can't look up an asset without a code".to_string()));
    }
    let document = Html::parse_document(html);
    let cell_selector = Selector::parse("td").expect("valid selector");

    let row = document
        .select(&cell_selector)
        .find(|cell| cell_text(cell) == code)
        .and_then(|cell| cell.parent())
        .and_then(ElementRef::wrap)
        .ok_or_else(|| {
            LookupError::NotFound(format!(
                "Couldn't find a table with the element '{}'. Will try again...",
                code
            ))
        })?;

    let cells: Vec<ElementRef> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
        .collect();

    let ref_date_text = cells.get(REF_DATE_COLUMN).map(cell_text).ok_or_else(|| {
        LookupError::NotFound(format!(
            "The row should have a cell at column {} for asset '{}'. Will try again...",
            REF_DATE_COLUMN, code
        ))
    })?;
    let ref_date = dates::to_internal(&ref_date_text).ok_or_else(|| {
        LookupError::Format(format!(
            "Unexpected date format '{}' for asset '{}'. Will try again...",
            ref_date_text, code
        ))
    })?;

    let value = cells.get(VALUE_COLUMN).map(cell_text).ok_or_else(|| {
        LookupError::NotFound(format!(
            "The row should have a cell at column {} for asset '{}'. Will try again...",
            VALUE_COLUMN, code
        ))
    })?;
    if !value_re().is_match(&value) {
        return Err(LookupError::Format(format!(
            "Unexpected value format '{}' for asset '{}'. Will try again...",
            value, code
        )));
    }

    Ok(Quote { value, ref_date })
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

#[async_trait]
impl PriceSource for TabularClient {
    async fn fetch(&self, assets: &mut [Asset], today: NaiveDate) -> Result<SourceReport> {
        let today_str = dates::format_internal(today);
        if assets.iter().all(|a| a.is_up_to_date(&today_str)) {
            warn!("All assets are already up-to-date");
            return Ok(SourceReport::unchanged());
        }

        let mut report = SourceReport::unchanged();
        for asset in assets.iter_mut() {
            if asset.is_up_to_date(&today_str) {
                warn!("Skipping already updated asset '{}'", asset.code);
                continue;
            }

            match self.lookup(&asset.code, today).await {
                Ok(quote) => {
                    info!("🔄 Updating asset => {}: {} ({})", asset.code, quote.value, quote.ref_date);
                    asset.apply(quote);
                    report.changed = true;
                }
                Err(e) => {
                    warn!("{}", e);
                    report.errors.push(e.into_scrap_error(&asset.code, Source::Tabular));
                }
            }
        }
        Ok(report)
    }
}
