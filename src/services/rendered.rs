// src/services/rendered.rs
//! Fallback source: the instrument "características" pages, which only
//! show the nominal price once rendered by a browser.

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{error, info, warn};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{LookupError, Result};
use crate::models::{Asset, Quote, Source, SourceReport};
use crate::services::dates;
use crate::services::resolver::PriceSource;

pub const DEFAULT_DEBENTURES_URL: &str = "https://data.anbima.com.br/debentures";
pub const DEFAULT_RECEIVABLES_URL: &str = "https://data.anbima.com.br/certificado-de-recebiveis";

const CARD: &str = ".lower-card-item";
const CARD_TITLE: &str = ".lower-card-item-title";
const CARD_VALUE: &str = ".lower-card-item-value";
const NOT_FOUND_MARKER: &str = "#maskNotFound";
const NOMINAL_PRICE_MARKER: &str = "PU PAR";
const CURRENCY_PREFIX: &str = "R$ ";

const VALUE_TIMEOUT: Duration = Duration::from_secs(10);
const NOT_FOUND_TIMEOUT: Duration = Duration::from_secs(1);

/// Screenshot name when the page loaded without any nominal price card.
const FALLBACK_SCREENSHOT: &str = "error.png";

fn ref_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ref\. +([\d/]+)").expect("valid ref date regex"))
}

/// Text content of one card on the rendered page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardText {
    pub title: Option<String>,
    pub value: Option<String>,
}

/// The handful of browser operations the fallback source needs.
#[async_trait]
pub trait PageSession: Send {
    async fn goto(&mut self, url: &str) -> std::result::Result<(), LookupError>;

    /// `false` when `selector` did not show up within `timeout`.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> bool;

    /// Title and value text of every `card` element, in document order.
    async fn cards(&mut self, card: &str, title: &str, value: &str) -> std::result::Result<Vec<CardText>, LookupError>;

    async fn screenshot(&mut self, path: PathBuf) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Starts one session per batch.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    type Session: PageSession;

    async fn launch(&self) -> Result<Self::Session>;
}

#[derive(Debug, Clone)]
pub struct RenderedConfig {
    pub debentures_url: String,
    pub receivables_url: String,
    pub screenshot_dir: PathBuf,
}

impl Default for RenderedConfig {
    fn default() -> Self {
        RenderedConfig {
            debentures_url: DEFAULT_DEBENTURES_URL.to_string(),
            receivables_url: DEFAULT_RECEIVABLES_URL.to_string(),
            screenshot_dir: PathBuf::from("."),
        }
    }
}

pub struct RenderedClient<L> {
    launcher: L,
    config: RenderedConfig,
}

#[derive(Debug)]
enum Failure {
    /// Screenshot named after the asset
    Asset(LookupError),
    /// Screenshot under the fixed fallback name
    Layout(LookupError),
}

impl<L: SessionLauncher> RenderedClient<L> {
    pub fn new(launcher: L, config: RenderedConfig) -> Self {
        RenderedClient { launcher, config }
    }

    fn page_url(base: &str, code: &str) -> String {
        format!("{}/{}/caracteristicas", base.trim_end_matches('/'), code)
    }

    async fn open(&self, session: &mut L::Session, code: &str) -> std::result::Result<(), LookupError> {
        let not_found = || {
            LookupError::NotFound(format!(
                "Couldn't get the results for the asset '{}'. Make sure its code is correct",
                code
            ))
        };

        session.goto(&Self::page_url(&self.config.debentures_url, code)).await?;
        info!("💰 Scraping for the nominal price of '{}'", code);
        if session.wait_for(CARD_VALUE, VALUE_TIMEOUT).await {
            return Ok(());
        }

        if !session.wait_for(NOT_FOUND_MARKER, NOT_FOUND_TIMEOUT).await {
            return Err(not_found());
        }
        warn!("'{}' is not a debenture, trying the receivables page", code);
        session.goto(&Self::page_url(&self.config.receivables_url, code)).await?;
        if session.wait_for(CARD_VALUE, VALUE_TIMEOUT).await {
            Ok(())
        } else {
            Err(not_found())
        }
    }

    async fn lookup(&self, session: &mut L::Session, code: &str) -> std::result::Result<Quote, Failure> {
        self.open(session, code).await.map_err(|e| match e {
            LookupError::Transport(reason) => Failure::Asset(LookupError::Transport(format!(
                "Couldn't get the results for the asset '{}'. Make sure its code is correct: {}",
                code, reason
            ))),
            other => Failure::Asset(other),
        })?;
        let cards = session
            .cards(CARD, CARD_TITLE, CARD_VALUE)
            .await
            .map_err(Failure::Asset)?;
        extract_quote(&cards, code)
    }

    async fn capture(&self, session: &mut L::Session, name: &str) {
        let path = self.config.screenshot_dir.join(name);
        if let Err(e) = session.screenshot(path.clone()).await {
            warn!("Couldn't save screenshot {}: {}", path.display(), e);
        }
    }

    async fn run(&self, session: &mut L::Session, assets: &mut [Asset], today: &str) -> SourceReport {
        let mut report = SourceReport::unchanged();
        for asset in assets.iter_mut() {
            if asset.is_up_to_date(today) {
                warn!("Skipping already updated asset '{}'", asset.code);
                continue;
            }

            match self.lookup(session, &asset.code).await {
                Ok(quote) => {
                    info!("🔄 Updating asset => {}: {} ({})", asset.code, quote.value, quote.ref_date);
                    asset.apply(quote);
                    report.changed = true;
                }
                Err(failure) => {
                    let (e, shot) = match failure {
                        Failure::Asset(e) => (e, format!("{}.png", asset.code)),
                        Failure::Layout(e) => (e, FALLBACK_SCREENSHOT.to_string()),
                    };
                    error!("{}", e);
                    self.capture(session, &shot).await;
                    report.errors.push(e.into_scrap_error(&asset.code, Source::Rendered));
                }
            }
        }
        report
    }
}

/// Reads the nominal price card: the first card whose title mentions the
/// marker decides the outcome, later cards are never looked at.
fn extract_quote(cards: &[CardText], code: &str) -> std::result::Result<Quote, Failure> {
    let card = cards
        .iter()
        .find(|c| c.title.as_deref().is_some_and(|t| t.contains(NOMINAL_PRICE_MARKER)))
        .ok_or_else(|| {
            Failure::Layout(LookupError::NotFound(format!(
                "Couldn't get {} title in the page for '{}'",
                NOMINAL_PRICE_MARKER, code
            )))
        })?;

    let title = card.title.as_deref().unwrap_or_default().replace('\n', " ");
    // The last "ref." in the title wins.
    let ref_date = ref_date_re()
        .captures_iter(&title)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| dates::to_internal(m.as_str()))
        .ok_or_else(|| {
            Failure::Asset(LookupError::Format(format!(
                "Unexpected reference date '{}' for '{}'",
                title.trim(),
                code
            )))
        })?;

    let value = card
        .value
        .as_deref()
        .map(|v| v.trim())
        .map(|v| v.strip_prefix(CURRENCY_PREFIX).unwrap_or(v).trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Failure::Asset(LookupError::Format(format!("Unexpected nominal price for '{}'", code))))?;

    Ok(Quote {
        value: value.to_string(),
        ref_date,
    })
}

#[async_trait]
impl<L: SessionLauncher> PriceSource for RenderedClient<L> {
    async fn fetch(&self, assets: &mut [Asset], today: NaiveDate) -> Result<SourceReport> {
        let today = dates::format_internal(today);
        if assets.iter().all(|a| a.is_up_to_date(&today)) {
            warn!("All assets are already up-to-date");
            return Ok(SourceReport::unchanged());
        }

        let mut session = self.launcher.launch().await?;
        let report = self.run(&mut session, assets, &today).await;
        if let Err(e) = session.close().await {
            warn!("Couldn't close the rendering session: {}", e);
        }
        Ok(report)
    }
}
