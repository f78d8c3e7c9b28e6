// src/config.rs
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::services::rendered::{RenderedConfig, DEFAULT_DEBENTURES_URL, DEFAULT_RECEIVABLES_URL};
use crate::services::sheets::{SheetsConfig, SHEETS_API_BASE};
use crate::services::tabular::DEFAULT_ENDPOINT;

/// Every flag can also come from the environment (or a `.env` file).
#[derive(Debug, Parser)]
#[command(
    name = "debenture-nominal-price-scraper",
    version,
    about = "Scrap debenture's nominal price and update Google Spreadsheets"
)]
pub struct Cli {
    /// Full path to Google Service Account JSON key file
    #[arg(short = 'g', long = "google", env = "SERVICE_ACCOUNT_JSON")]
    pub google: Option<PathBuf>,

    #[arg(long, env = "GOOGLE_SHEETS_ID")]
    pub spreadsheet_id: Option<String>,

    #[arg(long, env = "SHEET_NAME", default_value = "DataSheet")]
    pub sheet: String,

    /// Zero-based row where the asset table starts
    #[arg(long, env = "SHEET_START_ROW", default_value_t = 9)]
    pub start_row: usize,

    /// Read and write a local CSV file instead of the spreadsheet
    #[arg(long, conflicts_with_all = ["google", "spreadsheet_id"])]
    pub csv: Option<PathBuf>,

    #[arg(long, env = "PRIMARY_SOURCE_URL", default_value = DEFAULT_ENDPOINT)]
    pub primary_url: String,

    #[arg(long, env = "DEBENTURES_URL", default_value = DEFAULT_DEBENTURES_URL)]
    pub debentures_url: String,

    #[arg(long, env = "RECEIVABLES_URL", default_value = DEFAULT_RECEIVABLES_URL)]
    pub receivables_url: String,

    /// Where failure screenshots are written
    #[arg(long, env = "SCREENSHOT_DIR", default_value = ".")]
    pub screenshot_dir: PathBuf,

    /// HTTP timeout for the tabular source, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,
}

/// Arguments of the `probe_asset` binary.
#[derive(Debug, Parser)]
#[command(name = "probe_asset", about = "Look up one asset on the tabular source only")]
pub struct ProbeCli {
    /// Asset code, case-insensitive
    pub code: String,

    #[arg(long, env = "PRIMARY_SOURCE_URL", default_value = DEFAULT_ENDPOINT)]
    pub primary_url: String,

    /// HTTP timeout, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

impl ProbeCli {
    pub fn code(&self) -> String {
        self.code.trim().to_uppercase()
    }
}

#[derive(Debug, Clone)]
pub enum StoreConfig {
    Sheets(SheetsConfig),
    Csv(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub primary_url: String,
    pub http_timeout: Duration,
    pub rendered: RenderedConfig,
    pub headless: bool,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let store = match cli.csv {
            Some(path) => StoreConfig::Csv(path),
            None => {
                let credential = cli
                    .google
                    .ok_or_else(|| AppError::Config("a service account key is required (-g/--google)".into()))?;
                if !credential.exists() {
                    return Err(AppError::MissingCredential(credential.display().to_string()));
                }
                let spreadsheet_id = cli
                    .spreadsheet_id
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| AppError::Config("GOOGLE_SHEETS_ID must be set".into()))?;
                StoreConfig::Sheets(SheetsConfig {
                    spreadsheet_id,
                    service_account_json_path: credential,
                    sheet_name: cli.sheet,
                    start_row: cli.start_row,
                    api_base: SHEETS_API_BASE.to_string(),
                })
            }
        };

        if cli.timeout_secs == 0 {
            return Err(AppError::Config("timeout must be at least one second".into()));
        }

        Ok(Config {
            store,
            primary_url: cli.primary_url,
            http_timeout: Duration::from_secs(cli.timeout_secs),
            rendered: RenderedConfig {
                debentures_url: cli.debentures_url,
                receivables_url: cli.receivables_url,
                screenshot_dir: cli.screenshot_dir,
            },
            headless: !cli.headful,
        })
    }
}
