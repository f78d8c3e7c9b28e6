// src/error.rs
use thiserror::Error;

use crate::models::{ErrorKind, ScrapError, Source};

/// Outcome of a single failed lookup against one source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Format(String),
}

impl LookupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LookupError::Transport(_) => ErrorKind::Transport,
            LookupError::NotFound(_) => ErrorKind::NotFound,
            LookupError::Format(_) => ErrorKind::Format,
        }
    }

    pub fn into_scrap_error(self, asset_code: &str, source: Source) -> ScrapError {
        let kind = self.kind();
        ScrapError::new(self.to_string(), asset_code, kind, source)
    }
}

/// Failures that abort the whole run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to launch the rendering engine: {0}")]
    BrowserLaunch(String),

    #[error("rendering engine error: {0}")]
    Browser(String),

    #[error("credential file doesn't exist: {0}")]
    MissingCredential(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("spreadsheet error: {0}")]
    Sheets(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
