// src/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// A tracked debenture and its last known nominal price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Uppercase ticker, e.g. "ABC12"
    pub code: String,
    /// Reference date as `YYYY-MM-DD`, or empty when unknown
    pub ref_date: String,
    /// Comma-decimal price, e.g. "1.234,5678"
    pub value: String,
}

impl Asset {
    pub fn new(code: impl Into<String>, ref_date: impl Into<String>, value: impl Into<String>) -> Self {
        Asset {
            code: code.into(),
            ref_date: ref_date.into(),
            value: value.into(),
        }
    }

    /// Staleness check against today's date in `YYYY-MM-DD` form.
    pub fn is_up_to_date(&self, today: &str) -> bool {
        self.ref_date == today
    }

    pub fn apply(&mut self, quote: Quote) {
        self.value = quote.value;
        self.ref_date = quote.ref_date;
    }
}

/// A price found upstream, already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub value: String,
    /// `YYYY-MM-DD`
    pub ref_date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Transport,
    NotFound,
    Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Source {
    Tabular,
    Rendered,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Source::Tabular => write!(f, "tabular"),
            Source::Rendered => write!(f, "rendered"),
        }
    }
}

/// Failure to refresh one asset. Never fatal to the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapError {
    pub message: String,
    pub asset_code: String,
    pub kind: ErrorKind,
    pub source: Source,
}

impl ScrapError {
    pub fn new(message: impl Into<String>, asset_code: impl Into<String>, kind: ErrorKind, source: Source) -> Self {
        ScrapError {
            message: message.into(),
            asset_code: asset_code.into(),
            kind,
            source,
        }
    }
}

impl fmt::Display for ScrapError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.source, self.asset_code, self.message)
    }
}

impl std::error::Error for ScrapError {}

/// What a single source pass did to a batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub changed: bool,
    pub errors: Vec<ScrapError>,
}

impl SourceReport {
    pub fn unchanged() -> Self {
        SourceReport::default()
    }
}

/// Final outcome of a resolver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub assets: Vec<Asset>,
    pub changed: bool,
    pub errors: Vec<ScrapError>,
}
