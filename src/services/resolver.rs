// src/services/resolver.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use chrono_tz::Tz;
use log::{info, warn};
use std::collections::HashSet;

use crate::error::Result;
use crate::models::{Asset, Resolution, SourceReport};
use crate::services::dates;

/// A source able to refresh a batch of assets in place.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self, assets: &mut [Asset], today: NaiveDate) -> Result<SourceReport>;
}

/// Runs the primary source over everything and the fallback over whatever
/// the primary could not resolve.
pub struct UpdateResolver<P, S> {
    primary: P,
    fallback: S,
    tz: Tz,
}

impl<P: PriceSource, S: PriceSource> UpdateResolver<P, S> {
    pub fn new(primary: P, fallback: S) -> Self {
        UpdateResolver {
            primary,
            fallback,
            tz: dates::MARKET_TZ,
        }
    }

    pub async fn resolve(&self, assets: Vec<Asset>) -> Result<Resolution> {
        self.resolve_on(assets, dates::today(self.tz)).await
    }

    /// Same as [`resolve`](Self::resolve) with an explicit "today".
    pub async fn resolve_on(&self, mut assets: Vec<Asset>, today: NaiveDate) -> Result<Resolution> {
        let primary = self.primary.fetch(&mut assets, today).await?;
        if primary.errors.is_empty() {
            return Ok(Resolution {
                assets,
                changed: primary.changed,
                errors: Vec::new(),
            });
        }

        // Joined on code: a code listed twice sends every copy to the fallback.
        let failed: HashSet<&str> = primary.errors.iter().map(|e| e.asset_code.as_str()).collect();
        let (mut retry, resolved): (Vec<Asset>, Vec<Asset>) = assets
            .into_iter()
            .partition(|a| failed.contains(a.code.as_str()));

        info!(
            "{} asset(s) left unresolved by the primary source, trying the fallback",
            retry.len()
        );
        let fallback = self.fallback.fetch(&mut retry, today).await?;
        for e in &fallback.errors {
            warn!("Giving up on '{}': {}", e.asset_code, e.message);
        }

        let mut merged = resolved;
        merged.extend(retry);
        Ok(Resolution {
            assets: merged,
            changed: primary.changed || fallback.changed,
            errors: fallback.errors,
        })
    }
}
