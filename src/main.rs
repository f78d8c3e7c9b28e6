use anyhow::bail;
use clap::Parser;
use dotenv::dotenv;
use log::{error, info, warn};

use debenture_scraper::build_resolver;
use debenture_scraper::config::{Cli, Config, StoreConfig};
use debenture_scraper::services::sheets::SheetsStore;
use debenture_scraper::services::store::{AssetStore, CsvStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_cli(Cli::parse())?;
    let store: Box<dyn AssetStore> = match &config.store {
        StoreConfig::Sheets(sheets) => Box::new(SheetsStore::new(sheets.clone())),
        StoreConfig::Csv(path) => Box::new(CsvStore::new(path)),
    };

    info!("📝 Getting Spreadsheet data");
    let assets = match store.load().await {
        Ok(assets) => assets,
        Err(e) => {
            error!("Error getting the Spreadsheet data");
            error!("{}", e);
            return Err(e.into());
        }
    };
    if assets.is_empty() {
        warn!("No assets found in the Spreadsheet");
        return Ok(());
    }

    info!("🏊 Scraping for market and asset value");
    let resolver = build_resolver(&config)?;
    let resolution = resolver.resolve(assets).await?;

    if resolution.changed {
        info!("📝 Updating the Spreadsheet");
        if let Err(e) = store.save(&resolution.assets).await {
            error!("Error setting the Spreadsheet data");
            error!("{}", e);
            return Err(e.into());
        }
    }

    info!("🏁 Script is done");
    if !resolution.errors.is_empty() {
        for e in &resolution.errors {
            error!("{}", e);
        }
        bail!("{} asset(s) could not be updated, check errors thrown", resolution.errors.len());
    }
    Ok(())
}
