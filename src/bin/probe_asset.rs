use clap::Parser;
use debenture_scraper::config::ProbeCli;
use debenture_scraper::services::dates::{self, MARKET_TZ};
use debenture_scraper::services::tabular::TabularClient;
use dotenv::dotenv;
use log::{error, info};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = ProbeCli::parse();
    let code = args.code();

    info!("Looking up the tabular source for '{}'...", code);
    let client = TabularClient::new(args.primary_url.clone(), Duration::from_secs(args.timeout_secs.max(1)))?;

    match client.lookup(&code, dates::today(MARKET_TZ)).await {
        Ok(quote) => {
            info!("SUCCESS: {} = {} (ref. {})", code, quote.value, quote.ref_date);
        }
        Err(e) => {
            error!("ERROR ({:?}): {}", e.kind(), e);
            return Err(e.into());
        }
    }

    Ok(())
}
