// src/lib.rs

pub mod config;
pub mod error;
pub mod models;
pub mod services;

use services::browser::ChromeLauncher;
use services::rendered::RenderedClient;
use services::resolver::UpdateResolver;
use services::tabular::TabularClient;

/// The resolver wired with the real upstream sources.
pub type DefaultResolver = UpdateResolver<TabularClient, RenderedClient<ChromeLauncher>>;

pub fn build_resolver(config: &config::Config) -> error::Result<DefaultResolver> {
    let primary = TabularClient::new(config.primary_url.clone(), config.http_timeout)?;
    let fallback = RenderedClient::new(
        ChromeLauncher {
            headless: config.headless,
        },
        config.rendered.clone(),
    );
    Ok(UpdateResolver::new(primary, fallback))
}
