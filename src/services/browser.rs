// src/services/browser.rs
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, LookupError, Result};
use crate::services::rendered::{CardText, PageSession, SessionLauncher};

const WINDOW_SIZE: (u32, u32) = (1080, 1024);

/// headless_chrome is blocking, so every call is moved onto tokio's blocking pool.
async fn blocking<T, F>(f: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    pub headless: bool,
}

impl Default for ChromeLauncher {
    fn default() -> Self {
        ChromeLauncher { headless: true }
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    type Session = ChromeSession;

    async fn launch(&self) -> Result<ChromeSession> {
        let headless = self.headless;
        info!("Launching Chrome (headless: {})", headless);
        blocking(move || {
            let options = LaunchOptions::default_builder()
                .headless(headless)
                .window_size(Some(WINDOW_SIZE))
                .build()
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            let browser = Browser::new(options)?;
            let tab = browser.new_tab()?;
            tab.enable_stealth_mode()?;
            Ok(ChromeSession {
                browser: Some(browser),
                tab,
            })
        })
        .await
        .map_err(|e| AppError::BrowserLaunch(e.to_string()))
    }
}

/// One browser process and the single tab every asset is looked up in.
/// The process is killed when the session is closed or dropped.
pub struct ChromeSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn goto(&mut self, url: &str) -> std::result::Result<(), LookupError> {
        debug!("Navigating to {}", url);
        let tab = Arc::clone(&self.tab);
        let url = url.to_string();
        blocking(move || {
            tab.navigate_to(&url)?.wait_until_navigated()?;
            Ok(())
        })
        .await
        .map_err(|e| LookupError::Transport(e.to_string()))
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> bool {
        let tab = Arc::clone(&self.tab);
        let selector = selector.to_string();
        blocking(move || {
            tab.wait_for_element_with_custom_timeout(&selector, timeout)?;
            Ok(())
        })
        .await
        .is_ok()
    }

    async fn cards(&mut self, card: &str, title: &str, value: &str) -> std::result::Result<Vec<CardText>, LookupError> {
        let tab = Arc::clone(&self.tab);
        let (card, title, value) = (card.to_string(), title.to_string(), value.to_string());
        blocking(move || {
            // No match is reported as an error by the driver.
            let elements = tab.find_elements(&card).unwrap_or_default();
            let texts = elements
                .iter()
                .map(|el| CardText {
                    title: el.find_element(&title).and_then(|t| t.get_inner_text()).ok(),
                    value: el.find_element(&value).and_then(|v| v.get_inner_text()).ok(),
                })
                .collect();
            Ok(texts)
        })
        .await
        .map_err(|e| LookupError::Transport(e.to_string()))
    }

    async fn screenshot(&mut self, path: PathBuf) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        let png = blocking(move || tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true))
            .await
            .map_err(|e| AppError::Browser(e.to_string()))?;
        tokio::fs::write(&path, png).await?;
        info!("Saved screenshot {}", path.display());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(browser) = self.browser.take() {
            blocking(move || {
                drop(browser);
                Ok(())
            })
            .await
            .map_err(|e| AppError::Browser(e.to_string()))?;
        }
        Ok(())
    }
}
