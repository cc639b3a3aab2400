//! Real browser sessions over the WebDriver protocol

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::json;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;

use super::service::DriverService;
use super::{Driver, ElementState, Selector};
use crate::common::config::{Browser, WebDriverConfig};
use crate::common::paths::ensure_parent_dir;
use crate::common::{Error, Result};
use crate::scenario::Session;

/// Enter key in the WebDriver key table
const ENTER: &str = "\u{E007}";

/// A WebDriver-controlled browser window
pub struct WebDriverPage {
    driver: WebDriver,
}

fn by(selector: &Selector) -> By {
    match selector {
        Selector::Css(v) => By::Css(v.as_str()),
        Selector::XPath(v) => By::XPath(v.as_str()),
        Selector::Id(v) => By::Id(v.as_str()),
        Selector::Name(v) => By::Name(v.as_str()),
        Selector::LinkText(v) => By::LinkText(v.as_str()),
        Selector::Tag(v) => By::Tag(v.as_str()),
    }
}

impl WebDriverPage {
    async fn element(&self, selector: &Selector, index: usize) -> Result<WebElement> {
        let mut found = self.driver.find_all(by(selector)).await?;
        if index >= found.len() {
            return Err(Error::element_not_found(selector, index));
        }
        Ok(found.swap_remove(index))
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        self.driver.screenshot(path).await?;
        Ok(())
    }
}

#[async_trait]
impl Driver for WebDriverPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.driver.goto(url).await?;
        Ok(())
    }

    async fn current_location(&self) -> Result<String> {
        Ok(self.driver.current_url().await?.to_string())
    }

    async fn query(&self, selector: &Selector) -> Result<Vec<ElementState>> {
        let elements = self.driver.find_all(by(selector)).await?;
        let mut states = Vec::with_capacity(elements.len());
        for element in elements {
            let visible = element.is_displayed().await?;
            let interactable = visible && element.is_enabled().await?;
            let text = element.text().await?;
            states.push(ElementState {
                visible,
                interactable,
                text,
            });
        }
        Ok(states)
    }

    async fn activate(&self, selector: &Selector, index: usize) -> Result<()> {
        self.element(selector, index).await?.click().await?;
        Ok(())
    }

    async fn set_text(&self, selector: &Selector, index: usize, text: &str) -> Result<()> {
        let element = self.element(selector, index).await?;
        element.clear().await?;
        element.send_keys(text).await?;
        Ok(())
    }

    async fn submit(&self, selector: &Selector, index: usize) -> Result<()> {
        self.element(selector, index).await?.send_keys(ENTER).await?;
        Ok(())
    }
}

async fn open(config: &WebDriverConfig) -> WebDriverResult<WebDriver> {
    match config.browser {
        Browser::Chrome => {
            let mut caps = DesiredCapabilities::chrome();
            if config.headless {
                caps.set_headless()?;
            }
            for arg in &config.args {
                caps.add_arg(arg)?;
            }
            caps.add_experimental_option(
                "prefs",
                json!({
                    "credentials_enable_service": false,
                    "profile.password_manager_enabled": false,
                }),
            )?;
            WebDriver::new(config.url.as_str(), caps).await
        }
        Browser::Firefox => {
            let mut caps = DesiredCapabilities::firefox();
            if config.headless {
                caps.set_headless()?;
            }
            WebDriver::new(config.url.as_str(), caps).await
        }
    }
}

/// A browser session owned by one scenario run
pub struct BrowserSession {
    page: WebDriverPage,
    service: Option<DriverService>,
    screenshot_dir: Option<PathBuf>,
}

impl BrowserSession {
    /// Connect to (or first launch) the WebDriver server and open a browser
    pub async fn connect(config: &WebDriverConfig) -> Result<Self> {
        let service = if config.spawn {
            Some(DriverService::start(config).await?)
        } else {
            None
        };

        tracing::info!("Opening {:?} session at {}", config.browser, config.url);
        let driver = match open(config).await {
            Ok(driver) => driver,
            Err(e) => {
                if let Some(service) = service {
                    if let Err(stop) = service.stop().await {
                        tracing::warn!("Failed to stop driver service: {}", stop);
                    }
                }
                return Err(Error::SessionStart {
                    url: config.url.clone(),
                    message: e.to_string(),
                });
            }
        };

        Ok(Self {
            page: WebDriverPage { driver },
            service,
            screenshot_dir: config.screenshot_dir.clone(),
        })
    }
}

fn screenshot_path(dir: &Path) -> PathBuf {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    dir.join(format!("failure-{}.png", millis))
}

#[async_trait]
impl Session for BrowserSession {
    type Target = dyn Driver;

    fn target(&self) -> &Self::Target {
        &self.page
    }

    async fn evidence(&self) -> Vec<String> {
        let mut evidence = Vec::new();
        match self.page.current_location().await {
            Ok(location) => evidence.push(format!("location: {}", location)),
            Err(e) => tracing::debug!("Could not read location: {}", e),
        }
        if let Some(dir) = &self.screenshot_dir {
            let path = screenshot_path(dir);
            match self.page.screenshot(&path).await {
                Ok(()) => evidence.push(format!("screenshot: {}", path.display())),
                Err(e) => tracing::warn!("Screenshot failed: {}", e),
            }
        }
        evidence
    }

    async fn release(self) -> Result<()> {
        let quit = self.page.driver.quit().await.map_err(Error::from);
        let stopped = match self.service {
            Some(service) => service.stop().await,
            None => Ok(()),
        };
        teardown_result(quit, stopped)
    }
}

/// Both teardown steps always run; the quit error wins when both fail
fn teardown_result(quit: Result<()>, stopped: Result<()>) -> Result<()> {
    match (quit, stopped) {
        (Err(quit), Err(stopped)) => {
            tracing::warn!("Driver service also failed to stop: {}", stopped);
            Err(quit)
        }
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Ok(()), Ok(())) => Ok(()),
    }
}
