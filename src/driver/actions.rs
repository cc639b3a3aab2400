//! Page actions
//!
//! Each action performs one interaction with the page. None of them wait;
//! synchronization belongs to the wait points around them.

use async_trait::async_trait;

use super::{Driver, Selector};
use crate::common::{Error, Result};
use crate::scenario::{Action, StepFailure};

/// Index of the first match that is visible and enabled
async fn usable<D: Driver + ?Sized>(driver: &D, selector: &Selector) -> Result<usize> {
    let found = driver.query(selector).await?;
    if found.is_empty() {
        return Err(Error::element_not_found(selector, 0));
    }
    found
        .iter()
        .position(|e| e.visible && e.interactable)
        .ok_or_else(|| Error::ElementNotInteractable(selector.to_string()))
}

/// Load a URL
pub struct Navigate(pub String);

/// Type into the first usable match
pub struct TypeText {
    pub selector: Selector,
    pub text: String,
    /// Keep the text out of logs (passwords)
    pub secret: bool,
}

/// Click the first usable match
pub struct Click(pub Selector);

/// Press Enter in the first usable match
pub struct Submit(pub Selector);

/// Click the first usable match if there is one; no match is not a failure
pub struct ClickFirstIfAny(pub Selector);

/// Check once that some match's text contains `text`
pub struct ExpectText {
    pub selector: Selector,
    pub text: String,
}

/// Type a message into the composer and submit it, provided a conversation
/// exists to send it to
pub struct SendMessage {
    pub conversations: Selector,
    pub composer: Selector,
    pub text: String,
}

#[async_trait]
impl<D: Driver + ?Sized> Action<D> for Navigate {
    fn describe(&self) -> String {
        format!("navigate to {}", self.0)
    }

    async fn perform(&self, driver: &D) -> std::result::Result<(), StepFailure> {
        driver.navigate(&self.0).await?;
        Ok(())
    }
}

#[async_trait]
impl<D: Driver + ?Sized> Action<D> for TypeText {
    fn describe(&self) -> String {
        if self.secret {
            format!("type ******** into '{}'", self.selector)
        } else {
            format!("type '{}' into '{}'", self.text, self.selector)
        }
    }

    async fn perform(&self, driver: &D) -> std::result::Result<(), StepFailure> {
        let index = usable(driver, &self.selector).await?;
        driver.set_text(&self.selector, index, &self.text).await?;
        Ok(())
    }
}

#[async_trait]
impl<D: Driver + ?Sized> Action<D> for Click {
    fn describe(&self) -> String {
        format!("click '{}'", self.0)
    }

    async fn perform(&self, driver: &D) -> std::result::Result<(), StepFailure> {
        let index = usable(driver, &self.0).await?;
        driver.activate(&self.0, index).await?;
        Ok(())
    }
}

#[async_trait]
impl<D: Driver + ?Sized> Action<D> for Submit {
    fn describe(&self) -> String {
        format!("submit '{}'", self.0)
    }

    async fn perform(&self, driver: &D) -> std::result::Result<(), StepFailure> {
        let index = usable(driver, &self.0).await?;
        driver.submit(&self.0, index).await?;
        Ok(())
    }
}

#[async_trait]
impl<D: Driver + ?Sized> Action<D> for ClickFirstIfAny {
    fn describe(&self) -> String {
        format!("click first '{}' if present", self.0)
    }

    async fn perform(&self, driver: &D) -> std::result::Result<(), StepFailure> {
        if driver.query(&self.0).await?.is_empty() {
            tracing::info!("No element matches '{}', nothing to click", self.0);
            return Ok(());
        }
        let index = usable(driver, &self.0).await?;
        driver.activate(&self.0, index).await?;
        Ok(())
    }
}

#[async_trait]
impl<D: Driver + ?Sized> Action<D> for ExpectText {
    fn describe(&self) -> String {
        format!("expect '{}' in '{}'", self.text, self.selector)
    }

    async fn perform(&self, driver: &D) -> std::result::Result<(), StepFailure> {
        let found = driver.query(&self.selector).await?;
        if found.iter().any(|e| e.text.contains(&self.text)) {
            return Ok(());
        }
        let shown: Vec<&str> = found.iter().map(|e| e.text.as_str()).collect();
        Err(StepFailure::assertion(format!(
            "expected '{}' in '{}', found {:?}",
            self.text, self.selector, shown
        )))
    }
}

#[async_trait]
impl<D: Driver + ?Sized> Action<D> for SendMessage {
    fn describe(&self) -> String {
        format!("send '{}' via '{}'", self.text, self.composer)
    }

    async fn perform(&self, driver: &D) -> std::result::Result<(), StepFailure> {
        if driver.query(&self.conversations).await?.is_empty() {
            tracing::info!("No conversation to send to, skipping message");
            return Ok(());
        }
        let index = usable(driver, &self.composer).await?;
        driver.set_text(&self.composer, index, &self.text).await?;
        driver.submit(&self.composer, index).await?;
        Ok(())
    }
}
