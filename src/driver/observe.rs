//! Page observables used as wait predicates

use async_trait::async_trait;

use super::{Driver, Selector};
use crate::common::Result;
use crate::wait::Observable;

/// At least one element matches the selector
pub struct ElementPresent(pub Selector);

/// No element matches the selector
pub struct ElementAbsent(pub Selector);

/// At least one matching element is visible
pub struct ElementVisible(pub Selector);

/// At least one matching element is visible and enabled
pub struct ElementInteractable(pub Selector);

/// At least one matching element's text contains `text`
pub struct ElementWithText {
    pub selector: Selector,
    pub text: String,
}

/// The current location contains a marker substring
pub struct LocationContains(pub String);

#[async_trait]
impl<D: Driver + ?Sized> Observable<D> for ElementPresent {
    fn describe(&self) -> String {
        format!("element '{}' present", self.0)
    }

    async fn probe(&self, driver: &D) -> Result<bool> {
        Ok(!driver.query(&self.0).await?.is_empty())
    }
}

#[async_trait]
impl<D: Driver + ?Sized> Observable<D> for ElementAbsent {
    fn describe(&self) -> String {
        format!("no element '{}'", self.0)
    }

    async fn probe(&self, driver: &D) -> Result<bool> {
        Ok(driver.query(&self.0).await?.is_empty())
    }
}

#[async_trait]
impl<D: Driver + ?Sized> Observable<D> for ElementVisible {
    fn describe(&self) -> String {
        format!("element '{}' visible", self.0)
    }

    async fn probe(&self, driver: &D) -> Result<bool> {
        Ok(driver.query(&self.0).await?.iter().any(|e| e.visible))
    }
}

#[async_trait]
impl<D: Driver + ?Sized> Observable<D> for ElementInteractable {
    fn describe(&self) -> String {
        format!("element '{}' clickable", self.0)
    }

    async fn probe(&self, driver: &D) -> Result<bool> {
        Ok(driver
            .query(&self.0)
            .await?
            .iter()
            .any(|e| e.visible && e.interactable))
    }
}

#[async_trait]
impl<D: Driver + ?Sized> Observable<D> for ElementWithText {
    fn describe(&self) -> String {
        format!("element '{}' containing '{}'", self.selector, self.text)
    }

    async fn probe(&self, driver: &D) -> Result<bool> {
        Ok(driver
            .query(&self.selector)
            .await?
            .iter()
            .any(|e| e.text.contains(&self.text)))
    }
}

#[async_trait]
impl<D: Driver + ?Sized> Observable<D> for LocationContains {
    fn describe(&self) -> String {
        format!("location containing '{}'", self.0)
    }

    async fn probe(&self, driver: &D) -> Result<bool> {
        Ok(driver.current_location().await?.contains(&self.0))
    }
}
