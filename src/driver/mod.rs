//! Browser driver abstraction
//!
//! The scenario core only needs a handful of capabilities from the page under
//! test: query by selector, per-element visibility and interactability,
//! click, type, submit, and the current location. [`Driver`] captures exactly
//! that, so the same journey runs against a real WebDriver session or an
//! in-memory test double.

pub mod actions;
pub mod observe;
pub mod service;
pub mod webdriver;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};

pub use webdriver::BrowserSession;

/// How to locate elements
///
/// Written in configuration as `strategy:value`; a bare value is a CSS
/// selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Selector {
    Css(String),
    XPath(String),
    Id(String),
    Name(String),
    LinkText(String),
    Tag(String),
}

impl FromStr for Selector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (strategy, value) = match s.split_once(':') {
            Some((prefix, rest))
                if matches!(prefix, "css" | "xpath" | "id" | "name" | "link" | "tag") =>
            {
                (prefix, rest.trim())
            }
            _ => ("css", s),
        };

        if value.is_empty() {
            return Err(Error::InvalidSelector(s.to_string()));
        }

        let value = value.to_string();
        Ok(match strategy {
            "xpath" => Selector::XPath(value),
            "id" => Selector::Id(value),
            "name" => Selector::Name(value),
            "link" => Selector::LinkText(value),
            "tag" => Selector::Tag(value),
            _ => Selector::Css(value),
        })
    }
}

impl TryFrom<String> for Selector {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Selector> for String {
    fn from(s: Selector) -> Self {
        s.to_string()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(v) => write!(f, "{}", v),
            Selector::XPath(v) => write!(f, "xpath:{}", v),
            Selector::Id(v) => write!(f, "id:{}", v),
            Selector::Name(v) => write!(f, "name:{}", v),
            Selector::LinkText(v) => write!(f, "link:{}", v),
            Selector::Tag(v) => write!(f, "tag:{}", v),
        }
    }
}

/// Snapshot of one matched element at query time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementState {
    pub visible: bool,
    pub interactable: bool,
    pub text: String,
}

/// The page under test, as seen by the scenario core
///
/// Element-targeted operations re-locate by `(selector, index)` at call time,
/// so a re-rendered page never hands back a stale handle.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Load `url` in the current window
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Current location of the window
    async fn current_location(&self) -> Result<String>;

    /// All elements matching `selector`; empty when nothing matches
    async fn query(&self, selector: &Selector) -> Result<Vec<ElementState>>;

    /// Click the `index`-th match
    async fn activate(&self, selector: &Selector, index: usize) -> Result<()>;

    /// Replace the text of the `index`-th match
    async fn set_text(&self, selector: &Selector, index: usize, text: &str) -> Result<()>;

    /// Press Enter in the `index`-th match, submitting its form
    async fn submit(&self, selector: &Selector, index: usize) -> Result<()>;
}
