//! Configuration file handling
//!
//! Everything the harness needs from its environment lives here: where the
//! app and its API are, who to log in as, how to reach the WebDriver server,
//! how long to wait, and which selectors locate the page elements.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::{Error, Result};
use crate::driver::Selector;
use crate::wait::WaitSpec;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where the application under test lives
    #[serde(default)]
    pub target: TargetConfig,

    /// Account used by the journeys
    #[serde(default)]
    pub credentials: Credentials,

    /// WebDriver connection settings
    #[serde(default)]
    pub webdriver: WebDriverConfig,

    /// Wait settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Element selectors for the messaging journey
    #[serde(default)]
    pub selectors: Selectors,

    /// Journey parameters
    #[serde(default)]
    pub journey: JourneyConfig,
}

/// Application locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Base URL of the web frontend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL of the HTTP API
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_url: default_api_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_api_url() -> String {
    "http://localhost:5000/api".to_string()
}

impl TargetConfig {
    /// Absolute URL for a frontend path; absolute inputs pass through
    pub fn page_url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Absolute URL for an API path
    pub fn api_endpoint(&self, path: &str) -> String {
        join_url(&self.api_url, path)
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Login credentials; there are deliberately no defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Both fields, or an error naming how to supply them
    pub fn require(&self) -> Result<(&str, &str)> {
        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(email), Some(password)) if !email.is_empty() => Ok((email, password)),
            _ => Err(Error::MissingCredentials),
        }
    }
}

/// Browser to request from the WebDriver server
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
}

impl Browser {
    /// Driver executable looked up on PATH when spawning is enabled
    pub fn driver_binary(&self) -> &'static str {
        match self {
            Browser::Chrome => "chromedriver",
            Browser::Firefox => "geckodriver",
        }
    }
}

/// WebDriver connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebDriverConfig {
    /// WebDriver server URL
    #[serde(default = "default_webdriver_url")]
    pub url: String,

    #[serde(default)]
    pub browser: Browser,

    /// Run the browser without a window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Extra browser arguments (Chrome only)
    #[serde(default)]
    pub args: Vec<String>,

    /// Launch the driver executable instead of connecting to a running one
    #[serde(default)]
    pub spawn: bool,

    /// Driver executable; defaults to chromedriver/geckodriver on PATH
    pub driver_path: Option<PathBuf>,

    /// How long a spawned driver gets to become ready
    #[serde(default = "default_driver_startup")]
    pub startup_timeout_ms: u64,

    /// Where to save a screenshot when a step fails
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
            browser: Browser::default(),
            headless: true,
            args: Vec::new(),
            spawn: false,
            driver_path: None,
            startup_timeout_ms: default_driver_startup(),
            screenshot_dir: None,
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_true() -> bool {
    true
}

fn default_driver_startup() -> u64 {
    10_000
}

/// Wait settings in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeouts {
    /// Timeout for every wait point without an override
    #[serde(default = "default_timeout")]
    pub default_timeout_ms: u64,

    /// Poll interval for every wait point without an override
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Added to the summed wait budgets to form the scenario deadline
    #[serde(default = "default_margin")]
    pub scenario_margin_ms: u64,

    /// Per-step overrides keyed by step name
    #[serde(default)]
    pub steps: HashMap<String, StepTimeout>,
}

/// Override for one step's wait points
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StepTimeout {
    pub timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout(),
            poll_interval_ms: default_poll_interval(),
            scenario_margin_ms: default_margin(),
            steps: HashMap::new(),
        }
    }
}

fn default_timeout() -> u64 {
    20_000
}
fn default_poll_interval() -> u64 {
    250
}
fn default_margin() -> u64 {
    30_000
}

impl Timeouts {
    /// Wait spec for the named step, applying any override
    pub fn wait_spec(&self, step: &str) -> Result<WaitSpec> {
        let over = self.steps.get(step);
        let timeout_ms = over
            .and_then(|o| o.timeout_ms)
            .unwrap_or(self.default_timeout_ms);
        let poll_ms = over
            .and_then(|o| o.poll_interval_ms)
            .unwrap_or(self.poll_interval_ms);
        WaitSpec::from_millis(timeout_ms, poll_ms).map_err(|e| {
            Error::Config(format!("Timeouts for step '{}': {}", step, e))
        })
    }
}

/// Element selectors for the messaging journey
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selectors {
    #[serde(default = "default_email_field")]
    pub email_field: Selector,
    #[serde(default = "default_password_field")]
    pub password_field: Selector,
    #[serde(default = "default_submit_button")]
    pub submit_button: Selector,
    #[serde(default = "default_messaging_link")]
    pub messaging_link: Selector,
    #[serde(default = "default_messages_heading")]
    pub messages_heading: Selector,
    #[serde(default = "default_conversation_item")]
    pub conversation_item: Selector,
    #[serde(default = "default_message_input")]
    pub message_input: Selector,
    /// Shown in place of the conversation list when there is none
    #[serde(default = "default_empty_conversations")]
    pub empty_conversations: Selector,
    /// Dashboard greeting that carries the patient's name
    #[serde(default = "default_welcome_heading")]
    pub welcome_heading: Selector,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            email_field: default_email_field(),
            password_field: default_password_field(),
            submit_button: default_submit_button(),
            messaging_link: default_messaging_link(),
            messages_heading: default_messages_heading(),
            conversation_item: default_conversation_item(),
            message_input: default_message_input(),
            empty_conversations: default_empty_conversations(),
            welcome_heading: default_welcome_heading(),
        }
    }
}

fn default_email_field() -> Selector {
    Selector::Css("#email".to_string())
}
fn default_password_field() -> Selector {
    Selector::Css("#password".to_string())
}
fn default_submit_button() -> Selector {
    Selector::Css("button[type='submit']".to_string())
}
fn default_messaging_link() -> Selector {
    Selector::Css("a[href='/messages']".to_string())
}
fn default_messages_heading() -> Selector {
    Selector::Css("h2".to_string())
}
fn default_conversation_item() -> Selector {
    Selector::XPath("//div[contains(@style, 'cursor: pointer')]".to_string())
}
fn default_message_input() -> Selector {
    Selector::Css("input[placeholder='Type your message...']".to_string())
}
fn default_empty_conversations() -> Selector {
    Selector::XPath("//p[contains(., 'No conversations yet')]".to_string())
}
fn default_welcome_heading() -> Selector {
    Selector::Css("h1".to_string())
}

/// Journey parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyConfig {
    /// Frontend path of the login page
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Substring of the location once authenticated
    #[serde(default = "default_marker")]
    pub authenticated_marker: String,

    /// Text of the messaging view heading
    #[serde(default = "default_heading")]
    pub messages_heading: String,

    /// Message sent at the end of the journey
    #[serde(default = "default_message")]
    pub message: String,

    /// Name the dashboard greets the user with; checked when set
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Default for JourneyConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            authenticated_marker: default_marker(),
            messages_heading: default_heading(),
            message: default_message(),
            display_name: None,
        }
    }
}

fn default_login_path() -> String {
    "/login".to_string()
}
fn default_marker() -> String {
    "dashboard".to_string()
}
fn default_heading() -> String {
    "Messages".to_string()
}
fn default_message() -> String {
    "Hello! This is an automated test message.".to_string()
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default config file is
    /// used when present, and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => config_path().filter(|p| p.exists()),
        };

        match path {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
                    path: path.display().to_string(),
                    error: e.to_string(),
                })?;
                Self::from_toml(&content)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        WaitSpec::from_millis(
            config.timeouts.default_timeout_ms,
            config.timeouts.poll_interval_ms,
        )
        .map_err(|e| Error::Config(format!("[timeouts]: {}", e)))?;
        Ok(config)
    }

    /// Render as TOML with the password masked
    pub fn to_toml_masked(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.credentials.password.is_some() {
            shown.credentials.password = Some("********".to_string());
        }
        toml::to_string_pretty(&shown).map_err(|e| Error::Internal(e.to_string()))
    }

    /// TOML for a fresh config file
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default()).map_err(|e| Error::Internal(e.to_string()))
    }
}
