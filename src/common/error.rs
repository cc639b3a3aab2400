//! Error types for the journey harness
//!
//! Harness-level failures (bad configuration, unreachable driver, IO) surface
//! through [`Error`]. Failures that happen while a scenario step is running are
//! converted into a step diagnostic instead, using [`Error::category`] as the
//! stable error code.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the journey harness
#[derive(Error, Debug)]
pub enum Error {
    // === Driver Errors ===
    #[error("Failed to start WebDriver session at {url}: {message}")]
    SessionStart { url: String, message: String },

    #[error("WebDriver error: {0}")]
    WebDriver(String),

    #[error("No element matches '{selector}' (index {index})")]
    ElementNotFound { selector: String, index: usize },

    #[error("No visible, enabled element matches '{0}'")]
    ElementNotInteractable(String),

    #[error("Driver executable '{0}' not found on PATH. Set webdriver.driver_path in the config file")]
    DriverNotFound(String),

    #[error("Failed to launch driver service: {0}")]
    DriverLaunch(String),

    #[error("Driver service at {url} was not ready after {waited:?}")]
    DriverNotReady { url: String, waited: Duration },

    // === HTTP Errors ===
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {url} returned HTTP {status}: {body}")]
    HttpStatus {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    // === Scenario Errors ===
    #[error("Unknown scenario '{0}'. Use 'journey list' to see built-in scenarios, or pass a path to a YAML file")]
    UnknownScenario(String),

    #[error("Invalid wait: {0}")]
    InvalidWait(String),

    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("No credentials configured. Pass --email/--password, set JOURNEY_EMAIL/JOURNEY_PASSWORD, or fill [credentials] in the config file")]
    MissingCredentials,

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse scenario file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an element-not-found error
    pub fn element_not_found(selector: impl ToString, index: usize) -> Self {
        Self::ElementNotFound {
            selector: selector.to_string(),
            index,
        }
    }

    /// Create an HTTP status error
    pub fn http_status(method: &str, url: &str, status: u16, body: &str) -> Self {
        Self::HttpStatus {
            method: method.to_string(),
            url: url.to_string(),
            status,
            body: body.to_string(),
        }
    }

    /// Stable error code used as the diagnostic category in reports
    pub fn category(&self) -> &'static str {
        match self {
            Error::SessionStart { .. } => "SESSION_START",
            Error::WebDriver(_) => "WEBDRIVER",
            Error::ElementNotFound { .. } => "ELEMENT_NOT_FOUND",
            Error::ElementNotInteractable(_) => "ELEMENT_NOT_INTERACTABLE",
            Error::DriverNotFound(_) | Error::DriverLaunch(_) | Error::DriverNotReady { .. } => {
                "DRIVER_SERVICE"
            }
            Error::Http(_) => "HTTP",
            Error::HttpStatus { .. } => "HTTP_STATUS",
            Error::InvalidUrl { .. } => "INVALID_URL",
            Error::UnknownScenario(_) => "UNKNOWN_SCENARIO",
            Error::InvalidWait(_) => "INVALID_WAIT",
            Error::InvalidSelector(_) => "INVALID_SELECTOR",
            Error::Config(_) | Error::ConfigParse(_) | Error::MissingCredentials => "CONFIG",
            Error::Io(_) | Error::FileRead { .. } => "IO",
            Error::Json(_) => "MALFORMED_RESPONSE",
            Error::Yaml(_) => "SCENARIO_FILE",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<thirtyfour::error::WebDriverError> for Error {
    fn from(e: thirtyfour::error::WebDriverError) -> Self {
        Error::WebDriver(e.to_string())
    }
}
