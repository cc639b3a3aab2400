//! CLI command definitions
//!
//! Defines the clap commands for the journey CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::common::config::{Browser, Config};
use crate::report::ReportFormat;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a scenario and report the result
    ///
    /// Exits 0 when the scenario passed, 1 when a step failed and 2 when a
    /// step errored.
    Run {
        /// Built-in scenario name (see 'journey list') or path to a YAML scenario file
        scenario: String,

        /// Report format
        #[arg(long, short, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,

        /// Write the report to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// List built-in scenarios
    List,

    /// Show the effective configuration, or write a default config file
    Config {
        /// Write a default config file
        #[arg(long)]
        init: bool,

        /// Overwrite an existing config file with --init
        #[arg(long)]
        force: bool,
    },
}

/// Command-line settings that take precedence over the config file
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Login email
    #[arg(long, env = "JOURNEY_EMAIL")]
    pub email: Option<String>,

    /// Login password
    #[arg(long, env = "JOURNEY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Base URL of the web frontend
    #[arg(long, env = "JOURNEY_BASE_URL")]
    pub base_url: Option<String>,

    /// Base URL of the HTTP API
    #[arg(long, env = "JOURNEY_API_URL")]
    pub api_url: Option<String>,

    /// WebDriver server URL
    #[arg(long, env = "JOURNEY_WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Browser to drive
    #[arg(long, value_enum)]
    pub browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Launch chromedriver/geckodriver instead of connecting to a running server
    #[arg(long)]
    pub spawn_driver: bool,

    /// Save a screenshot here when a step fails
    #[arg(long)]
    pub screenshot_dir: Option<PathBuf>,

    /// Default wait timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Name the dashboard should greet the user with
    #[arg(long, env = "JOURNEY_DISPLAY_NAME")]
    pub display_name: Option<String>,
}

impl Overrides {
    /// Apply every given flag on top of `config`
    pub fn apply(self, config: &mut Config) {
        if let Some(email) = self.email {
            config.credentials.email = Some(email);
        }
        if let Some(password) = self.password {
            config.credentials.password = Some(password);
        }
        if let Some(url) = self.base_url {
            config.target.base_url = url;
        }
        if let Some(url) = self.api_url {
            config.target.api_url = url;
        }
        if let Some(url) = self.webdriver_url {
            config.webdriver.url = url;
        }
        if let Some(browser) = self.browser {
            config.webdriver.browser = browser;
        }
        if self.headed {
            config.webdriver.headless = false;
        }
        if self.spawn_driver {
            config.webdriver.spawn = true;
        }
        if let Some(dir) = self.screenshot_dir {
            config.webdriver.screenshot_dir = Some(dir);
        }
        if let Some(ms) = self.timeout_ms {
            config.timeouts.default_timeout_ms = ms;
        }
        if let Some(name) = self.display_name {
            config.journey.display_name = Some(name);
        }
    }
}
