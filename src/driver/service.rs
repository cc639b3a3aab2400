//! Local WebDriver service (chromedriver / geckodriver)

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};

use crate::api::StatusEquals;
use crate::common::config::WebDriverConfig;
use crate::common::{Error, Result};
use crate::wait::{wait_for, WaitOutcome, WaitSpec};

const READINESS_POLL: Duration = Duration::from_millis(100);

/// A driver executable launched for one run
///
/// The child is killed when the service is stopped or dropped.
pub struct DriverService {
    child: Child,
    url: String,
}

impl DriverService {
    /// Launch the configured driver on the port of `webdriver.url` and wait
    /// until its status endpoint answers
    pub async fn start(config: &WebDriverConfig) -> Result<Self> {
        let binary = resolve_binary(config)?;
        let port = port_of(&config.url)?;

        tracing::info!("Starting {} on port {}", binary.display(), port);
        let child = Command::new(&binary)
            .arg(format!("--port={}", port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::DriverLaunch(format!("{}: {}", binary.display(), e)))?;

        let service = Self {
            child,
            url: config.url.trim_end_matches('/').to_string(),
        };

        let spec = WaitSpec::new(
            Duration::from_millis(config.startup_timeout_ms),
            READINESS_POLL,
        )?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;
        let ready = StatusEquals::new(format!("{}/status", service.url), 200);

        match wait_for(&http, &ready, &spec).await {
            WaitOutcome::Satisfied { elapsed, .. } => {
                tracing::debug!("Driver ready after {:?}", elapsed);
                Ok(service)
            }
            WaitOutcome::TimedOut { elapsed, .. } => {
                let url = service.url.clone();
                service.stop().await?;
                Err(Error::DriverNotReady {
                    url,
                    waited: elapsed,
                })
            }
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Kill the driver and reap it
    pub async fn stop(mut self) -> Result<()> {
        if self.child.try_wait()?.is_none() {
            self.child.kill().await?;
        }
        Ok(())
    }
}

fn resolve_binary(config: &WebDriverConfig) -> Result<PathBuf> {
    if let Some(path) = &config.driver_path {
        return Ok(path.clone());
    }
    let name = config.browser.driver_binary();
    which::which(name).map_err(|_| Error::DriverNotFound(name.to_string()))
}

fn port_of(url: &str) -> Result<u16> {
    let parsed = reqwest::Url::parse(url).map_err(|e| Error::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    parsed
        .port_or_known_default()
        .ok_or_else(|| Error::InvalidUrl {
            url: url.to_string(),
            message: "no port".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_from_url() {
        assert_eq!(port_of("http://localhost:4444").unwrap(), 4444);
        assert_eq!(port_of("http://localhost").unwrap(), 80);
        assert!(matches!(port_of("not a url"), Err(Error::InvalidUrl { .. })));
    }

    #[test]
    fn test_explicit_driver_path_skips_lookup() {
        let config = WebDriverConfig {
            driver_path: Some(PathBuf::from("/opt/drivers/chromedriver")),
            ..WebDriverConfig::default()
        };
        assert_eq!(
            resolve_binary(&config).unwrap(),
            PathBuf::from("/opt/drivers/chromedriver")
        );
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_launch() {
        let config = WebDriverConfig {
            driver_path: Some(PathBuf::from("/nonexistent/journey-test-driver")),
            ..WebDriverConfig::default()
        };
        let err = DriverService::start(&config).await.err().unwrap();
        assert!(matches!(err, Error::DriverLaunch(_)));
    }
}
