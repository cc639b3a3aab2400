//! CLI command handling
//!
//! Loads configuration, builds the requested scenario, opens its session and
//! prints the report.

use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use crate::api::{ApiClient, ApiSession, DEFAULT_REQUEST_TIMEOUT};
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::paths;
use crate::common::{Error, Result};
use crate::driver::BrowserSession;
use crate::report::{self, ScenarioResult};
use crate::scenario::{self, Builtin, Runner, ScenarioFile, BUILTINS};

/// Dispatch a CLI command, returning the process exit code
pub async fn dispatch(command: Commands, config_path: Option<&Path>) -> Result<i32> {
    match command {
        Commands::Run {
            scenario,
            format,
            output,
            no_color,
            overrides,
        } => {
            let mut config = Config::load(config_path)?;
            overrides.apply(&mut config);

            let result = run_scenario(&scenario, &config).await?;

            let color = !no_color && output.is_none() && std::io::stdout().is_terminal();
            let reporter = report::reporter_for(format, color);
            match output {
                Some(path) => report::write_file(&result, reporter.as_ref(), &path)?,
                None => report::emit(&result, reporter.as_ref(), &mut std::io::stdout().lock())?,
            }

            Ok(result.status().exit_code())
        }

        Commands::List => {
            println!("Built-in scenarios:");
            for b in BUILTINS {
                println!("  {:<12} {:<4} {}", b.name(), b.variant(), b.summary());
            }
            println!();
            println!("Any other argument to 'journey run' is read as a YAML scenario file.");
            Ok(0)
        }

        Commands::Config { init, force } => {
            if init {
                let path = match config_path {
                    Some(p) => p.to_path_buf(),
                    None => paths::config_path().ok_or_else(|| {
                        Error::Config("Could not determine the config directory".to_string())
                    })?,
                };
                if path.exists() && !force {
                    return Err(Error::Config(format!(
                        "{} already exists. Use --force to overwrite it",
                        path.display()
                    )));
                }
                paths::ensure_parent_dir(&path)?;
                std::fs::write(&path, Config::default_toml()?)?;
                println!("Wrote default configuration to {}", path.display());
                return Ok(0);
            }

            let config = Config::load(config_path)?;
            match config_path.map(Path::to_path_buf).or_else(paths::config_path) {
                Some(path) if path.exists() => println!("# {}", path.display()),
                _ => println!("# built-in defaults (no config file)"),
            }
            print!("{}", config.to_toml_masked()?);
            Ok(0)
        }
    }
}

/// Build the scenario named `name`, open its session and run it
///
/// The scenario is built first so that configuration errors surface before
/// a browser is started.
pub async fn run_scenario(name: &str, config: &Config) -> Result<ScenarioResult> {
    let runner =
        Runner::new().with_margin(Duration::from_millis(config.timeouts.scenario_margin_ms));

    match scenario::builtin(name) {
        Some(Builtin::Messaging) => {
            let scenario = scenario::messaging(config)?;
            let session = BrowserSession::connect(&config.webdriver).await?;
            Ok(runner.run_until(&scenario, session, shutdown_signal()).await)
        }
        Some(Builtin::ApiLogin) => {
            let scenario = scenario::api_login(config)?;
            let client = ApiClient::new(config.target.api_url.clone(), DEFAULT_REQUEST_TIMEOUT)?;
            let session = ApiSession::new(client);
            Ok(runner.run_until(&scenario, session, shutdown_signal()).await)
        }
        None => {
            let path = Path::new(name);
            if !path.is_file() {
                return Err(Error::UnknownScenario(name.to_string()));
            }
            let scenario = ScenarioFile::load(path)?.compile(config)?;
            let session = BrowserSession::connect(&config.webdriver).await?;
            Ok(runner.run_until(&scenario, session, shutdown_signal()).await)
        }
    }
}

/// Ctrl-C; never resolves if the handler cannot be installed
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Resolves when the user or the CI job asks the run to stop
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c() => tracing::info!("Received Ctrl-C, stopping the scenario"),
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM, stopping the scenario"),
                }
                return;
            }
            Err(e) => tracing::warn!("Could not listen for SIGTERM: {}", e),
        }
    }

    ctrl_c().await;
    tracing::info!("Received Ctrl-C, stopping the scenario");
}
