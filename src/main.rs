//! Journey CLI - end-to-end user journeys against a running web app
//!
//! Drives the app through a browser (WebDriver) or its HTTP API, one
//! fail-fast scenario at a time, and reports which step broke and why.

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use journey::common::logging;
use journey::{cli, commands};

#[derive(Parser)]
#[command(name = "journey", about = "End-to-end journey harness")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also log to a file (default: data dir logs/journey.log)
    #[arg(long, global = true, num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_file = match cli.log_file {
        Some(Some(path)) => Some(path),
        Some(None) => logging::default_log_path(),
        None => None,
    };

    let guard = match logging::init_cli(cli.verbose, log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    match cli::dispatch(cli.command, cli.config.as_deref()).await {
        Ok(code) => {
            drop(guard);
            std::process::exit(code);
        }
        Err(e) => {
            tracing::debug!("{:?}", e);
            eprintln!("Error: {e}");
            drop(guard);
            std::process::exit(1);
        }
    }
}
