//! `ecap` - check ECAP attendance from the terminal.

mod shell;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ecap::attendance::{run_pipeline, AttendanceError, Credentials, PortalConfig};
use std::io::{self, BufRead};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the portal password for `check`.
const PASSWORD_ENV: &str = "ECAP_PASSWORD";

#[derive(Parser)]
#[command(name = "ecap", version, about = "Check your ECAP attendance")]
struct Cli {
    /// JSON file overriding portal paths, form fields and login markers
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Portal base URL
    #[arg(long, global = true, env = "ECAP_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in once and print the attendance summary
    Check {
        /// Roll number
        identifier: String,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Interactive session: send "<roll> <password>", "refresh <roll>" or "cancel"
    Shell,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // RUST_LOG controls the level (e.g. RUST_LOG=ecap=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<PortalConfig> {
    let config = match &cli.config {
        Some(path) => PortalConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PortalConfig::default(),
    };
    let config = match &cli.base_url {
        Some(base_url) => config.with_base_url(base_url.clone()),
        None => config,
    };
    config.validate().context("Invalid portal configuration")
}

/// Reads the password from the environment, or one line of stdin.
fn read_secret() -> Result<String> {
    if let Ok(secret) = std::env::var(PASSWORD_ENV) {
        if !secret.is_empty() {
            return Ok(secret);
        }
    }
    eprintln!("Password (or set {PASSWORD_ENV}):");
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    let secret = line.trim_end_matches(['\r', '\n']).to_string();
    anyhow::ensure!(!secret.is_empty(), "No password given");
    Ok(secret)
}

/// Process exit code for a failed run.
fn exit_code(error: &AttendanceError) -> i32 {
    if error.needs_credentials() {
        2
    } else if error.is_retryable() {
        3
    } else {
        4
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!(base_url = %config.base_url, "ecap starting");

    match cli.command {
        Command::Check { identifier, json } => {
            let credentials = Credentials::new(identifier, read_secret()?);
            match run_pipeline(&config, &credentials).await {
                Ok(report) if json => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                Ok(report) => println!("{}", report.render()),
                Err(e) => {
                    eprintln!("❌ {}", e.user_message());
                    std::process::exit(exit_code(&e));
                }
            }
        }
        Command::Shell => shell::run(config).await?,
    }

    Ok(())
}
