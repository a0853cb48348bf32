// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Jobcast - session-oriented messaging gateway for recruitment notifications.
//!
//! This is the binary entry point.

mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jobcast_config::{ConfigError, JobcastConfig};

/// Jobcast - messaging gateway for job broadcasts and candidate notifications.
#[derive(Parser, Debug)]
#[command(name = "jobcast", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway server and broadcast worker.
    Serve,
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Load and validate configuration, then print a summary.
    Check,
}

fn load(path: Option<&PathBuf>) -> Result<JobcastConfig, Vec<ConfigError>> {
    match path {
        Some(path) => jobcast_config::load_and_validate_path(path),
        None => jobcast_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            jobcast_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("jobcast: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config {
            action: ConfigAction::Check,
        }) => {
            println!("{}", config_summary(&config));
        }
        None => {
            println!("jobcast: use --help for available commands");
        }
    }
}

/// One line per section with the values operators usually check.
fn config_summary(config: &JobcastConfig) -> String {
    [
        format!("config ok (gateway.name={})", config.gateway.name),
        format!(
            "server: {}:{} (auth {}, metrics {})",
            config.server.host,
            config.server.port,
            if config.server.bearer_token.is_some() { "on" } else { "OFF - all /v1 requests rejected" },
            if config.server.metrics_enabled { "on" } else { "off" },
        ),
        format!(
            "storage: database={} auth_dir={}",
            config.storage.database_path, config.storage.auth_dir
        ),
        format!(
            "session: default={} transport={}",
            config.session.default_session_id, config.session.transport_url
        ),
        format!(
            "broadcast: {} (max_recipients={}, attempts={})",
            if config.broadcast.enabled { "enabled" } else { "disabled" },
            config.broadcast.max_recipients,
            config.broadcast.max_attempts
        ),
        format!(
            "webhook: {}",
            config.webhook.url.as_deref().unwrap_or("disabled")
        ),
    ]
    .join("\n")
}
