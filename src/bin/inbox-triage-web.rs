// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Inbox Triage web server
//!
//! Standalone server for the inbox page and the JSON API.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use inbox_triage::config::AppConfig;
use inbox_triage::Result;

#[derive(Parser, Debug)]
#[command(name = "inbox-triage-web")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "1.0.0")]
#[command(about = "Inbox Triage web server")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Host to bind to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Storage root (overrides config)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over --verbose when set
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| if args.verbose { "debug" } else { "info" }.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Inbox Triage web v1.0.0");

    let mut config = AppConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(host) = args.host {
        config.web.host = host;
    }
    if let Some(port) = args.port {
        config.web.port = port;
    }
    if let Some(root) = args.root {
        config.root = root.to_string_lossy().into_owned();
    }

    inbox_triage::web::start_server(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_overrides() {
        let args = Args::try_parse_from([
            "inbox-triage-web", "-H", "0.0.0.0", "--port", "9000", "--root", "/srv/triage"
        ]).unwrap();
        assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.root, Some(PathBuf::from("/srv/triage")));
        assert_eq!(args.config, PathBuf::from("config.json"));
    }
}
