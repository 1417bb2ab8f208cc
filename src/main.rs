// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Inbox Triage: stage files in an inbox, then file them by category
//!
//! Command-line front end over the same engine the web UI uses.

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use inbox_triage::config::AppConfig;
use inbox_triage::history::History;
use inbox_triage::inbox::Inbox;
use inbox_triage::subfolder::targets;
use inbox_triage::{Result, TriageError};

/// Inbox Triage CLI
#[derive(Parser, Debug)]
#[command(name = "inbox-triage")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "1.0.0")]
#[command(about = "Stage files in an inbox and file them into categories", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Storage root (overrides config)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the storage layout and a default config
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },

    /// List files waiting in the inbox
    List {
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Copy a local file into the inbox
    Upload {
        path: PathBuf,

        /// Name to stage under (default: the file's own name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// File a staged file into a category
    Move {
        name: String,

        #[arg(short, long, required_unless_present = "shortcut")]
        category: Option<String>,

        #[arg(short, long, conflicts_with = "shortcut")]
        subfolder: Option<String>,

        /// Use a configured shortcut instead of --category/--subfolder
        #[arg(long, conflicts_with = "category")]
        shortcut: Option<String>,
    },

    /// Return files left behind by an interrupted move to the inbox
    Recover,

    /// Show shortcut targets for a date
    Shortcuts {
        /// Date as YYYY-MM-DD (default: today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Triage history
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent history entries
    List {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },

    /// Clear all history
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Init { dir, force } = &cli.command {
        return run_init(dir.clone(), *force).await;
    }

    let mut config = AppConfig::load(&cli.config)?;
    if let Some(root) = &cli.root {
        config.root = root.to_string_lossy().into_owned();
    }
    debug!("Storage root: {:?}", config.root_path());

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::List { format } => run_list(&config, &format).await,
        Commands::Upload { path, name } => run_upload(&config, &path, name).await,
        Commands::Move { name, category, subfolder, shortcut } => {
            run_move(&config, &name, category, subfolder, shortcut).await
        }
        Commands::Recover => {
            let recovered = Inbox::from_config(&config).recover_scratch().await?;
            if recovered.is_empty() {
                println!("Nothing to recover");
            }
            for name in recovered {
                println!("Recovered {}", name);
            }
            Ok(())
        }
        Commands::Shortcuts { date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            for target in targets(&config.shortcuts, date) {
                match target.subfolder {
                    Some(sub) => println!("{:<28} {}/{}", target.label, target.category, sub),
                    None => println!("{:<28} {}", target.label, target.category),
                }
            }
            Ok(())
        }
        Commands::History { action } => run_history_command(&config, action).await,
        Commands::Config { action } => run_config_command(config, action, &cli.config),
    }
}

async fn run_list(config: &AppConfig, format: &str) -> Result<()> {
    let files = Inbox::from_config(config).list_staged().await;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    if files.is_empty() {
        println!("Inbox is empty");
        return Ok(());
    }
    for file in &files {
        println!("  {:<40} {:>12} B  {}",
            file.name,
            file.size_bytes,
            file.modified_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

async fn run_upload(config: &AppConfig, path: &Path, name: Option<String>) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| TriageError::InvalidName(path.display().to_string()))?,
    };

    let file = tokio::fs::File::open(path).await?;
    let staged = Inbox::from_config(config).receive_upload(&name, file).await?;
    println!("Staged {} ({} bytes)", staged.name, staged.size_bytes);
    Ok(())
}

async fn run_move(
    config: &AppConfig,
    name: &str,
    category: Option<String>,
    subfolder: Option<String>,
    shortcut: Option<String>,
) -> Result<()> {
    let (category, subfolder) = match shortcut {
        Some(label) => {
            let today = Utc::now().date_naive();
            let target = config
                .shortcuts
                .iter()
                .find(|s| s.label == label)
                .map(|s| s.target(today))
                .ok_or_else(|| TriageError::Config(format!("No shortcut labelled {:?}", label)))?;
            (target.category.to_string(), target.subfolder)
        }
        None => (category.unwrap_or_default(), subfolder),
    };

    let dest = Inbox::from_config(config)
        .move_staged(name, &category, subfolder.as_deref())
        .await?;
    println!("Moved {} -> {}", name, dest.relative());
    Ok(())
}

async fn run_history_command(config: &AppConfig, action: HistoryCommands) -> Result<()> {
    let history = History::new(config.history_path());

    match action {
        HistoryCommands::List { count } => {
            let entries = history.get_recent(count).await?;
            println!("Recent history ({} entries, {}):", entries.len(), history.path().display());
            for entry in entries {
                println!("  {} {:?} {} -> {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.action,
                    entry.name,
                    entry.path
                );
            }
        }
        HistoryCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing history");
                return Ok(());
            }
            history.clear().await?;
            println!("History cleared ({})", history.path().display());
        }
    }

    Ok(())
}

fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            // load() already validated it
            println!("Configuration at {:?} is valid", config_path);
            println!("  Root: {}", config.root);
            println!("  Inbox: {}", config.inbox_dir);
            println!("  Collisions: {:?}", config.collision);
            println!("  Shortcuts: {}", config.shortcuts.len());
        }
    }

    Ok(())
}

/// Write a default config and create the storage layout next to it
async fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("config.json");

    if config_path.exists() && !force {
        return Err(TriageError::Config(
            "config.json already exists. Use --force to overwrite".to_string()
        ));
    }

    std::fs::create_dir_all(&target)?;
    let config = AppConfig {
        root: target.join("storage").to_string_lossy().into_owned(),
        ..AppConfig::default()
    };
    config.save(&config_path)?;
    Inbox::from_config(&config).init().await?;

    info!("Initialized {:?}", target);
    println!("Created:");
    println!("  - config.json");
    println!("  - storage/{}/", config.inbox_dir);
    println!("  - storage/{{orders,coas,notes}}/");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["inbox-triage"]).is_err());
    }

    #[test]
    fn test_cli_log_levels() {
        let cli = Cli::try_parse_from(["inbox-triage", "list", "--trace"]).unwrap();
        assert!(cli.trace);
        assert!(!cli.verbose);
        let cli = Cli::try_parse_from(["inbox-triage", "--verbose", "--quiet", "shortcuts"]).unwrap();
        assert!(cli.verbose && cli.quiet);
    }

    #[test]
    fn test_cli_list_command() {
        let cli = Cli::try_parse_from(["inbox-triage", "list", "--format", "json", "--root", "/tmp/r"]).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/r")));
        match cli.command {
            Commands::List { format } => assert_eq!(format, "json"),
            _ => panic!("Expected List command"),
        }
        assert!(Cli::try_parse_from(["inbox-triage", "list", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_cli_move_command() {
        let cli = Cli::try_parse_from([
            "inbox-triage", "move", "po.pdf", "--category", "orders", "--subfolder", "2025-10-03"
        ]).unwrap();

        match cli.command {
            Commands::Move { name, category, subfolder, shortcut } => {
                assert_eq!(name, "po.pdf");
                assert_eq!(category.as_deref(), Some("orders"));
                assert_eq!(subfolder.as_deref(), Some("2025-10-03"));
                assert!(shortcut.is_none());
            }
            _ => panic!("Expected Move command"),
        }
    }

    #[test]
    fn test_cli_move_needs_category_or_shortcut() {
        assert!(Cli::try_parse_from(["inbox-triage", "move", "po.pdf"]).is_err());
        assert!(Cli::try_parse_from(["inbox-triage", "move", "po.pdf", "--shortcut", "x"]).is_ok());
        assert!(Cli::try_parse_from([
            "inbox-triage", "move", "po.pdf", "--shortcut", "x", "--category", "notes"
        ]).is_err());
    }

    #[test]
    fn test_cli_recover_command() {
        let cli = Cli::try_parse_from(["inbox-triage", "recover", "--root", "/srv/triage"]).unwrap();
        assert!(matches!(cli.command, Commands::Recover));
    }

    #[test]
    fn test_cli_shortcuts_date() {
        let cli = Cli::try_parse_from(["inbox-triage", "shortcuts", "--date", "2025-10-03"]).unwrap();
        match cli.command {
            Commands::Shortcuts { date } => assert_eq!(date, NaiveDate::from_ymd_opt(2025, 10, 3)),
            _ => panic!("Expected Shortcuts command"),
        }
    }

    #[tokio::test]
    async fn test_move_by_shortcut() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            root: temp_dir.path().to_string_lossy().into_owned(),
            ..AppConfig::default()
        };
        Inbox::from_config(&config).receive_upload("memo.txt", &b"hi"[..]).await.unwrap();

        run_move(&config, "memo.txt", None, None, Some("→ notes".to_string())).await.unwrap();
        assert!(temp_dir.path().join("notes/memo.txt").is_file());

        let err = run_move(&config, "memo.txt", None, None, Some("nope".to_string())).await.unwrap_err();
        assert!(matches!(err, TriageError::Config(_)));
    }

    #[tokio::test]
    async fn test_init_creates_layout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("site");

        run_init(Some(dir.clone()), false).await.unwrap();
        assert!(dir.join("config.json").is_file());
        assert!(dir.join("storage/inbox").is_dir());
        assert!(dir.join("storage/coas").is_dir());

        assert!(run_init(Some(dir.clone()), false).await.is_err());
        run_init(Some(dir), true).await.unwrap();
    }
}
