// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for the triage inbox

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::collision::CollisionPolicy;
use crate::subfolder::{default_shortcuts, Shortcut};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Storage root holding the inbox and one directory per category
    #[serde(default = "default_root")]
    pub root: String,

    /// Staging directory name under the root
    #[serde(default = "default_inbox_dir")]
    pub inbox_dir: String,

    /// Applied to both uploads and moves
    #[serde(default)]
    pub collision: CollisionPolicy,

    /// Web UI settings
    #[serde(default)]
    pub web: WebConfig,

    /// Triage history log
    #[serde(default)]
    pub history: HistoryConfig,

    /// Quick-action move targets
    #[serde(default = "default_shortcuts")]
    pub shortcuts: Vec<Shortcut>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// Request body cap for uploads; the engine itself has no limit
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Defaults to `<root>/history.jsonl`
    #[serde(default)]
    pub path: Option<String>,
}

// Default value functions
fn default_root() -> String { "./storage".to_string() }
fn default_inbox_dir() -> String { "inbox".to_string() }
fn default_true() -> bool { true }
fn default_web_host() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 8080 }
fn default_max_upload_bytes() -> usize { 64 * 1024 * 1024 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            inbox_dir: default_inbox_dir(),
            collision: CollisionPolicy::default(),
            web: WebConfig::default(),
            history: HistoryConfig::default(),
            shortcuts: default_shortcuts(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::TriageError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that would put the inbox outside the root or inside a category
    pub fn validate(&self) -> crate::Result<()> {
        crate::resolver::validate_name(&self.inbox_dir)
            .map_err(|_| crate::TriageError::Config(format!("inbox_dir must be a plain directory name, got {:?}", self.inbox_dir)))?;
        if self.inbox_dir.parse::<crate::Category>().is_ok() {
            return Err(crate::TriageError::Config(format!(
                "inbox_dir {:?} clashes with a category directory",
                self.inbox_dir
            )));
        }
        for shortcut in &self.shortcuts {
            let sub = shortcut.rule.derive(chrono::Utc::now().date_naive());
            crate::resolver::normalize_subfolder(sub.as_deref()).map_err(|e| {
                crate::TriageError::Config(format!("Shortcut {:?}: {}", shortcut.label, e))
            })?;
        }
        Ok(())
    }

    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(&self.root)
    }

    pub fn history_path(&self) -> PathBuf {
        match self.history.path {
            Some(ref p) => PathBuf::from(p),
            None => self.root_path().join("history.jsonl"),
        }
    }
}
