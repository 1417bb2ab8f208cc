// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Filesystem-backed staging inbox
//!
//! The directory tree is the only state: nothing is cached between calls
//! and no in-process locks are taken. Layout under the storage root:
//!
//! ```text
//! root/
//!   inbox/            staged files
//!     .triage/        in-flight uploads and claimed moves
//!   orders/ coas/ notes/
//! ```

mod lister;
mod mover;
mod recovery;
mod upload;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::category::Category;
use crate::collision::CollisionPolicy;
use crate::config::AppConfig;
use crate::history::{History, HistoryEntry};
use crate::Result;

/// Scratch directory inside the inbox. Being a directory, it never shows up
/// in listings, and it sits on the same filesystem as the staged files.
pub const SCRATCH_DIR: &str = ".triage";

/// Scratch entries: `claim-<uuid>/<name>` for a move in flight and
/// `upload-<uuid>.part` for an upload being received
const CLAIM_PREFIX: &str = "claim-";
const UPLOAD_PREFIX: &str = "upload-";

/// One file sitting in the inbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedFile {
    pub name: String,
    pub size_bytes: u64,
    /// Whole seconds, UTC
    pub modified_at: DateTime<Utc>,
}

impl StagedFile {
    fn from_metadata(name: String, metadata: &Metadata) -> std::io::Result<Self> {
        let modified: DateTime<Utc> = metadata.modified()?.into();
        Ok(Self {
            name,
            size_bytes: metadata.len(),
            modified_at: modified.trunc_subsecs(0),
        })
    }
}

/// Handle on a storage root. Cheap to clone; holds no file state.
#[derive(Debug, Clone)]
pub struct Inbox {
    root: PathBuf,
    inbox_dir: String,
    policy: CollisionPolicy,
    history: Option<History>,
}

impl Inbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            inbox_dir: "inbox".to_string(),
            policy: CollisionPolicy::default(),
            history: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let inbox = Self::new(config.root_path())
            .with_inbox_dir(&config.inbox_dir)
            .with_policy(config.collision);
        if config.history.enabled {
            inbox.with_history(History::new(config.history_path()))
        } else {
            inbox
        }
    }

    pub fn with_inbox_dir(mut self, inbox_dir: &str) -> Self {
        self.inbox_dir = inbox_dir.to_string();
        self
    }

    pub fn with_policy(mut self, policy: CollisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_history(mut self, history: History) -> Self {
        self.history = Some(history);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(&self.inbox_dir)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.staging_dir().join(SCRATCH_DIR)
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    pub fn history(&self) -> Option<&History> {
        self.history.as_ref()
    }

    /// Create the inbox and every category directory, then put back
    /// anything an interrupted run left in the scratch directory
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(self.staging_dir()).await?;
        for category in Category::ALL {
            fs::create_dir_all(self.root.join(category.as_str())).await?;
        }
        let recovered = self.recover_scratch().await?;
        if !recovered.is_empty() {
            info!("Recovered {} file(s) into the inbox", recovered.len());
        }
        Ok(())
    }

    async fn ensure_scratch(&self) -> Result<PathBuf> {
        let scratch = self.scratch_dir();
        fs::create_dir_all(&scratch).await?;
        Ok(scratch)
    }

    /// `/`-delimited path of a staged file relative to the root
    fn staged_relative(&self, name: &str) -> String {
        format!("{}/{}", self.inbox_dir, name)
    }

    /// The operation already happened, so a failed append is only logged
    async fn record(&self, entry: HistoryEntry) {
        if let Some(ref history) = self.history {
            if let Err(e) = history.append(&entry).await {
                warn!("Failed to record {:?} for {:?} in history: {}", entry.action, entry.name, e);
            }
        }
    }
}
