// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

use tokio::fs;
use tracing::{debug, warn};

use super::{Inbox, StagedFile};

impl Inbox {
    /// List staged files, sorted by name (byte order).
    ///
    /// Only regular files count. A missing or unreadable inbox is an empty
    /// inbox; entries that vanish mid-listing (moved concurrently) are skipped.
    pub async fn list_staged(&self) -> Vec<StagedFile> {
        let dir = self.staging_dir();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Inbox {:?} not created yet", dir);
                return Vec::new();
            }
            Err(e) => {
                warn!("Cannot read inbox {:?}: {}", dir, e);
                return Vec::new();
            }
        };

        let mut files = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Stopped reading inbox {:?}: {}", dir, e);
                    break;
                }
            };

            // file_type() does not follow symlinks
            match entry.file_type().await {
                Ok(t) if t.is_file() => {}
                _ => continue,
            }

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    debug!("Skipping non UTF-8 name {:?}", raw);
                    continue;
                }
            };

            match entry.metadata().await.and_then(|m| StagedFile::from_metadata(name, &m)) {
                Ok(file) => files.push(file),
                Err(e) => debug!("Skipping {:?}: {}", entry.path(), e),
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        files
    }
}
