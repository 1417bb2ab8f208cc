// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

use std::path::Path;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, info};
use uuid::Uuid;

use super::{Inbox, StagedFile, SCRATCH_DIR, UPLOAD_PREFIX};
use crate::collision::place;
use crate::history::HistoryEntry;
use crate::resolver::validate_name;
use crate::{Result, TriageError};

impl Inbox {
    /// Stream `body` into the inbox under `name`.
    ///
    /// Bytes land in a part file in the scratch directory first, so a
    /// half-written upload is never listed. The finished file is then placed
    /// under `name` with the configured collision policy.
    pub async fn receive_upload<R>(&self, name: &str, mut body: R) -> Result<StagedFile>
    where
        R: AsyncRead + Unpin,
    {
        let name = validate_name(name)?;
        if name == SCRATCH_DIR {
            return Err(TriageError::InvalidName(name.to_string()));
        }

        let scratch = self.ensure_scratch().await?;
        let part = scratch.join(format!("{}{}.part", UPLOAD_PREFIX, Uuid::new_v4()));

        if let Err(e) = write_part(&part, &mut body).await {
            discard(&part).await;
            return Err(e.into());
        }

        // Read before placing: once visible the file may be moved at once.
        // Length and mtime carry over through link and rename.
        let metadata = match fs::metadata(&part).await {
            Ok(metadata) => metadata,
            Err(e) => {
                discard(&part).await;
                return Err(e.into());
            }
        };

        let target = self.staging_dir().join(name);
        let placed = match place(self.policy, &part, &target).await {
            Ok(placed) => placed,
            Err(e) => {
                discard(&part).await;
                return Err(match e.kind() {
                    std::io::ErrorKind::AlreadyExists => TriageError::NameCollision(name.to_string()),
                    _ => TriageError::Io(e),
                });
            }
        };

        let staged_name = placed
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        let staged = StagedFile::from_metadata(staged_name, &metadata)?;

        info!("Received {} ({} bytes)", staged.name, staged.size_bytes);
        self.record(HistoryEntry::uploaded(
            &staged.name,
            self.staged_relative(&staged.name),
            staged.size_bytes,
        ))
        .await;

        Ok(staged)
    }
}

async fn write_part<R>(part: &Path, body: &mut R) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut file = OpenOptions::new().write(true).create_new(true).open(part).await?;
    let written = tokio::io::copy(body, &mut file).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

async fn discard(part: &Path) {
    if let Err(e) = fs::remove_file(part).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!("Could not remove part file {:?}: {}", part, e);
        }
    }
}
