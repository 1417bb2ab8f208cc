// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use super::{Inbox, CLAIM_PREFIX, UPLOAD_PREFIX};
use crate::collision::{place, CollisionPolicy};
use crate::Result;

impl Inbox {
    /// Clean up after a process that died mid-operation.
    ///
    /// Files left in `claim-*` directories by an interrupted move go back
    /// into the inbox under their own names, or a suffixed name if that one
    /// has been taken since. Partial uploads are deleted. Returns the inbox
    /// names of the recovered files.
    ///
    /// Meant for startup: a move running concurrently in another process
    /// would have its claim taken back.
    pub async fn recover_scratch(&self) -> Result<Vec<String>> {
        let scratch = self.scratch_dir();
        let mut entries = match fs::read_dir(&scratch).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut recovered = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            if name.starts_with(CLAIM_PREFIX) && entry.file_type().await?.is_dir() {
                recovered.extend(self.recover_claim(&path).await?);
            } else if name.starts_with(UPLOAD_PREFIX) && name.ends_with(".part") {
                fs::remove_file(&path).await?;
                info!("Removed interrupted upload {:?}", path);
            } else {
                debug!("Leaving unknown scratch entry {:?}", path);
            }
        }
        Ok(recovered)
    }

    async fn recover_claim(&self, dir: &Path) -> Result<Vec<String>> {
        let mut restored = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!("Claimed file {:?} has a non UTF-8 name, leaving it", entry.path());
                continue;
            };

            let placed = place(CollisionPolicy::Suffix, &entry.path(), &self.staging_dir().join(&name)).await?;
            let staged = placed
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(name.clone());
            if staged == name {
                info!("Returned interrupted move of {} to the inbox", name);
            } else {
                warn!("Returned interrupted move of {} to the inbox as {}", name, staged);
            }
            restored.push(staged);
        }

        if let Err(e) = fs::remove_dir(dir).await {
            warn!("Could not remove claim directory {:?}: {}", dir, e);
        }
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TriageError;

    #[tokio::test]
    async fn test_interrupted_move_returns_to_inbox() {
        let temp_dir = tempfile::tempdir().unwrap();
        let inbox = Inbox::new(temp_dir.path());
        inbox.receive_upload("po.pdf", &b"order"[..]).await.unwrap();

        // A move that died right after claiming the file
        let claim = inbox.claim(&inbox.staging_dir().join("po.pdf"), "po.pdf").await.unwrap();
        assert!(inbox.list_staged().await.is_empty());

        inbox.init().await.unwrap();
        let names: Vec<_> = inbox.list_staged().await.into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["po.pdf"]);
        assert!(!claim.exists());
        assert!(!claim.parent().unwrap().exists());

        let dest = inbox.move_staged("po.pdf", "orders", Some("2025-10-03")).await.unwrap();
        assert_eq!(std::fs::read(&dest.path).unwrap(), b"order");
    }

    #[tokio::test]
    async fn test_recovery_never_overwrites() {
        let temp_dir = tempfile::tempdir().unwrap();
        let inbox = Inbox::new(temp_dir.path());
        inbox.receive_upload("po.pdf", &b"claimed"[..]).await.unwrap();
        inbox.claim(&inbox.staging_dir().join("po.pdf"), "po.pdf").await.unwrap();
        inbox.receive_upload("po.pdf", &b"newer"[..]).await.unwrap();

        let recovered = inbox.recover_scratch().await.unwrap();
        assert_eq!(recovered, vec!["po (1).pdf"]);
        assert_eq!(std::fs::read(inbox.staging_dir().join("po.pdf")).unwrap(), b"newer");
        assert_eq!(std::fs::read(inbox.staging_dir().join("po (1).pdf")).unwrap(), b"claimed");
    }

    #[tokio::test]
    async fn test_stale_upload_parts_removed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let inbox = Inbox::new(temp_dir.path());
        std::fs::create_dir_all(inbox.scratch_dir()).unwrap();
        std::fs::write(inbox.scratch_dir().join("upload-1234.part"), b"half").unwrap();

        assert!(inbox.recover_scratch().await.unwrap().is_empty());
        assert_eq!(std::fs::read_dir(inbox.scratch_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_nothing_to_recover() {
        let temp_dir = tempfile::tempdir().unwrap();
        let inbox = Inbox::new(temp_dir.path().join("fresh"));
        assert!(inbox.recover_scratch().await.unwrap().is_empty());
        let err = inbox.move_staged("po.pdf", "orders", None).await.unwrap_err();
        assert!(matches!(err, TriageError::NotFound(_)));
    }
}
