// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{Inbox, CLAIM_PREFIX};
use crate::category::Category;
use crate::collision::{place, CollisionPolicy};
use crate::history::HistoryEntry;
use crate::resolver::Destination;
use crate::{Result, TriageError};

const COPY_CHUNK: usize = 64 * 1024;

impl Inbox {
    /// File a staged file under `root/category[/subfolder]/name`.
    ///
    /// `category` arrives as caller input and is validated here.
    pub async fn move_staged(&self, name: &str, category: &str, subfolder: Option<&str>) -> Result<Destination> {
        let category: Category = category.parse()?;
        self.move_to(name, category, subfolder).await
    }

    /// Protocol:
    /// 1. validate and resolve (no filesystem access)
    /// 2. the staged entry must be a regular file
    /// 3. claim it with one atomic rename into the scratch directory; losing
    ///    that rename to a concurrent mover is `NotFound`
    /// 4. create the destination directories and place the file
    ///
    /// Any failure after the claim puts the file back in the inbox.
    pub async fn move_to(&self, name: &str, category: Category, subfolder: Option<&str>) -> Result<Destination> {
        let dest = Destination::new(self.root(), category, subfolder, name)?;
        let source = self.staging_dir().join(&dest.name);

        let size_bytes = match fs::symlink_metadata(&source).await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => return Err(TriageError::NotFound(dest.name.clone())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(TriageError::NotFound(dest.name.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        let claim = self.claim(&source, &dest.name).await?;

        let placed = match self.commit(&claim, &dest).await {
            Ok(placed) => placed,
            Err(e) => return Err(self.restore(&claim, &source, e).await),
        };
        release_claim_dir(&claim).await;

        let dest = match placed.file_name().and_then(|n| n.to_str()) {
            Some(final_name) if final_name != dest.name => Destination {
                name: final_name.to_string(),
                path: placed.clone(),
                ..dest
            },
            _ => dest,
        };

        info!("Moved {} -> {}", name, dest.relative());
        self.record(HistoryEntry::moved(
            name,
            dest.category,
            dest.subfolder.clone(),
            dest.relative(),
            size_bytes,
        ))
        .await;

        Ok(dest)
    }

    /// Claims live at `.triage/claim-<uuid>/<name>` so an interrupted move
    /// can be put back under its own name by [`Inbox::recover_scratch`]
    pub(super) async fn claim(&self, source: &Path, name: &str) -> Result<PathBuf> {
        let dir = self.ensure_scratch().await?.join(format!("{}{}", CLAIM_PREFIX, Uuid::new_v4()));
        fs::create_dir(&dir).await?;
        let claim = dir.join(name);
        match fs::rename(source, &claim).await {
            Ok(()) => {
                debug!("Claimed {:?} as {:?}", source, claim);
                Ok(claim)
            }
            Err(e) => {
                let _ = fs::remove_dir(&dir).await;
                match e.kind() {
                    io::ErrorKind::NotFound => Err(TriageError::NotFound(name.to_string())),
                    _ => Err(e.into()),
                }
            }
        }
    }

    async fn commit(&self, claim: &Path, dest: &Destination) -> Result<PathBuf> {
        fs::create_dir_all(dest.parent()).await?;

        match place(self.policy, claim, &dest.path).await {
            Ok(placed) => Ok(placed),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                debug!("{:?} is on another volume, copying", dest.path);
                self.commit_by_copy(claim, dest).await
            }
            Err(e) => Err(placement_error(e, dest)),
        }
    }

    /// Copy next to the destination, verify, place, and only then drop the claim
    async fn commit_by_copy(&self, claim: &Path, dest: &Destination) -> Result<PathBuf> {
        let part = dest.parent().join(format!(".{}.{}.part", dest.name, Uuid::new_v4()));

        if let Err(e) = copy_verified(claim, &part).await {
            remove_quietly(&part).await;
            return Err(e.into());
        }

        let placed = match place(self.policy, &part, &dest.path).await {
            Ok(placed) => placed,
            Err(e) => {
                remove_quietly(&part).await;
                return Err(placement_error(e, dest));
            }
        };

        if let Err(e) = fs::remove_file(claim).await {
            warn!("Copied to {:?} but could not remove claimed source {:?}: {}", placed, claim, e);
        }
        Ok(placed)
    }

    /// Put a claimed file back in the inbox after `cause` stopped the move.
    ///
    /// Nothing is clobbered: if the name was taken by an upload in the
    /// meantime the file comes back under a suffixed name. Whenever the file
    /// does not end up under its own name the returned error says where it is.
    async fn restore(&self, claim: &Path, source: &Path, cause: TriageError) -> TriageError {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let returned = match place(CollisionPolicy::Reject, claim, source).await {
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                place(CollisionPolicy::Suffix, claim, source).await
            }
            other => other,
        };

        match returned {
            Ok(placed) if placed == source => {
                release_claim_dir(claim).await;
                cause
            }
            Ok(placed) => {
                release_claim_dir(claim).await;
                let staged = placed
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                warn!("{} was re-uploaded during a failed move, returned it as {}", name, staged);
                TriageError::Displaced {
                    name,
                    location: self.staged_relative(&staged),
                    reason: cause.to_string(),
                }
            }
            Err(e) => {
                error!("Could not return {} to {:?}, it remains at {:?}: {}", name, source, claim, e);
                TriageError::Displaced {
                    name,
                    location: claim.display().to_string(),
                    reason: cause.to_string(),
                }
            }
        }
    }
}

/// Drop the now empty `claim-<uuid>` directory
async fn release_claim_dir(claim: &Path) {
    if let Some(dir) = claim.parent() {
        if let Err(e) = fs::remove_dir(dir).await {
            debug!("Could not remove claim directory {:?}: {}", dir, e);
        }
    }
}

fn placement_error(e: io::Error, dest: &Destination) -> TriageError {
    match e.kind() {
        io::ErrorKind::AlreadyExists => TriageError::DestinationCollision(dest.relative()),
        _ => TriageError::Io(e),
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            debug!("Could not remove {:?}: {}", path, e);
        }
    }
}

/// Copy `src` into a new file `dst` and check the copy byte-for-byte via
/// length and blake3 digest. `dst` must not exist. Returns the length.
pub(crate) async fn copy_verified(src: &Path, dst: &Path) -> io::Result<u64> {
    let mut reader = File::open(src).await?;
    let mut writer = OpenOptions::new().write(true).create_new(true).open(dst).await?;

    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut copied = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        writer.write_all(&buf[..n]).await?;
        copied += n as u64;
    }
    writer.flush().await?;
    writer.sync_all().await?;
    drop(writer);

    let (written, digest) = digest_file(dst).await?;
    if written != copied || digest != hasher.finalize() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("copy of {:?} to {:?} does not match the source", src, dst),
        ));
    }
    Ok(copied)
}

async fn digest_file(path: &Path) -> io::Result<(u64, blake3::Hash)> {
    let mut file = File::open(path).await?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut len = 0u64;
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        len += n as u64;
    }
    Ok((len, hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_copy_verified() {
        let temp_dir = tempfile::tempdir().unwrap();
        let src = temp_dir.path().join("src.bin");
        let dst = temp_dir.path().join("dst.bin");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&src, &data).await.unwrap();

        let copied = copy_verified(&src, &dst).await.unwrap();
        assert_eq!(copied, data.len() as u64);
        assert_eq!(fs::read(&dst).await.unwrap(), data);
        // Source is never touched
        assert_eq!(fs::read(&src).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_copy_verified_refuses_existing_target() {
        let temp_dir = tempfile::tempdir().unwrap();
        let src = temp_dir.path().join("src.bin");
        let dst = temp_dir.path().join("dst.bin");
        fs::write(&src, b"new").await.unwrap();
        fs::write(&dst, b"old").await.unwrap();

        let err = copy_verified(&src, &dst).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&dst).await.unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_directory_in_inbox_is_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let inbox = Inbox::new(temp_dir.path());
        std::fs::create_dir_all(inbox.staging_dir().join("folder")).unwrap();

        let err = inbox.move_staged("folder", "notes", None).await.unwrap_err();
        assert!(matches!(err, TriageError::NotFound(_)));
        let err = inbox.move_staged(crate::inbox::SCRATCH_DIR, "notes", None).await.unwrap_err();
        assert!(matches!(err, TriageError::NotFound(_)));
        assert!(!temp_dir.path().join("notes").exists());
    }

    #[tokio::test]
    async fn test_rejected_destination_returns_file_to_inbox() {
        let temp_dir = tempfile::tempdir().unwrap();
        let inbox = Inbox::new(temp_dir.path());
        std::fs::create_dir_all(temp_dir.path().join("orders/2025-10-03")).unwrap();
        std::fs::write(temp_dir.path().join("orders/2025-10-03/po.pdf"), b"filed").unwrap();
        inbox.receive_upload("po.pdf", &b"staged"[..]).await.unwrap();

        let err = inbox.move_staged("po.pdf", "orders", Some("2025-10-03")).await.unwrap_err();
        match err {
            TriageError::DestinationCollision(rel) => assert_eq!(rel, "orders/2025-10-03/po.pdf"),
            other => panic!("expected DestinationCollision, got {:?}", other),
        }
        assert_eq!(std::fs::read(inbox.staging_dir().join("po.pdf")).unwrap(), b"staged");
        assert_eq!(std::fs::read(temp_dir.path().join("orders/2025-10-03/po.pdf")).unwrap(), b"filed");
    }

    #[tokio::test]
    async fn test_existing_directories_reused() {
        let temp_dir = tempfile::tempdir().unwrap();
        let inbox = Inbox::new(temp_dir.path());
        inbox.init().await.unwrap();
        inbox.receive_upload("one.txt", &b"1"[..]).await.unwrap();
        inbox.receive_upload("two.txt", &b"2"[..]).await.unwrap();

        let first = inbox.move_to("one.txt", Category::Notes, Some("shared")).await.unwrap();
        let second = inbox.move_to("two.txt", Category::Notes, Some("shared/")).await.unwrap();
        assert_eq!(first.parent(), second.parent());
        assert_eq!(second.relative(), "notes/shared/two.txt");
    }

    async fn claimed(inbox: &Inbox, name: &str, data: &[u8]) -> PathBuf {
        inbox.receive_upload(name, data).await.unwrap();
        inbox.claim(&inbox.staging_dir().join(name), name).await.unwrap()
    }

    fn part_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".part"))
            .collect()
    }

    #[tokio::test]
    async fn test_commit_by_copy_places_and_drops_claim() {
        let temp_dir = tempfile::tempdir().unwrap();
        let inbox = Inbox::new(temp_dir.path());
        let claim = claimed(&inbox, "coa.pdf", b"certificate").await;
        let dest = Destination::new(temp_dir.path(), Category::Coas, Some("feta/2025-10-03"), "coa.pdf").unwrap();
        fs::create_dir_all(dest.parent()).await.unwrap();

        let placed = inbox.commit_by_copy(&claim, &dest).await.unwrap();
        assert_eq!(placed, dest.path);
        assert_eq!(fs::read(&placed).await.unwrap(), b"certificate");
        assert!(!claim.exists());
        assert!(part_files(dest.parent()).is_empty());
    }

    #[tokio::test]
    async fn test_commit_by_copy_collision_keeps_claim() {
        let temp_dir = tempfile::tempdir().unwrap();
        let inbox = Inbox::new(temp_dir.path());
        let claim = claimed(&inbox, "po.pdf", b"staged").await;
        let dest = Destination::new(temp_dir.path(), Category::Orders, Some("2025-10-03"), "po.pdf").unwrap();
        fs::create_dir_all(dest.parent()).await.unwrap();
        fs::write(&dest.path, b"filed").await.unwrap();

        let err = inbox.commit_by_copy(&claim, &dest).await.unwrap_err();
        assert!(matches!(err, TriageError::DestinationCollision(ref rel) if rel == "orders/2025-10-03/po.pdf"));
        assert_eq!(fs::read(&claim).await.unwrap(), b"staged");
        assert_eq!(fs::read(&dest.path).await.unwrap(), b"filed");
        assert!(part_files(dest.parent()).is_empty());
    }

    #[tokio::test]
    async fn test_commit_by_copy_suffix_policy() {
        let temp_dir = tempfile::tempdir().unwrap();
        let inbox = Inbox::new(temp_dir.path()).with_policy(CollisionPolicy::Suffix);
        let claim = claimed(&inbox, "memo.txt", b"second").await;
        let dest = Destination::new(temp_dir.path(), Category::Notes, None, "memo.txt").unwrap();
        fs::create_dir_all(dest.parent()).await.unwrap();
        fs::write(&dest.path, b"first").await.unwrap();

        let placed = inbox.commit_by_copy(&claim, &dest).await.unwrap();
        assert_eq!(placed, temp_dir.path().join("notes/memo (1).txt"));
        assert_eq!(fs::read(&placed).await.unwrap(), b"second");
        assert!(!claim.exists());
    }

    #[tokio::test]
    async fn test_restore_reports_displaced_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let inbox = Inbox::new(temp_dir.path());
        let source = inbox.staging_dir().join("po.pdf");
        let claim = claimed(&inbox, "po.pdf", b"claimed").await;
        // Same name uploaded while the move was in flight
        inbox.receive_upload("po.pdf", &b"newer"[..]).await.unwrap();

        let cause = TriageError::Io(io::Error::other("disk full"));
        match inbox.restore(&claim, &source, cause).await {
            TriageError::Displaced { name, location, reason } => {
                assert_eq!(name, "po.pdf");
                assert_eq!(location, "inbox/po (1).pdf");
                assert!(reason.contains("disk full"));
            }
            other => panic!("expected Displaced, got {:?}", other),
        }
        assert_eq!(fs::read(&source).await.unwrap(), b"newer");
        assert_eq!(fs::read(inbox.staging_dir().join("po (1).pdf")).await.unwrap(), b"claimed");
        assert_eq!(std::fs::read_dir(inbox.scratch_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_restore_under_own_name_keeps_cause() {
        let temp_dir = tempfile::tempdir().unwrap();
        let inbox = Inbox::new(temp_dir.path());
        let source = inbox.staging_dir().join("po.pdf");
        let claim = claimed(&inbox, "po.pdf", b"claimed").await;

        let err = inbox.restore(&claim, &source, TriageError::Upload("x".to_string())).await;
        assert!(matches!(err, TriageError::Upload(_)));
        assert_eq!(fs::read(&source).await.unwrap(), b"claimed");
        assert_eq!(std::fs::read_dir(inbox.scratch_dir()).unwrap().count(), 0);
    }
}
