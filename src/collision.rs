// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Name collision policy shared by uploads and moves
//!
//! Both the upload receiver and the triage mover finish by placing a file
//! under its final name with [`place`], so the policy behaves identically
//! for a name clash in the inbox and at a filing destination.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Highest `(n)` suffix tried before giving up
pub const MAX_SUFFIX: u32 = 999;

/// What to do when the target name is already taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Fail and leave both files untouched
    #[default]
    Reject,
    /// Atomically replace the existing file
    Overwrite,
    /// Use the first free `stem (n).ext`
    Suffix,
}

/// `report.pdf` -> `report (n).pdf`; `n == 0` is the name itself
pub fn suffixed_name(name: &str, n: u32) -> String {
    if n == 0 {
        return name.to_string();
    }
    // A leading dot is part of the stem, not an extension separator
    match name.rfind('.') {
        Some(idx) if idx > 0 => format!("{} ({}){}", &name[..idx], n, &name[idx..]),
        _ => format!("{} ({})", name, n),
    }
}

/// Move `src` to `target` according to `policy`, returning the final path.
///
/// `src` must be on the same filesystem as `target`. On success `src` no
/// longer exists. A taken name under `Reject` (or an exhausted `Suffix`)
/// is reported as [`io::ErrorKind::AlreadyExists`] and `src` is left alone.
///
/// `Reject` and `Suffix` claim the name with `link(2)`, which fails
/// atomically when the target exists, then unlink `src`.
pub async fn place(policy: CollisionPolicy, src: &Path, target: &Path) -> io::Result<PathBuf> {
    match policy {
        CollisionPolicy::Overwrite => {
            fs::rename(src, target).await?;
            Ok(target.to_path_buf())
        }
        CollisionPolicy::Reject => {
            link_then_unlink(src, target).await?;
            Ok(target.to_path_buf())
        }
        CollisionPolicy::Suffix => {
            let name = target
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no file name"))?;
            let dir = target.parent().unwrap_or_else(|| Path::new(""));

            for n in 0..=MAX_SUFFIX {
                let candidate = dir.join(suffixed_name(name, n));
                match link_then_unlink(src, &candidate).await {
                    Ok(()) => return Ok(candidate),
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                    Err(e) => return Err(e),
                }
            }
            Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("no free name for {:?} after {} attempts", name, MAX_SUFFIX),
            ))
        }
    }
}

/// Link `src` at `target`, then drop `src`. If `src` can't be removed the
/// new link is taken back so the file never ends up in two places.
async fn link_then_unlink(src: &Path, target: &Path) -> io::Result<()> {
    fs::hard_link(src, target).await?;
    if let Err(e) = fs::remove_file(src).await {
        if let Err(undo) = fs::remove_file(target).await {
            tracing::error!("Failed to remove link {:?} after failed unlink: {}", target, undo);
        }
        return Err(e);
    }
    Ok(())
}
