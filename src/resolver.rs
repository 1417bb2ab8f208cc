// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Destination path resolution and name validation
//!
//! Everything here is pure: nothing touches the filesystem, so validation
//! errors can be reported before any directory is created or file is moved.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::category::Category;
use crate::{Result, TriageError};

/// A resolved, validated filing location for a staged file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
    pub category: Category,
    pub subfolder: Option<String>,
    pub name: String,
    /// `root/category[/subfolder]/name`
    pub path: PathBuf,
}

impl Destination {
    /// Resolve against an already-parsed category
    pub fn new(root: &Path, category: Category, subfolder: Option<&str>, name: &str) -> Result<Self> {
        let subfolder = normalize_subfolder(subfolder)?;
        let name = validate_name(name)?;

        let mut path = root.join(category.as_str());
        if let Some(ref sub) = subfolder {
            path.extend(sub.split('/'));
        }
        path.push(name);

        Ok(Self {
            category,
            subfolder,
            name: name.to_string(),
            path,
        })
    }

    /// Directory that must exist before the file can be placed
    pub fn parent(&self) -> &Path {
        self.path.parent().unwrap_or(&self.path)
    }

    /// Path relative to the storage root, always `/`-delimited
    pub fn relative(&self) -> String {
        match self.subfolder {
            Some(ref sub) => format!("{}/{}/{}", self.category, sub, self.name),
            None => format!("{}/{}", self.category, self.name),
        }
    }
}

/// Resolve `root/category[/subfolder]/name`, validating every part.
///
/// Checked in order: category, subfolder, name.
pub fn resolve_destination(
    root: &Path,
    category: &str,
    subfolder: Option<&str>,
    name: &str,
) -> Result<Destination> {
    let category: Category = category.parse()?;
    Destination::new(root, category, subfolder, name)
}

/// Check that `name` is a single plain filename.
///
/// Rejects empty names, `.` and `..`, path separators of either flavour,
/// and NUL bytes (which truncate in the underlying syscalls).
pub fn validate_name(name: &str) -> Result<&str> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(TriageError::InvalidName(name.to_string()));
    }
    Ok(name)
}

/// Normalize an optional subfolder into `a/b/c` form.
///
/// Surrounding whitespace is trimmed and a blank result counts as absent.
/// Empty and `.` segments are dropped, so `/feta//2025-10-03/` becomes
/// `feta/2025-10-03`. A `..` segment, a backslash or a NUL byte is rejected.
pub fn normalize_subfolder(subfolder: Option<&str>) -> Result<Option<String>> {
    let raw = match subfolder.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(None),
    };

    if raw.contains(['\\', '\0']) {
        return Err(TriageError::InvalidSubfolder(raw.to_string()));
    }

    let mut segments = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(TriageError::InvalidSubfolder(raw.to_string())),
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        Ok(None)
    } else {
        Ok(Some(segments.join("/")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Component;

    fn root() -> PathBuf {
        PathBuf::from("/srv/triage")
    }

    #[test]
    fn test_resolve_with_subfolder() {
        let dest = resolve_destination(&root(), "orders", Some("2025-10-03"), "order-123.pdf").unwrap();
        assert_eq!(dest.path, PathBuf::from("/srv/triage/orders/2025-10-03/order-123.pdf"));
        assert_eq!(dest.relative(), "orders/2025-10-03/order-123.pdf");
        assert_eq!(dest.parent(), Path::new("/srv/triage/orders/2025-10-03"));
    }

    #[test]
    fn test_resolve_nested_subfolder() {
        let dest = resolve_destination(&root(), "coas", Some("feta/2025-10-03"), "coa.pdf").unwrap();
        assert_eq!(dest.path, PathBuf::from("/srv/triage/coas/feta/2025-10-03/coa.pdf"));
        assert_eq!(dest.subfolder.as_deref(), Some("feta/2025-10-03"));
    }

    #[test]
    fn test_blank_subfolder_is_absent() {
        for sub in [None, Some(""), Some("   "), Some("/"), Some(" // ")] {
            let dest = resolve_destination(&root(), "notes", sub, "memo.txt").unwrap();
            assert_eq!(dest.path, PathBuf::from("/srv/triage/notes/memo.txt"));
            assert_eq!(dest.subfolder, None);
        }
    }

    #[test]
    fn test_subfolder_normalization() {
        assert_eq!(
            normalize_subfolder(Some("  /feta//./2025-10-03/ ")).unwrap().as_deref(),
            Some("feta/2025-10-03")
        );
    }

    #[test]
    fn test_subfolder_traversal_rejected() {
        for sub in ["..", "../inbox", "a/../../b", "feta/..", "a\\b", "a\0b"] {
            let err = resolve_destination(&root(), "orders", Some(sub), "x.pdf").unwrap_err();
            assert!(matches!(err, TriageError::InvalidSubfolder(_)), "{:?} gave {:?}", sub, err);
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", ".", "..", "a/b", "../x", "..\\x", "dir\\file", "nul\0byte", "/abs"] {
            let err = resolve_destination(&root(), "orders", None, name).unwrap_err();
            assert!(matches!(err, TriageError::InvalidName(_)), "{:?} gave {:?}", name, err);
        }
    }

    #[test]
    fn test_odd_but_valid_names() {
        for name in ["..hidden", "a..b", ".env", "order (1).pdf", "ünïcödé.txt", " spaced "] {
            let dest = resolve_destination(&root(), "orders", None, name).unwrap();
            assert_eq!(dest.name, name);
        }
    }

    #[test]
    fn test_invalid_category_checked_first() {
        let err = resolve_destination(&root(), "invalid", Some(".."), "..").unwrap_err();
        assert!(matches!(err, TriageError::InvalidCategory(_)));
    }

    #[test]
    fn test_destination_stays_inside_category_root() {
        let names = ["a.pdf", "..x", "x..", ".x", "x y"];
        let subs = [None, Some("a"), Some("a/b/c"), Some("./a/./b"), Some("2025-10-03")];
        for category in Category::ALL {
            let category_root = root().join(category.as_str());
            for name in names {
                for sub in subs {
                    let dest = Destination::new(&root(), category, sub, name).unwrap();
                    let rest = dest.path.strip_prefix(&category_root).unwrap();
                    assert!(rest.components().count() >= 1);
                    assert!(rest.components().all(|c| matches!(c, Component::Normal(_))));
                    for other in Category::ALL.iter().filter(|o| **o != category) {
                        assert!(!dest.path.starts_with(root().join(other.as_str())));
                    }
                    assert!(!dest.path.starts_with(root().join("inbox")));
                }
            }
        }
    }
}
