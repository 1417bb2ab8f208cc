// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for the inbox triage engine

use thiserror::Error;

/// Result type alias for triage operations
pub type Result<T> = std::result::Result<T, TriageError>;

/// Triage error types
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Invalid category: {0:?} (expected one of orders, coas, notes)")]
    InvalidCategory(String),

    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    #[error("Invalid subfolder: {0:?}")]
    InvalidSubfolder(String),

    #[error("No staged file named {0:?}")]
    NotFound(String),

    #[error("A staged file named {0:?} already exists")]
    NameCollision(String),

    #[error("Destination already exists: {0}")]
    DestinationCollision(String),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{name} could not be filed ({reason}); it is now at {location}")]
    Displaced {
        name: String,
        location: String,
        reason: String,
    },

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TriageError {
    /// Validation failures are reported before anything touches the filesystem
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidCategory(_) | Self::InvalidName(_) | Self::InvalidSubfolder(_)
        )
    }

    /// The target name is taken under the `reject` policy
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::NameCollision(_) | Self::DestinationCollision(_))
    }
}
