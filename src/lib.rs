// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Inbox Triage: filesystem-backed staging inbox
//!
//! Accepts uploaded files into a staging directory, lists them, and files
//! them into `root/<category>/<subfolder?>/<name>`. The filesystem is the
//! only state; renames are the only concurrency primitive.

pub mod category;
pub mod collision;
pub mod config;
pub mod error;
pub mod history;
pub mod inbox;
pub mod resolver;
pub mod subfolder;
pub mod web;

pub use category::Category;
pub use collision::CollisionPolicy;
pub use config::AppConfig;
pub use error::{Result, TriageError};
pub use inbox::{Inbox, StagedFile};
pub use resolver::{resolve_destination, Destination};
