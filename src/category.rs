// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! The closed set of triage categories

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TriageError;

/// Where a staged file can be filed. Not extensible at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Orders,
    Coas,
    Notes,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Orders, Category::Coas, Category::Notes];

    /// Directory name under the storage root
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Orders => "orders",
            Category::Coas => "coas",
            Category::Notes => "notes",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| TriageError::InvalidCategory(s.to_string()))
    }
}
