// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Default subfolder derivation for quick-action shortcuts
//!
//! Pure functions of an explicit date. Callers pass "today"; tests pass
//! whatever date they like.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::category::Category;

/// `YYYY-MM-DD`
pub fn dated(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `<product>/YYYY-MM-DD`
pub fn product_dated(product: &str, date: NaiveDate) -> String {
    let product = product.trim().trim_matches('/');
    if product.is_empty() {
        dated(date)
    } else {
        format!("{}/{}", product, dated(date))
    }
}

/// How a shortcut picks its subfolder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubfolderRule {
    /// File directly under the category root
    None,
    /// Always the same subfolder
    Fixed { path: String },
    /// Today's date
    Dated,
    /// Product name, then today's date
    ProductDated { product: String },
}

impl SubfolderRule {
    pub fn derive(&self, date: NaiveDate) -> Option<String> {
        match self {
            SubfolderRule::None => None,
            SubfolderRule::Fixed { path } => Some(path.clone()),
            SubfolderRule::Dated => Some(dated(date)),
            SubfolderRule::ProductDated { product } => Some(product_dated(product, date)),
        }
    }
}

/// A one-click move target shown next to each staged file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortcut {
    pub label: String,
    pub category: Category,
    #[serde(default = "default_rule")]
    pub rule: SubfolderRule,
}

fn default_rule() -> SubfolderRule {
    SubfolderRule::None
}

/// A shortcut evaluated for a particular day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortcutTarget {
    pub label: String,
    pub category: Category,
    pub subfolder: Option<String>,
}

impl Shortcut {
    pub fn new(label: impl Into<String>, category: Category, rule: SubfolderRule) -> Self {
        Self {
            label: label.into(),
            category,
            rule,
        }
    }

    pub fn target(&self, date: NaiveDate) -> ShortcutTarget {
        ShortcutTarget {
            label: self.label.clone(),
            category: self.category,
            subfolder: self.rule.derive(date),
        }
    }
}

/// orders by day, feta COAs by day, notes flat
pub fn default_shortcuts() -> Vec<Shortcut> {
    vec![
        Shortcut::new("→ orders / today", Category::Orders, SubfolderRule::Dated),
        Shortcut::new(
            "→ coas / feta / today",
            Category::Coas,
            SubfolderRule::ProductDated { product: "feta".to_string() },
        ),
        Shortcut::new("→ notes", Category::Notes, SubfolderRule::None),
    ]
}

/// Evaluate every shortcut for `date`
pub fn targets(shortcuts: &[Shortcut], date: NaiveDate) -> Vec<ShortcutTarget> {
    shortcuts.iter().map(|s| s.target(date)).collect()
}
