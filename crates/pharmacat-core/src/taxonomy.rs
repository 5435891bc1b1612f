//! The fixed two-level category vocabulary.
//!
//! Category and subcategory names are matched exactly: a product filed under
//! `"Dermocosmetics"` is *not* in `"dermokozmetikë"` until a rule moves it.

use serde::{Deserialize, Serialize};

/// One top-level category and its allowed subcategories, in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default)]
    pub subcategories: Vec<String>,
}

/// Why a `(category, subcategory)` pair is not a valid assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentIssue {
    UnknownCategory,
    SubcategoryNotAllowed,
}

impl std::fmt::Display for AssignmentIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentIssue::UnknownCategory => write!(f, "category is not in the taxonomy"),
            AssignmentIssue::SubcategoryNotAllowed => {
                write!(f, "subcategory is not allowed for this category")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    categories: Vec<CategoryConfig>,
}

impl Taxonomy {
    /// Builds a taxonomy without validation. [`crate::RuleSet`] validates
    /// names and uniqueness before calling this.
    #[must_use]
    pub fn new(categories: Vec<CategoryConfig>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> impl Iterator<Item = &CategoryConfig> {
        self.categories.iter()
    }

    #[must_use]
    pub fn category(&self, name: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn contains_category(&self, name: &str) -> bool {
        self.category(name).is_some()
    }

    /// Returns `true` if `subcategory` may be used under `category`.
    ///
    /// An absent subcategory is allowed for every known category.
    #[must_use]
    pub fn allows(&self, category: &str, subcategory: Option<&str>) -> bool {
        self.check(category, subcategory).is_ok()
    }

    /// Validates an assignment against the taxonomy.
    ///
    /// # Errors
    ///
    /// Returns the [`AssignmentIssue`] describing why the pair is invalid.
    pub fn check(&self, category: &str, subcategory: Option<&str>) -> Result<(), AssignmentIssue> {
        let config = self
            .category(category)
            .ok_or(AssignmentIssue::UnknownCategory)?;
        match subcategory {
            None => Ok(()),
            Some(sub) if config.subcategories.iter().any(|s| s == sub) => Ok(()),
            Some(_) => Err(AssignmentIssue::SubcategoryNotAllowed),
        }
    }

    /// Total number of declared subcategories across all categories.
    #[must_use]
    pub fn subcategory_count(&self) -> usize {
        self.categories.iter().map(|c| c.subcategories.len()).sum()
    }
}
