use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalog product as seen by classification and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    /// Stored as-is; the catalog does not pin a currency unit.
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Brand with surrounding whitespace removed; blank brands count as absent.
    #[must_use]
    pub fn brand_trimmed(&self) -> Option<&str> {
        non_blank(self.brand.as_deref())
    }

    /// Subcategory with surrounding whitespace removed; blank counts as absent.
    #[must_use]
    pub fn subcategory_trimmed(&self) -> Option<&str> {
        non_blank(self.subcategory.as_deref())
    }
}

/// An image attached to a [`Product`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: i64,
    pub product_id: i64,
    /// Web path (`/uploads/images/x.jpg`), relative path, or remote URL.
    pub image_url: String,
    /// Display priority; the primary image sits at 0.
    pub sort_order: i64,
    pub is_primary: bool,
}

impl ProductImage {
    /// `true` for references that point off-host and cannot be checked locally.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        is_remote_reference(&self.image_url)
    }
}

/// `true` for `http://` and `https://` references, in any letter case.
#[must_use]
pub fn is_remote_reference(reference: &str) -> bool {
    let lower = reference.trim().to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
