//! Read-only consistency report over the catalog.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use pharmacat_core::{AssignmentIssue, Product, Taxonomy};
use pharmacat_db::{list_product_images, list_products};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::ReconcileError;

/// Bucket name for products without a subcategory.
pub const NO_SUBCATEGORY: &str = "(none)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubcategoryCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub category: String,
    /// `false` for categories that are not in the taxonomy.
    pub known: bool,
    pub total: usize,
    /// Count descending, then name ascending.
    pub subcategories: Vec<SubcategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubcategoryRef {
    pub category: String,
    pub subcategory: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRef {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub subcategory: Option<String>,
}

impl From<&Product> for ProductRef {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            category: product.category.clone(),
            subcategory: product.subcategory_trimmed().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidAssignment {
    pub product: ProductRef,
    pub issue: AssignmentIssue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub product_count: usize,
    pub sparse_threshold: usize,
    /// Category ascending. Taxonomy categories always appear.
    pub categories: Vec<CategoryCounts>,
    /// Subcategories with `1..=sparse_threshold` products.
    pub sparse_subcategories: Vec<SubcategoryRef>,
    /// Taxonomy subcategories with no products.
    pub empty_subcategories: Vec<SubcategoryRef>,
    pub missing_brand: Vec<ProductRef>,
    pub missing_subcategory: Vec<ProductRef>,
    pub without_images: Vec<ProductRef>,
    pub invalid_assignments: Vec<InvalidAssignment>,
}

impl ConsistencyReport {
    /// Categories that are not part of the taxonomy.
    pub fn unknown_categories(&self) -> impl Iterator<Item = &CategoryCounts> {
        self.categories.iter().filter(|c| !c.known)
    }

    /// # Errors
    ///
    /// Returns [`ReconcileError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ReconcileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builds the report from already-loaded rows.
///
/// `products_with_images` holds the ids of products that own at least one
/// image row.
#[must_use]
pub fn build_report(
    taxonomy: &Taxonomy,
    products: &[Product],
    products_with_images: &HashSet<i64>,
    sparse_threshold: usize,
) -> ConsistencyReport {
    let mut counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for category in taxonomy.categories() {
        let subs = counts.entry(category.name.clone()).or_default();
        for sub in &category.subcategories {
            subs.insert(sub.clone(), 0);
        }
    }

    let mut missing_brand = Vec::new();
    let mut missing_subcategory = Vec::new();
    let mut without_images = Vec::new();
    let mut invalid_assignments = Vec::new();

    for product in products {
        let subcategory = product.subcategory_trimmed();
        *counts
            .entry(product.category.clone())
            .or_default()
            .entry(subcategory.unwrap_or(NO_SUBCATEGORY).to_string())
            .or_default() += 1;

        if product.brand_trimmed().is_none() {
            missing_brand.push(ProductRef::from(product));
        }
        if subcategory.is_none() {
            missing_subcategory.push(ProductRef::from(product));
        }
        if !products_with_images.contains(&product.id) {
            without_images.push(ProductRef::from(product));
        }
        if let Err(issue @ AssignmentIssue::SubcategoryNotAllowed) =
            taxonomy.check(&product.category, subcategory)
        {
            invalid_assignments.push(InvalidAssignment {
                product: ProductRef::from(product),
                issue,
            });
        }
    }

    let mut sparse_subcategories = Vec::new();
    let mut empty_subcategories = Vec::new();

    let categories = counts
        .into_iter()
        .map(|(category, subs)| {
            let config = taxonomy.category(&category);
            if let Some(config) = config {
                for declared in &config.subcategories {
                    let count = subs.get(declared).copied().unwrap_or_default();
                    let entry = SubcategoryRef {
                        category: category.clone(),
                        subcategory: declared.clone(),
                        count,
                    };
                    if count == 0 {
                        empty_subcategories.push(entry);
                    } else if count <= sparse_threshold {
                        sparse_subcategories.push(entry);
                    }
                }
            }

            let mut subcategories: Vec<SubcategoryCount> = subs
                .into_iter()
                .map(|(name, count)| SubcategoryCount { name, count })
                .collect();
            subcategories.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

            CategoryCounts {
                known: config.is_some(),
                total: subcategories.iter().map(|s| s.count).sum(),
                category,
                subcategories,
            }
        })
        .collect();

    ConsistencyReport {
        product_count: products.len(),
        sparse_threshold,
        categories,
        sparse_subcategories,
        empty_subcategories,
        missing_brand,
        missing_subcategory,
        without_images,
        invalid_assignments,
    }
}

/// Reads the catalog and builds a [`ConsistencyReport`]. Never writes.
///
/// # Errors
///
/// Returns [`ReconcileError::Db`] if products or images cannot be read.
pub async fn consistency_report(
    pool: &SqlitePool,
    taxonomy: &Taxonomy,
    sparse_threshold: usize,
) -> Result<ConsistencyReport, ReconcileError> {
    let products: Vec<Product> = list_products(pool, None)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();
    let with_images: HashSet<i64> = list_product_images(pool)
        .await?
        .into_iter()
        .map(|row| row.product_id)
        .collect();

    let report = build_report(taxonomy, &products, &with_images, sparse_threshold);
    tracing::info!(
        products = report.product_count,
        categories = report.categories.len(),
        unknown_categories = report.unknown_categories().count(),
        without_images = report.without_images.len(),
        invalid = report.invalid_assignments.len(),
        "consistency report built"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

fn write_products(f: &mut fmt::Formatter<'_>, title: &str, products: &[ProductRef]) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "# {title} ({})", products.len())?;
    for p in products {
        writeln!(
            f,
            "{}\t{}\t{}\t{}",
            p.id,
            p.name,
            p.category,
            p.subcategory.as_deref().unwrap_or(NO_SUBCATEGORY)
        )?;
    }
    Ok(())
}

impl fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "category\tsubcategory\tcount")?;
        for category in &self.categories {
            for sub in &category.subcategories {
                writeln!(f, "{}\t{}\t{}", category.category, sub.name, sub.count)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "# unknown categories")?;
        for category in self.unknown_categories() {
            writeln!(f, "{}\t{}", category.category, category.total)?;
        }

        writeln!(f)?;
        writeln!(f, "# sparse subcategories (<= {})", self.sparse_threshold)?;
        for sub in &self.sparse_subcategories {
            writeln!(f, "{}\t{}\t{}", sub.category, sub.subcategory, sub.count)?;
        }

        writeln!(f)?;
        writeln!(f, "# empty subcategories")?;
        for sub in &self.empty_subcategories {
            writeln!(f, "{}\t{}", sub.category, sub.subcategory)?;
        }

        write_products(f, "missing brand", &self.missing_brand)?;
        write_products(f, "missing subcategory", &self.missing_subcategory)?;
        write_products(f, "without images", &self.without_images)?;

        writeln!(f)?;
        writeln!(f, "# invalid assignments ({})", self.invalid_assignments.len())?;
        for invalid in &self.invalid_assignments {
            let p = &invalid.product;
            writeln!(
                f,
                "{}\t{}\t{}\t{}\t{}",
                p.id,
                p.name,
                p.category,
                p.subcategory.as_deref().unwrap_or(NO_SUBCATEGORY),
                invalid.issue
            )?;
        }

        writeln!(f)?;
        write!(f, "total products: {}", self.product_count)
    }
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
