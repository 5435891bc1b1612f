//! Database operations for `products`.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::DbError;

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

impl From<ProductRow> for pharmacat_core::Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            brand: row.brand,
            description: row.description,
            category: row.category,
            subcategory: row.subcategory,
            price: row.price,
            created_at: row.created_at,
        }
    }
}

pub(crate) const PRODUCT_COLUMNS: &str =
    "id, name, brand, description, category, subcategory, price, created_at";

/// Returns products ordered by `id`, optionally limited to one stored category.
///
/// The category filter is an exact comparison against the stored value so a
/// staged migration can target a legacy spelling such as `"Dermocosmetics"`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(
    pool: &SqlitePool,
    category: Option<&str>,
) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} \
         FROM products \
         WHERE (?1 IS NULL OR category = ?1) \
         ORDER BY id"
    ))
    .bind(category)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Moves a product to a new category/subcategory, guarded by its old values.
///
/// The `WHERE` clause repeats the values the caller read, so a row that was
/// edited since then is left alone. Returns `true` if the row was updated,
/// `false` if it no longer exists or no longer holds the expected values.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_product_classification(
    pool: &SqlitePool,
    product_id: i64,
    from_category: &str,
    from_subcategory: Option<&str>,
    to_category: &str,
    to_subcategory: Option<&str>,
) -> Result<bool, DbError> {
    let rows_affected = sqlx::query(
        "UPDATE products \
         SET category = ?1, subcategory = ?2 \
         WHERE id = ?3 AND category = ?4 AND subcategory IS ?5",
    )
    .bind(to_category)
    .bind(to_subcategory)
    .bind(product_id)
    .bind(from_category)
    .bind(from_subcategory)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected == 1)
}

/// Deletes a product; its images go with it through `ON DELETE CASCADE`.
///
/// Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_product(pool: &SqlitePool, product_id: i64) -> Result<bool, DbError> {
    let rows_affected = sqlx::query("DELETE FROM products WHERE id = ?1")
        .bind(product_id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(rows_affected > 0)
}
