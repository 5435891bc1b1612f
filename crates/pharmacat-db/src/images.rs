//! Database operations for `product_images`.

use sqlx::SqlitePool;

use crate::products::{ProductRow, PRODUCT_COLUMNS};
use crate::DbError;

/// A row from the `product_images` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductImageRow {
    pub id: i64,
    pub product_id: i64,
    pub image_url: String,
    pub sort_order: i64,
    pub is_primary: bool,
}

impl From<ProductImageRow> for pharmacat_core::ProductImage {
    fn from(row: ProductImageRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            image_url: row.image_url,
            sort_order: row.sort_order,
            is_primary: row.is_primary,
        }
    }
}

/// Returns every image row ordered by product, display position, then `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_product_images(pool: &SqlitePool) -> Result<Vec<ProductImageRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductImageRow>(
        "SELECT id, product_id, image_url, sort_order, is_primary \
         FROM product_images \
         ORDER BY product_id, sort_order, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns image rows whose `product_id` has no matching product.
///
/// The schema cascades deletes, but databases written with foreign keys
/// disabled can still hold such rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_orphaned_images(pool: &SqlitePool) -> Result<Vec<ProductImageRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductImageRow>(
        "SELECT i.id, i.product_id, i.image_url, i.sort_order, i.is_primary \
         FROM product_images i \
         WHERE NOT EXISTS (SELECT 1 FROM products p WHERE p.id = i.product_id) \
         ORDER BY i.id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns products that have no image rows, ordered by `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products_without_images(pool: &SqlitePool) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} \
         FROM products p \
         WHERE NOT EXISTS (SELECT 1 FROM product_images i WHERE i.product_id = p.id) \
         ORDER BY p.id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Deletes one image row. Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_product_image(pool: &SqlitePool, image_id: i64) -> Result<bool, DbError> {
    let rows_affected = sqlx::query("DELETE FROM product_images WHERE id = ?1")
        .bind(image_id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(rows_affected > 0)
}

/// Inserts a primary placeholder image for a product that has none.
///
/// The insert and the "has no image" check are one statement, so the call is
/// strictly additive: it never touches a product that already has an image,
/// and repeating it never adds a second placeholder. Returns `true` if a row
/// was inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_placeholder_image(
    pool: &SqlitePool,
    product_id: i64,
    image_url: &str,
) -> Result<bool, DbError> {
    let rows_affected = sqlx::query(
        "INSERT INTO product_images (product_id, image_url, sort_order, is_primary) \
         SELECT ?1, ?2, 0, 1 \
         WHERE EXISTS (SELECT 1 FROM products WHERE id = ?1) \
           AND NOT EXISTS (SELECT 1 FROM product_images WHERE product_id = ?1)",
    )
    .bind(product_id)
    .bind(image_url)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected > 0)
}

/// Sets the display position and primary flag of one image.
///
/// Returns `true` if the row exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_image_order(
    pool: &SqlitePool,
    image_id: i64,
    sort_order: i64,
    is_primary: bool,
) -> Result<bool, DbError> {
    let rows_affected = sqlx::query(
        "UPDATE product_images SET sort_order = ?1, is_primary = ?2 WHERE id = ?3",
    )
    .bind(sort_order)
    .bind(is_primary)
    .bind(image_id)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected > 0)
}
