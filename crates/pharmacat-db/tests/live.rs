//! Live integration tests for pharmacat-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated SQLite database from the sqlx test
//! harness. The `migrations` path is relative to the crate root
//! (`crates/pharmacat-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use pharmacat_db::{
    delete_product, delete_product_image, insert_placeholder_image, list_orphaned_images,
    list_product_images, list_products, list_products_without_images, update_image_order,
    update_product_classification,
};
use sqlx::SqlitePool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn insert_product(
    pool: &SqlitePool,
    name: &str,
    category: &str,
    subcategory: Option<&str>,
) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO products (name, brand, category, subcategory, price) \
         VALUES (?1, NULL, ?2, ?3, 10.0) RETURNING id",
    )
    .bind(name)
    .bind(category)
    .bind(subcategory)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_product failed for '{name}': {e}"))
}

async fn insert_image(
    pool: &SqlitePool,
    product_id: i64,
    url: &str,
    sort_order: i64,
    is_primary: bool,
) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO product_images (product_id, image_url, sort_order, is_primary) \
         VALUES (?1, ?2, ?3, ?4) RETURNING id",
    )
    .bind(product_id)
    .bind(url)
    .bind(sort_order)
    .bind(is_primary)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_image failed for '{url}': {e}"))
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn list_products_filters_by_exact_category(pool: SqlitePool) {
    insert_product(&pool, "Avène Gel", "Dermocosmetics", None).await;
    insert_product(&pool, "Omega 3", "suplemente", Some("Omega 3")).await;
    insert_product(&pool, "Eau Thermale", "dermocosmetics", None).await;

    let all = list_products(&pool, None).await.expect("list all failed");
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].id < w[1].id), "ordered by id");

    let legacy = list_products(&pool, Some("Dermocosmetics"))
        .await
        .expect("list filtered failed");
    assert_eq!(legacy.len(), 1);
    assert_eq!(legacy[0].name, "Avène Gel");
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_classification_applies_when_old_values_match(pool: SqlitePool) {
    let id = insert_product(&pool, "iHealth Wave", "dermokozmetikë", Some("Tanning")).await;

    let updated = update_product_classification(
        &pool,
        id,
        "dermokozmetikë",
        Some("Tanning"),
        "produkte mjekësore",
        Some("Aparat mjeksore"),
    )
    .await
    .expect("update failed");
    assert!(updated);

    let rows = list_products(&pool, Some("produkte mjekësore")).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].subcategory.as_deref(), Some("Aparat mjeksore"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_classification_skips_row_that_changed(pool: SqlitePool) {
    let id = insert_product(&pool, "iHealth Wave", "dermokozmetikë", Some("Tanning")).await;

    let updated = update_product_classification(
        &pool,
        id,
        "dermokozmetikë",
        Some("Fytyre"),
        "produkte mjekësore",
        Some("Aparat mjeksore"),
    )
    .await
    .expect("update failed");
    assert!(!updated, "stale expected values must not match");

    let rows = list_products(&pool, None).await.unwrap();
    assert_eq!(rows[0].subcategory.as_deref(), Some("Tanning"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_classification_matches_null_subcategory(pool: SqlitePool) {
    let id = insert_product(&pool, "Avène Gel", "Dermocosmetics", None).await;

    let updated =
        update_product_classification(&pool, id, "Dermocosmetics", None, "dermokozmetikë", None)
            .await
            .expect("update failed");
    assert!(updated);
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_product_cascades_images(pool: SqlitePool) {
    let id = insert_product(&pool, "Duplicate", "suplemente", None).await;
    insert_image(&pool, id, "/uploads/images/a.jpg", 0, true).await;

    assert!(delete_product(&pool, id).await.unwrap());
    assert!(!delete_product(&pool, id).await.unwrap(), "second delete is a no-op");
    assert!(list_product_images(&pool).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn list_images_orders_by_product_then_position(pool: SqlitePool) {
    let a = insert_product(&pool, "A", "suplemente", None).await;
    let b = insert_product(&pool, "B", "suplemente", None).await;
    insert_image(&pool, b, "/b0.jpg", 0, true).await;
    insert_image(&pool, a, "/a2.jpg", 2, false).await;
    insert_image(&pool, a, "/a1.jpg", 1, true).await;

    let urls: Vec<String> = list_product_images(&pool)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.image_url)
        .collect();
    assert_eq!(urls, vec!["/a1.jpg", "/a2.jpg", "/b0.jpg"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn products_without_images_after_delete(pool: SqlitePool) {
    let id = insert_product(&pool, "Lonely", "suplemente", None).await;
    let image_id = insert_image(&pool, id, "/uploads/images/missing.jpg", 0, true).await;
    assert!(list_products_without_images(&pool).await.unwrap().is_empty());

    assert!(delete_product_image(&pool, image_id).await.unwrap());

    let without = list_products_without_images(&pool).await.unwrap();
    assert_eq!(without.len(), 1);
    assert_eq!(without[0].id, id);
}

#[sqlx::test(migrations = "../../migrations")]
async fn placeholder_insert_is_additive(pool: SqlitePool) {
    let bare = insert_product(&pool, "Bare", "suplemente", None).await;
    let pictured = insert_product(&pool, "Pictured", "suplemente", None).await;
    insert_image(&pool, pictured, "/uploads/images/real.jpg", 0, true).await;

    let placeholder = "/uploads/images/placeholder.png";
    assert!(insert_placeholder_image(&pool, bare, placeholder).await.unwrap());
    assert!(!insert_placeholder_image(&pool, bare, placeholder).await.unwrap());
    assert!(!insert_placeholder_image(&pool, pictured, placeholder).await.unwrap());
    assert!(!insert_placeholder_image(&pool, 9_999, placeholder).await.unwrap());

    let images = list_product_images(&pool).await.unwrap();
    assert_eq!(images.len(), 2);
    let bare_images: Vec<_> = images.iter().filter(|i| i.product_id == bare).collect();
    assert_eq!(bare_images.len(), 1);
    assert_eq!(bare_images[0].image_url, placeholder);
    assert!(bare_images[0].is_primary);
    assert_eq!(bare_images[0].sort_order, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_image_order_sets_flags(pool: SqlitePool) {
    let id = insert_product(&pool, "P", "suplemente", None).await;
    let image_id = insert_image(&pool, id, "/p.jpg", 1, false).await;

    assert!(update_image_order(&pool, image_id, 0, true).await.unwrap());
    assert!(!update_image_order(&pool, 9_999, 0, true).await.unwrap());

    let images = list_product_images(&pool).await.unwrap();
    assert_eq!(images[0].sort_order, 0);
    assert!(images[0].is_primary);
}

#[sqlx::test(migrations = "../../migrations")]
async fn orphaned_images_are_listed(pool: SqlitePool) {
    let id = insert_product(&pool, "P", "suplemente", None).await;
    insert_image(&pool, id, "/p.jpg", 0, true).await;

    // The pragma is per-connection, so both statements share one.
    let mut conn = pool.acquire().await.unwrap();
    sqlx::query("PRAGMA foreign_keys = OFF")
        .execute(&mut *conn)
        .await
        .unwrap();
    sqlx::query("INSERT INTO product_images (product_id, image_url) VALUES (424242, '/ghost.jpg')")
        .execute(&mut *conn)
        .await
        .unwrap();
    drop(conn);

    let orphans = list_orphaned_images(&pool).await.unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].image_url, "/ghost.jpg");
}
