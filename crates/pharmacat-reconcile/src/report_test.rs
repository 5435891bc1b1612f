use chrono::Utc;
use pharmacat_core::CategoryConfig;

use super::*;

fn taxonomy() -> Taxonomy {
    Taxonomy::new(vec![
        CategoryConfig {
            name: "suplemente".to_string(),
            subcategories: vec!["Vitamina".to_string(), "Omega 3".to_string()],
        },
        CategoryConfig {
            name: "dermokozmetikë".to_string(),
            subcategories: vec!["Fytyre".to_string(), "Tanning".to_string()],
        },
    ])
}

fn product(id: i64, brand: Option<&str>, category: &str, subcategory: Option<&str>) -> Product {
    Product {
        id,
        name: format!("Product {id}"),
        brand: brand.map(str::to_string),
        description: None,
        category: category.to_string(),
        subcategory: subcategory.map(str::to_string),
        price: 2.5,
        created_at: Utc::now(),
    }
}

fn counts<'a>(report: &'a ConsistencyReport, category: &str) -> &'a CategoryCounts {
    report
        .categories
        .iter()
        .find(|c| c.category == category)
        .unwrap_or_else(|| panic!("category {category} missing from report"))
}

#[test]
fn empty_catalog_still_lists_every_taxonomy_subcategory() {
    let report = build_report(&taxonomy(), &[], &HashSet::new(), 5);

    let listed: usize = report
        .categories
        .iter()
        .map(|c| c.subcategories.len())
        .sum();
    assert_eq!(listed, taxonomy().subcategory_count());
    assert_eq!(report.empty_subcategories.len(), 4);
    assert!(report.sparse_subcategories.is_empty());
}

#[test]
fn categories_sort_by_name_and_subcategories_by_count() {
    let products = vec![
        product(1, Some("A"), "suplemente", Some("Omega 3")),
        product(2, Some("A"), "suplemente", Some("Omega 3")),
        product(3, Some("A"), "suplemente", Some("Vitamina")),
        product(4, Some("A"), "dermokozmetikë", Some("Tanning")),
    ];

    let report = build_report(&taxonomy(), &products, &HashSet::new(), 5);

    let names: Vec<&str> = report.categories.iter().map(|c| c.category.as_str()).collect();
    assert_eq!(names, vec!["dermokozmetikë", "suplemente"]);

    let supplements: Vec<(&str, usize)> = counts(&report, "suplemente")
        .subcategories
        .iter()
        .map(|s| (s.name.as_str(), s.count))
        .collect();
    assert_eq!(supplements, vec![("Omega 3", 2), ("Vitamina", 1)]);

    let derma: Vec<&str> = counts(&report, "dermokozmetikë")
        .subcategories
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(derma, vec!["Tanning", "Fytyre"]);
}

#[test]
fn unknown_categories_and_missing_subcategories_are_counted() {
    let products = vec![
        product(1, Some("A"), "Dermocosmetics", None),
        product(2, Some("A"), "Dermocosmetics", Some("Fytyre")),
        product(3, Some("A"), "suplemente", Some("  ")),
    ];

    let report = build_report(&taxonomy(), &products, &HashSet::new(), 5);

    let unknown: Vec<(&str, usize)> = report
        .unknown_categories()
        .map(|c| (c.category.as_str(), c.total))
        .collect();
    assert_eq!(unknown, vec![("Dermocosmetics", 2)]);

    let none_bucket = counts(&report, "suplemente")
        .subcategories
        .iter()
        .find(|s| s.name == NO_SUBCATEGORY)
        .unwrap();
    assert_eq!(none_bucket.count, 1);

    let missing: Vec<i64> = report.missing_subcategory.iter().map(|p| p.id).collect();
    assert_eq!(missing, vec![1, 3]);
    assert!(report.invalid_assignments.is_empty());
}

#[test]
fn anomalies_are_listed() {
    let products = vec![
        product(1, None, "suplemente", Some("Vitamina")),
        product(2, Some("  "), "suplemente", Some("Vitamina")),
        product(3, Some("Vichy"), "dermokozmetikë", Some("Vitamina")),
    ];
    let with_images: HashSet<i64> = [1, 3].into_iter().collect();

    let report = build_report(&taxonomy(), &products, &with_images, 1);

    let no_brand: Vec<i64> = report.missing_brand.iter().map(|p| p.id).collect();
    assert_eq!(no_brand, vec![1, 2]);
    let no_images: Vec<i64> = report.without_images.iter().map(|p| p.id).collect();
    assert_eq!(no_images, vec![2]);
    assert_eq!(report.invalid_assignments.len(), 1);
    assert_eq!(report.invalid_assignments[0].product.id, 3);
    assert_eq!(
        report.invalid_assignments[0].issue,
        AssignmentIssue::SubcategoryNotAllowed
    );
    // Vitamina holds two products, above the threshold of one.
    assert!(report
        .sparse_subcategories
        .iter()
        .all(|s| s.subcategory != "Vitamina"));
}

#[test]
fn sparse_threshold_is_inclusive() {
    let products = vec![
        product(1, Some("A"), "suplemente", Some("Vitamina")),
        product(2, Some("A"), "suplemente", Some("Vitamina")),
    ];

    let report = build_report(&taxonomy(), &products, &HashSet::new(), 2);

    assert_eq!(report.sparse_subcategories.len(), 1);
    assert_eq!(report.sparse_subcategories[0].subcategory, "Vitamina");
    assert_eq!(report.sparse_subcategories[0].count, 2);
}

#[test]
fn text_rendering_is_tab_separated() {
    let products = vec![product(1, Some("A"), "suplemente", Some("Vitamina"))];
    let with_images: HashSet<i64> = [1].into_iter().collect();

    let text = build_report(&taxonomy(), &products, &with_images, 5).to_string();

    assert!(text.starts_with("category\tsubcategory\tcount\n"));
    assert!(text.contains("suplemente\tVitamina\t1\n"));
    assert!(text.contains("dermokozmetikë\tFytyre\t0\n"));
    assert!(text.ends_with("total products: 1"));
}

#[test]
fn json_rendering_names_issues_in_snake_case() {
    let products = vec![product(1, Some("A"), "suplemente", Some("Fytyre"))];

    let json = build_report(&taxonomy(), &products, &HashSet::new(), 5)
        .to_json()
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["product_count"], 1);
    assert_eq!(
        value["invalid_assignments"][0]["issue"],
        "subcategory_not_allowed"
    );
}
