use chrono::Utc;
use pharmacat_core::parse_rules;

use super::*;

const RULES: &str = r"
version: 1
taxonomy:
  - name: dermokozmetikë
    subcategories: [Fytyre, Tanning]
  - name: produkte mjekësore
    subcategories: [Aparat mjeksore]
rules:
  - id: devices
    when:
      name_contains: [ihealth]
    then:
      category: produkte mjekësore
      subcategory: Aparat mjeksore
  - id: legacy-spelling
    when:
      category_is: [dermocosmetics]
    then:
      category: dermokozmetikë
";

fn product(id: i64, name: &str, category: &str, subcategory: Option<&str>) -> Product {
    Product {
        id,
        name: name.to_string(),
        brand: None,
        description: None,
        category: category.to_string(),
        subcategory: subcategory.map(str::to_string),
        price: 1.0,
        created_at: Utc::now(),
    }
}

#[test]
fn plan_lists_only_products_that_move() {
    let rules = parse_rules(RULES).unwrap();
    let products = vec![
        product(1, "iHealth Wave", "dermokozmetikë", Some("Tanning")),
        product(2, "Sun Fluid", "dermokozmetikë", Some("Tanning")),
        product(3, "Gel", "Dermocosmetics", Some("Fytyre")),
    ];

    let plan = plan_reclassification(&rules, &products);

    assert_eq!(plan.unchanged, 1);
    assert!(plan.failures.is_empty());
    assert_eq!(plan.moves.len(), 2);
    assert_eq!(plan.moves[0].product_id, 1);
    assert_eq!(plan.moves[0].rule_ids, vec!["devices".to_string()]);
    assert_eq!(
        plan.moves[1].to,
        Assignment::new("dermokozmetikë", Some("Fytyre"))
    );
}

#[test]
fn plan_keeps_stored_values_as_guard() {
    let rules = parse_rules(RULES).unwrap();
    let products = vec![product(7, "Gel", "Dermocosmetics", None)];

    let plan = plan_reclassification(&rules, &products);

    assert_eq!(
        plan.moves[0].from,
        Assignment::new("Dermocosmetics", None)
    );
}

#[test]
fn plan_reports_invalid_rows_without_moving_them() {
    let rules = parse_rules(RULES).unwrap();
    let products = vec![
        product(1, "Mystery", "unknown shelf", None),
        product(2, "Cream", "dermokozmetikë", Some("Aparat mjeksore")),
    ];

    let plan = plan_reclassification(&rules, &products);

    assert!(plan.moves.is_empty());
    assert_eq!(plan.failures.len(), 2);
    assert!(plan
        .failures
        .iter()
        .all(|f| f.kind == FailureKind::Validation));
}

#[test]
fn plan_trims_padded_subcategory() {
    let rules = parse_rules(RULES).unwrap();
    let products = vec![
        product(1, "Cream", "dermokozmetikë", Some(" Fytyre ")),
        product(2, "Cream", "dermokozmetikë", Some("  ")),
    ];

    let plan = plan_reclassification(&rules, &products);

    assert_eq!(plan.moves.len(), 2);
    assert!(plan.moves.iter().all(|m| m.rule_ids.is_empty()));
    assert_eq!(plan.moves[0].to, Assignment::new("dermokozmetikë", Some("Fytyre")));
    assert_eq!(plan.moves[1].to, Assignment::new("dermokozmetikë", None));
}

#[test]
fn planning_the_planned_state_is_empty() {
    let rules = parse_rules(RULES).unwrap();
    let products = vec![
        product(1, "iHealth Wave", "dermokozmetikë", Some("Tanning")),
        product(2, "Gel", "Dermocosmetics", None),
    ];

    let plan = plan_reclassification(&rules, &products);
    let settled: Vec<Product> = products
        .into_iter()
        .zip(&plan.moves)
        .map(|(mut p, mv)| {
            p.category.clone_from(&mv.to.category);
            p.subcategory.clone_from(&mv.to.subcategory);
            p
        })
        .collect();

    let second = plan_reclassification(&rules, &settled);
    assert!(second.moves.is_empty());
    assert_eq!(second.unchanged, 2);
}
