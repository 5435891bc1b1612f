//! Loading and validation of the classification rule file.
//!
//! The file declares the taxonomy and an ordered list of rules. Rules are
//! evaluated top to bottom and the first match wins, so the order in the
//! file is the priority order.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::taxonomy::{CategoryConfig, Taxonomy};
use crate::ConfigError;

/// Rule file format version understood by this build.
pub const SUPPORTED_RULES_VERSION: u32 = 1;

/// Raw contents of the rule file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesFile {
    pub version: u32,
    pub taxonomy: Vec<CategoryConfig>,
    #[serde(default)]
    pub rules: Vec<ClassificationRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassificationRule {
    pub id: String,
    pub when: Predicate,
    pub then: Target,
}

/// Conditions a product must satisfy for a rule to match.
///
/// Every non-empty field must hold (AND). Within one field any keyword may
/// match (OR), except `name_contains_all` which needs every keyword. All
/// comparisons are case-insensitive; `*_contains` fields are substring tests,
/// `*_is` fields are exact comparisons after trimming.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Predicate {
    #[serde(default)]
    pub name_contains: Vec<String>,
    #[serde(default)]
    pub name_contains_all: Vec<String>,
    #[serde(default)]
    pub brand_contains: Vec<String>,
    #[serde(default)]
    pub brand_is: Vec<String>,
    #[serde(default)]
    pub description_contains: Vec<String>,
    #[serde(default)]
    pub category_is: Vec<String>,
    #[serde(default)]
    pub subcategory_is: Vec<String>,
}

impl Predicate {
    fn fields(&self) -> [(&'static str, &Vec<String>); 7] {
        [
            ("name_contains", &self.name_contains),
            ("name_contains_all", &self.name_contains_all),
            ("brand_contains", &self.brand_contains),
            ("brand_is", &self.brand_is),
            ("description_contains", &self.description_contains),
            ("category_is", &self.category_is),
            ("subcategory_is", &self.subcategory_is),
        ]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, values)| values.is_empty())
    }

    /// Lower-cases and trims every keyword so matching can compare directly.
    fn normalized(&self) -> Self {
        let norm = |values: &[String]| -> Vec<String> {
            values.iter().map(|v| v.trim().to_lowercase()).collect()
        };
        Self {
            name_contains: norm(&self.name_contains),
            name_contains_all: norm(&self.name_contains_all),
            brand_contains: norm(&self.brand_contains),
            brand_is: norm(&self.brand_is),
            description_contains: norm(&self.description_contains),
            category_is: norm(&self.category_is),
            subcategory_is: norm(&self.subcategory_is),
        }
    }
}

/// Where a matching rule sends the product.
///
/// When `subcategory` is omitted the product keeps its current subcategory if
/// the target category allows it, and loses it otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
}

/// A validated rule file, ready for classification.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub version: u32,
    pub taxonomy: Taxonomy,
    /// Rules in priority order with keywords already normalized.
    pub rules: Vec<ClassificationRule>,
}

impl RuleSet {
    /// Validates a parsed rule file and normalizes its keywords.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first problem found.
    pub fn from_file(file: RulesFile) -> Result<Self, ConfigError> {
        validate_rules(&file)?;

        let rules = file
            .rules
            .into_iter()
            .map(|rule| ClassificationRule {
                when: rule.when.normalized(),
                ..rule
            })
            .collect();

        Ok(Self {
            version: file.version,
            taxonomy: Taxonomy::new(file.taxonomy),
            rules,
        })
    }
}

/// Load and validate the rule set from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_rules(path: &Path) -> Result<RuleSet, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RulesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_rules(&content)
}

/// Parse and validate a rule set from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the text cannot be parsed or fails validation.
pub fn parse_rules(content: &str) -> Result<RuleSet, ConfigError> {
    let file: RulesFile = serde_yaml::from_str(content)?;
    RuleSet::from_file(file)
}

fn validate_rules(file: &RulesFile) -> Result<(), ConfigError> {
    if file.version != SUPPORTED_RULES_VERSION {
        return Err(ConfigError::Validation(format!(
            "unsupported rules version {}; expected {SUPPORTED_RULES_VERSION}",
            file.version
        )));
    }

    if file.taxonomy.is_empty() {
        return Err(ConfigError::Validation(
            "taxonomy must declare at least one category".to_string(),
        ));
    }

    let mut seen_categories = HashSet::new();
    for category in &file.taxonomy {
        if category.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category name must be non-empty".to_string(),
            ));
        }
        if category.name.trim() != category.name {
            return Err(ConfigError::Validation(format!(
                "category '{}' has surrounding whitespace",
                category.name
            )));
        }
        if !seen_categories.insert(category.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category: '{}'",
                category.name
            )));
        }

        let mut seen_subcategories = HashSet::new();
        for sub in &category.subcategories {
            if sub.trim().is_empty() || sub.trim() != sub {
                return Err(ConfigError::Validation(format!(
                    "category '{}' has a blank or padded subcategory '{sub}'",
                    category.name
                )));
            }
            if !seen_subcategories.insert(sub.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate subcategory '{sub}' in category '{}'",
                    category.name
                )));
            }
        }
    }

    let taxonomy = Taxonomy::new(file.taxonomy.clone());
    let mut seen_rule_ids = HashSet::new();
    for rule in &file.rules {
        if rule.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "rule id must be non-empty".to_string(),
            ));
        }
        if !seen_rule_ids.insert(rule.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate rule id: '{}'",
                rule.id
            )));
        }
        if rule.when.is_empty() {
            return Err(ConfigError::Validation(format!(
                "rule '{}' has an empty predicate and would match every product",
                rule.id
            )));
        }
        for (field, values) in rule.when.fields() {
            if values.iter().any(|v| v.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "rule '{}' has a blank keyword in {field}",
                    rule.id
                )));
            }
        }
        if let Err(issue) = taxonomy.check(&rule.then.category, rule.then.subcategory.as_deref()) {
            return Err(ConfigError::Validation(format!(
                "rule '{}' targets {} / {}: {issue}",
                rule.id,
                rule.then.category,
                rule.then.subcategory.as_deref().unwrap_or("-")
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "rules_test.rs"]
mod tests;
