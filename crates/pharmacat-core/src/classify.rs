//! Rule evaluation for a single product.
//!
//! [`Classifier::resolve`] applies the first matching rule, then re-evaluates
//! the rules against the product's new assignment until nothing changes. The
//! assignment it returns is therefore a fixpoint of the rule set: evaluating
//! it again yields [`Resolution::Unchanged`]. Chains that revisit an earlier
//! assignment are reported as [`ClassifyError::RuleCycle`].

use serde::Serialize;
use thiserror::Error;

use crate::products::Product;
use crate::rules::{ClassificationRule, Predicate, RuleSet};
use crate::taxonomy::AssignmentIssue;

/// A `(category, subcategory)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Assignment {
    pub category: String,
    pub subcategory: Option<String>,
}

impl Assignment {
    #[must_use]
    pub fn new(category: impl Into<String>, subcategory: Option<&str>) -> Self {
        Self {
            category: category.into(),
            subcategory: subcategory.map(str::to_string),
        }
    }

    /// The product's stored assignment, with a blank subcategory read as absent.
    #[must_use]
    pub fn of(product: &Product) -> Self {
        Self::new(product.category.clone(), product.subcategory_trimmed())
    }
}

impl std::fmt::Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.subcategory {
            Some(sub) => write!(f, "{} / {sub}", self.category),
            None => write!(f, "{} / -", self.category),
        }
    }
}

/// Outcome of classifying one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The stored assignment is valid and no rule moves it.
    Unchanged,
    /// The product should move to `to`. `rule_ids` lists the rules applied,
    /// in application order.
    Reassign { to: Assignment, rule_ids: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("no rule matches and the current assignment {assignment} is invalid: {issue}")]
    Unclassifiable {
        assignment: Assignment,
        issue: AssignmentIssue,
    },

    #[error("rules form a cycle: {}", rule_ids.join(" -> "))]
    RuleCycle { rule_ids: Vec<String> },
}

/// Evaluates a [`RuleSet`] against products.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    rules: &'a RuleSet,
}

impl<'a> Classifier<'a> {
    #[must_use]
    pub fn new(rules: &'a RuleSet) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &'a RuleSet {
        self.rules
    }

    /// Resolves the assignment the rule set wants for `product`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::Unclassifiable`] when no rule applies and the
    /// stored assignment violates the taxonomy, and
    /// [`ClassifyError::RuleCycle`] when rules keep moving the product between
    /// assignments.
    pub fn resolve(&self, product: &Product) -> Result<Resolution, ClassifyError> {
        let facts = Facts::of(product);
        let start = Assignment::of(product);
        let mut current = start.clone();
        let mut visited = vec![start.clone()];
        let mut applied: Vec<String> = Vec::new();

        // Every iteration either stops or records a new assignment. Rule targets
        // and the starting subcategory form a finite set, so this terminates.
        loop {
            let Some(rule) = self.first_match(&facts, &current) else {
                break;
            };
            let next = self.apply(rule, &current);
            if next == current {
                break;
            }
            applied.push(rule.id.clone());
            if visited.contains(&next) {
                return Err(ClassifyError::RuleCycle { rule_ids: applied });
            }
            visited.push(next.clone());
            current = next;
        }

        if current == start {
            return match self
                .rules
                .taxonomy
                .check(&current.category, current.subcategory.as_deref())
            {
                Ok(()) => Ok(Resolution::Unchanged),
                Err(issue) => Err(ClassifyError::Unclassifiable {
                    assignment: current,
                    issue,
                }),
            };
        }

        Ok(Resolution::Reassign {
            to: current,
            rule_ids: applied,
        })
    }

    /// The first rule, in declared order, whose predicate holds.
    #[must_use]
    pub fn first_match_for(&self, product: &Product) -> Option<&'a ClassificationRule> {
        self.first_match(&Facts::of(product), &Assignment::of(product))
    }

    fn first_match(
        &self,
        facts: &Facts,
        assignment: &Assignment,
    ) -> Option<&'a ClassificationRule> {
        self.rules
            .rules
            .iter()
            .find(|rule| predicate_matches(&rule.when, facts, assignment))
    }

    fn apply(&self, rule: &ClassificationRule, current: &Assignment) -> Assignment {
        let target = &rule.then;
        let subcategory = match &target.subcategory {
            Some(sub) => Some(sub.clone()),
            None => current
                .subcategory
                .clone()
                .filter(|sub| self.rules.taxonomy.allows(&target.category, Some(sub.as_str()))),
        };
        Assignment {
            category: target.category.clone(),
            subcategory,
        }
    }
}

/// Lower-cased product text used for matching.
struct Facts {
    name: String,
    brand: Option<String>,
    description: Option<String>,
}

impl Facts {
    fn of(product: &Product) -> Self {
        Self {
            name: product.name.to_lowercase(),
            brand: product.brand_trimmed().map(str::to_lowercase),
            description: product
                .description
                .as_deref()
                .map(str::to_lowercase),
        }
    }
}

fn predicate_matches(predicate: &Predicate, facts: &Facts, assignment: &Assignment) -> bool {
    contains_any(Some(facts.name.as_str()), &predicate.name_contains)
        && predicate
            .name_contains_all
            .iter()
            .all(|n| facts.name.contains(n.as_str()))
        && contains_any(facts.brand.as_deref(), &predicate.brand_contains)
        && equals_any(facts.brand.as_deref(), &predicate.brand_is)
        && contains_any(facts.description.as_deref(), &predicate.description_contains)
        && equals_any(Some(assignment.category.as_str()), &predicate.category_is)
        && equals_any(assignment.subcategory.as_deref(), &predicate.subcategory_is)
}

/// Substring test; an empty keyword list imposes no condition.
fn contains_any(haystack: Option<&str>, needles: &[String]) -> bool {
    needles.is_empty()
        || haystack.is_some_and(|h| needles.iter().any(|n| h.contains(n.as_str())))
}

/// Exact test after trim and lower-casing; an empty list imposes no condition.
fn equals_any(value: Option<&str>, candidates: &[String]) -> bool {
    candidates.is_empty()
        || value.is_some_and(|v| {
            let v = v.trim().to_lowercase();
            candidates.iter().any(|c| *c == v)
        })
}

#[cfg(test)]
#[path = "classify_test.rs"]
mod tests;
