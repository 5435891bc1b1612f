use thiserror::Error;

pub mod app_config;
pub mod classify;
pub mod config;
pub mod products;
pub mod rules;
pub mod taxonomy;

pub use app_config::AppConfig;
pub use classify::{Assignment, Classifier, ClassifyError, Resolution};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{is_remote_reference, Product, ProductImage};
pub use rules::{load_rules, parse_rules, ClassificationRule, Predicate, RuleSet, RulesFile, Target};
pub use taxonomy::{AssignmentIssue, CategoryConfig, Taxonomy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read rules file {path}: {source}")]
    RulesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rules file: {0}")]
    RulesFileParse(#[from] serde_yaml::Error),

    #[error("rules validation failed: {0}")]
    Validation(String),
}
