use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    if !database_url.starts_with("sqlite:") {
        return Err(ConfigError::InvalidEnvVar {
            var: "DATABASE_URL".to_string(),
            reason: "expected a sqlite: URL".to_string(),
        });
    }

    let log_level = or_default("PHARMACAT_LOG_LEVEL", "info");
    let rules_path = PathBuf::from(or_default(
        "PHARMACAT_RULES_PATH",
        "./config/classification.yaml",
    ));
    let image_root = PathBuf::from(or_default("PHARMACAT_IMAGE_ROOT", "./public"));

    let placeholder_image = or_default(
        "PHARMACAT_PLACEHOLDER_IMAGE",
        "/uploads/images/placeholder.png",
    );
    if placeholder_image.trim().is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "PHARMACAT_PLACEHOLDER_IMAGE".to_string(),
            reason: "must be non-empty".to_string(),
        });
    }

    let sparse_threshold = or_default("PHARMACAT_SPARSE_THRESHOLD", "5")
        .parse::<usize>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: "PHARMACAT_SPARSE_THRESHOLD".to_string(),
            reason: e.to_string(),
        })?;

    let db_max_connections = parse_u32("PHARMACAT_DB_MAX_CONNECTIONS", "1")?;
    if db_max_connections == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "PHARMACAT_DB_MAX_CONNECTIONS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let db_acquire_timeout_secs = parse_u64("PHARMACAT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        log_level,
        rules_path,
        image_root,
        placeholder_image,
        sparse_threshold,
        db_max_connections,
        db_acquire_timeout_secs,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
