use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `sqlite://` URL of the catalog database.
    pub database_url: String,
    pub log_level: String,
    /// Versioned classification rule set (YAML).
    pub rules_path: PathBuf,
    /// Directory that image references such as `/uploads/images/x.jpg` are
    /// resolved against.
    pub image_root: PathBuf,
    /// Sentinel reference inserted for products that have no image.
    pub placeholder_image: String,
    /// Subcategories with this many products or fewer are flagged as sparse.
    pub sparse_threshold: usize,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
}
