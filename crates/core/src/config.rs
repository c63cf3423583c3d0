use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "filemeta.db".to_string(),
        }
    }
}

/// Identities recorded on new files when the caller does not supply them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_created_by")]
    pub default_created_by: String,
    #[serde(default)]
    pub default_owner: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            default_created_by: default_created_by(),
            default_owner: None,
        }
    }
}

fn default_created_by() -> String {
    crate::store::DEFAULT_CREATED_BY.to_string()
}

/// File source first, then `FILEMETA_*` environment variables
/// (`FILEMETA_DATABASE__PATH=/var/lib/filemeta.db`).
pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("FILEMETA")
            .prefix_separator("_")
            .separator("__"),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
