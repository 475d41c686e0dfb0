use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DATABASE: &str = "cognivault.db";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 5 * 1024 * 1024;

/// Contents of `cognivault.toml`. Every field is optional; unset fields fall
/// back to the defaults above.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CognivaultConfig {
    pub database: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub fetch_timeout_secs: Option<u64>,
    pub max_content_bytes: Option<usize>,
    /// Deleting a collection that does not exist is a 404 instead of a no-op
    pub strict_deletes: Option<bool>,
}

/// Fully resolved server settings
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub database: PathBuf,
    pub host: String,
    pub port: u16,
    pub fetch_timeout: Duration,
    pub max_content_bytes: usize,
    pub strict_deletes: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        CognivaultConfig::default().resolve()
    }
}

impl CognivaultConfig {
    /// A config with every default spelled out, as written by `init`
    pub fn with_defaults() -> Self {
        Self {
            database: Some(DEFAULT_DATABASE.to_string()),
            host: Some(DEFAULT_HOST.to_string()),
            port: Some(DEFAULT_PORT),
            fetch_timeout_secs: Some(DEFAULT_FETCH_TIMEOUT_SECS),
            max_content_bytes: Some(DEFAULT_MAX_CONTENT_BYTES),
            strict_deletes: Some(false),
        }
    }

    pub fn resolve(&self) -> ServerSettings {
        ServerSettings {
            database: PathBuf::from(self.database.as_deref().unwrap_or(DEFAULT_DATABASE)),
            host: self.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            fetch_timeout: Duration::from_secs(
                self.fetch_timeout_secs.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            ),
            max_content_bytes: self.max_content_bytes.unwrap_or(DEFAULT_MAX_CONTENT_BYTES),
            strict_deletes: self.strict_deletes.unwrap_or(false),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("cognivault.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<CognivaultConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: CognivaultConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &CognivaultConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
