use config::{Config, ConfigError, Environment, File as ConfigFile};
use directories::BaseDirs;
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_DATABASE_PATH: &str = "~/.prot.sql";
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_path: String,
    pub chunk_size: usize,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            ignore_patterns: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Database location with a leading `~` replaced by the user's home directory.
    pub fn resolved_database_path(&self) -> PathBuf {
        expand_home(&self.database_path)
    }
}

/// Defaults, then an optional `saprotect.{toml,yaml,json}` next to the working
/// directory, then `SAPROTECT_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .set_default("database_path", DEFAULT_DATABASE_PATH)?
        .set_default("chunk_size", DEFAULT_CHUNK_SIZE as u64)?
        .add_source(ConfigFile::with_name("saprotect").required(false))
        .add_source(
            Environment::with_prefix("SAPROTECT")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    let config = builder.try_deserialize::<AppConfig>()?;
    if config.chunk_size == 0 {
        return Err(ConfigError::Message(
            "chunk_size must be greater than zero".to_string(),
        ));
    }
    Ok(config)
}

pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => rest,
        _ => return PathBuf::from(path),
    };
    match BaseDirs::new() {
        Some(dirs) => dirs
            .home_dir()
            .join(rest.trim_start_matches(['/', '\\'])),
        None => PathBuf::from(path),
    }
}
