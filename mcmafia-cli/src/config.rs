//! CLI configuration loaded with figment
//!
//! Sources are merged in precedence order (later sources override earlier ones):
//! 1. Default values
//! 2. `mcmafia.toml`, `mcmafia.yaml`/`.yml` or `mcmafia.json` in the working
//!    directory, or an explicit `--config` file
//! 3. Environment variables with the `MCMAFIA_` prefix
//! 4. Command line overrides

use clap::ValueEnum;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "MCMAFIA_";

/// File stem searched for in the working directory
pub const CONFIG_FILE_STEM: &str = "mcmafia";

/// On-disk format of the member store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreFormat {
    #[default]
    Json,
    Yaml,
}

impl StoreFormat {
    /// Format implied by a file extension, if any
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(StoreFormat::Json),
            "yaml" | "yml" => Some(StoreFormat::Yaml),
            _ => None,
        }
    }
}

impl std::fmt::Display for StoreFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreFormat::Json => write!(f, "json"),
            StoreFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// Resolved CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Member store file
    pub store: PathBuf,
    /// Member store format
    pub format: StoreFormat,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Payload field used to label members in `draw`
    pub render_label: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            store: PathBuf::from("members.json"),
            format: StoreFormat::Json,
            log_level: "warn".to_string(),
            render_label: "id".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist
    #[error("configuration file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    /// The config file extension is not one we can parse
    #[error("unsupported configuration format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    /// Figment failed to merge or extract the configuration
    #[error("invalid configuration: {0}")]
    Figment(#[from] figment::Error),
}

/// Command line values that override every other source
#[derive(Debug, Default, Serialize)]
struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<StoreFormat>,
}

/// Loads [`CliConfig`] from all configuration sources
#[derive(Debug)]
pub struct ConfigLoader {
    dir: PathBuf,
    file: Option<PathBuf>,
    overrides: Overrides,
}

impl ConfigLoader {
    /// Loader rooted at the process working directory
    pub fn new() -> Self {
        Self::in_dir(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Loader that discovers config files in `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            file: None,
            overrides: Overrides::default(),
        }
    }

    /// Use an explicit config file instead of discovery
    pub fn with_file(mut self, file: Option<PathBuf>) -> Self {
        self.file = file;
        self
    }

    pub fn with_store(mut self, store: Option<PathBuf>) -> Self {
        self.overrides.store = store;
        self
    }

    pub fn with_format(mut self, format: Option<StoreFormat>) -> Self {
        self.overrides.format = format;
        self
    }

    /// Merge every source and extract the configuration
    pub fn load(&self) -> Result<CliConfig, ConfigError> {
        let config: CliConfig = self.figment()?.extract()?;
        debug!(
            store = %config.store.display(),
            format = %config.format,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Build the figment with all sources in precedence order
    pub fn figment(&self) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(CliConfig::default()));

        for file in self.config_files()? {
            trace!(path = %file.display(), "Merging config file");
            figment = figment.merge(file_provider(&file)?);
        }

        Ok(figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(&self.overrides)))
    }

    fn config_files(&self) -> Result<Vec<PathBuf>, ConfigError> {
        if let Some(file) = &self.file {
            if !file.is_file() {
                return Err(ConfigError::MissingFile { path: file.clone() });
            }
            return Ok(vec![file.clone()]);
        }

        Ok(["toml", "yaml", "yml", "json"]
            .iter()
            .map(|ext| self.dir.join(format!("{CONFIG_FILE_STEM}.{ext}")))
            .filter(|path| path.is_file())
            .collect())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn file_provider(path: &Path) -> Result<Figment, ConfigError> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("toml") => Ok(Figment::from(Toml::file(path))),
        Some("yaml") | Some("yml") => Ok(Figment::from(Yaml::file(path))),
        Some("json") => Ok(Figment::from(Json::file(path))),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}
