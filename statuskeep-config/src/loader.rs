use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tracing::{debug, info};

use crate::error::ConfigLoadError;
use crate::models::{ConfigSource, ConfigWarnings, SaverConfig};

pub const CONFIG_PATH_VAR: &str = "STATUSKEEP_CONFIG_PATH";
pub const CONFIG_JSON_VAR: &str = "STATUSKEEP_CONFIG_JSON";
pub const STORAGE_ROOT_VAR: &str = "STATUSKEEP_STORAGE_ROOT";
pub const MANAGE_ALL_FILES_VAR: &str = "STATUSKEEP_MANAGE_ALL_FILES";

const DEFAULT_CONFIG_LOCATIONS: &[&str] = &[
    "statuskeep.toml",
    "statuskeep.json",
    "config/statuskeep.toml",
];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    /// Directory the default file names are looked up in. Defaults to the
    /// working directory.
    pub search_dir: Option<PathBuf>,
}

/// Result of a load: the config plus how it was assembled.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: SaverConfig,
    pub source: ConfigSource,
    pub env_file_loaded: bool,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn with_search_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.options.search_dir = Some(dir.into());
        self
    }

    /// Load `.env`, then resolve the config against the process
    /// environment.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = self.load_env_file()?;
        let mut load = self.load_with_env(|key| env::var(key).ok())?;
        load.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Evaluation order:
    /// 1) an explicit path from the options,
    /// 2) `$STATUSKEEP_CONFIG_PATH` (TOML or JSON file),
    /// 3) `$STATUSKEEP_CONFIG_JSON` (inline JSON),
    /// 4) the first default file that exists,
    /// 5) defaults.
    ///
    /// `$STATUSKEEP_STORAGE_ROOT` and `$STATUSKEEP_MANAGE_ALL_FILES` are
    /// applied on top of whichever source won.
    pub fn load_with_env<F>(
        &self,
        lookup: F,
    ) -> Result<ConfigLoad, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let explicit = self.options.config_path.as_ref();
        let (mut config, source) = if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigLoadError::MissingConfig {
                    path: path.clone(),
                });
            }
            (load_from_file(path)?, ConfigSource::Explicit(path.clone()))
        } else if let Some(raw) = var(CONFIG_PATH_VAR) {
            let path = PathBuf::from(raw);
            if !path.exists() {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            (load_from_file(&path)?, ConfigSource::EnvPath(path))
        } else if let Some(raw) = var(CONFIG_JSON_VAR) {
            (parse_json(&raw, CONFIG_JSON_VAR)?, ConfigSource::EnvInline)
        } else if let Some(path) = self.find_default_file() {
            (load_from_file(&path)?, ConfigSource::File(path))
        } else {
            (SaverConfig::default(), ConfigSource::Default)
        };

        if let Some(root) = var(STORAGE_ROOT_VAR) {
            debug!(root = %root, "storage root overridden by environment");
            config.settings.storage_root = PathBuf::from(root);
        }
        if let Some(raw) = var(MANAGE_ALL_FILES_VAR) {
            config.manage_all_files =
                parse_flag(MANAGE_ALL_FILES_VAR, &raw)?;
        }

        info!(
            source = ?source,
            root = %config.settings.storage_root.display(),
            "loaded configuration"
        );
        let warnings = config.warnings();
        Ok(ConfigLoad {
            config,
            source,
            env_file_loaded: false,
            warnings,
        })
    }

    fn load_env_file(&self) -> Result<bool, ConfigLoadError> {
        let loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true),
            None => dotenvy::dotenv().map(|_| true),
        };
        // A missing .env is normal.
        loaded.or_else(|err| match err {
            dotenvy::Error::Io(_) => Ok(false),
            _ => Err(err.into()),
        })
    }

    fn find_default_file(&self) -> Option<PathBuf> {
        let base = self.options.search_dir.clone().unwrap_or_default();
        DEFAULT_CONFIG_LOCATIONS
            .iter()
            .map(|candidate| base.join(candidate))
            .find(|path| path.exists())
    }
}

pub fn load_from_file(path: &Path) -> Result<SaverConfig, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let origin = path.display().to_string();

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json(&contents, &origin),
        Some("toml") | Some("tml") => {
            toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                origin,
                source: anyhow!(err),
            })
        }
        _ => parse_from_str(&contents, &origin),
    }
}

pub fn parse_from_str(
    contents: &str,
    origin: &str,
) -> Result<SaverConfig, ConfigLoadError> {
    // TOML first, then JSON.
    toml::from_str(contents).or_else(|toml_err| {
        serde_json::from_str(contents).map_err(|json_err| {
            ConfigLoadError::Parse {
                origin: origin.to_owned(),
                source: anyhow!(
                    "toml error: {toml_err}; json error: {json_err}"
                ),
            }
        })
    })
}

fn parse_json(
    raw: &str,
    origin: &str,
) -> Result<SaverConfig, ConfigLoadError> {
    serde_json::from_str(raw).map_err(|err| ConfigLoadError::Parse {
        origin: origin.to_owned(),
        source: anyhow!(err),
    })
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigLoadError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigLoadError::InvalidOverride {
            key,
            value: raw.to_owned(),
        }),
    }
}
