use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use statuskeep_core::{SaverSettings, StaticAccess};

/// Where the loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    Explicit(PathBuf),
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Host configuration: engine settings plus the answers a host without a
/// platform permission or package manager has to supply itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SaverConfig {
    #[serde(flatten)]
    pub settings: SaverSettings,
    /// Package identifiers to treat as installed. `None` means detect them
    /// from the storage tree.
    pub installed_packages: Option<Vec<String>>,
    pub broad_read: bool,
    /// Allows the media index fallback.
    pub manage_all_files: bool,
    /// `tracing` filter directive; `RUST_LOG` wins when set.
    pub log_filter: Option<String>,
}

impl Default for SaverConfig {
    fn default() -> Self {
        Self {
            settings: SaverSettings::default(),
            installed_packages: None,
            broad_read: true,
            manage_all_files: false,
            log_filter: None,
        }
    }
}

impl SaverConfig {
    pub fn access(&self) -> StaticAccess {
        StaticAccess {
            broad_read: self.broad_read,
            manage_all_files: self.manage_all_files,
        }
    }

    /// Non-fatal observations about the loaded values.
    pub fn warnings(&self) -> ConfigWarnings {
        let mut warnings = ConfigWarnings::default();
        if self.settings.storage_root.is_relative() {
            warnings.push_with_hint(
                format!(
                    "storage_root {} is relative",
                    self.settings.storage_root.display()
                ),
                "paths resolve against the working directory",
            );
        }
        if self.settings.io_timeout_ms == 0 {
            warnings.push("io_timeout_ms is 0; using 1ms");
        }
        if self.settings.index_query_timeout_ms == 0 {
            warnings.push("index_query_timeout_ms is 0; using 1ms");
        }
        if self
            .installed_packages
            .as_ref()
            .is_some_and(|packages| packages.is_empty())
        {
            warnings.push_with_hint(
                "installed_packages is empty; no source paths will resolve",
                "remove the key to detect installed apps from the tree",
            );
        }
        if self.manage_all_files && !self.broad_read {
            warnings.push("manage_all_files granted without broad_read");
        }
        warnings
    }
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
