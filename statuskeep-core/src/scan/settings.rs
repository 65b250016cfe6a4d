//! Scanner defaults shared by the directory scan and the index fallback.
//!
//! Keeping the extension lists in one place keeps classification identical
//! no matter which strategy discovered a file.
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::paths::SaveDirectory;

pub const IMAGE_FILE_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

pub const VIDEO_FILE_EXTENSIONS: &[&str] = &["mp4"];

/// Default bound for one filesystem call.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Trailing eligibility window, inclusive at exactly 24 hours.
pub const RECENCY_WINDOW: TimeDelta = TimeDelta::hours(24);

/// Whether a file stamped at `stamp` is still eligible at `now`.
///
/// Stamps in the future count as recent.
pub fn is_recent(stamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(stamp) <= RECENCY_WINDOW
}

/// Oldest stamp still inside the window at `now`.
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - RECENCY_WINDOW
}

/// Runtime knobs for the discovery engine.
///
/// All fields carry defaults so partial configuration payloads stay valid.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SaverSettings {
    /// Root of shared storage; source paths and the save directory live
    /// under it.
    pub storage_root: PathBuf,
    /// Upper bound for any single filesystem call: directory opens, entry
    /// reads, metadata, existence checks and save directory creation.
    pub io_timeout_ms: u64,
    /// Upper bound for one media index query.
    pub index_query_timeout_ms: u64,
}

impl Default for SaverSettings {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("/storage/emulated/0"),
            io_timeout_ms: DEFAULT_IO_TIMEOUT.as_millis() as u64,
            index_query_timeout_ms: 10_000,
        }
    }
}

impl SaverSettings {
    pub fn with_storage_root(root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: root.into(),
            ..Self::default()
        }
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms.max(1))
    }

    pub fn index_query_timeout(&self) -> Duration {
        Duration::from_millis(self.index_query_timeout_ms.max(1))
    }

    pub fn save_directory(&self) -> SaveDirectory {
        SaveDirectory::under(&self.storage_root)
    }
}
