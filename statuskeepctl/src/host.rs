//! Adapters for running against a plain storage tree, with no platform
//! package manager, permission service or media catalogue behind it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use statuskeep_core::{
    FileRegistrar, IndexedMedia, InstalledPackages, MediaIndex,
    MediaIndexRef, MediaKind, PathEpoch, SourcePath, StatusError, Vendor,
};
use tracing::{debug, info};

/// Treat a vendor as installed when any of its status directories, or
/// their app folder, exists under `root`.
pub fn detect_installed(root: &Path) -> InstalledPackages {
    let found: Vec<Vendor> = Vendor::ALL
        .into_iter()
        .filter(|vendor| {
            [PathEpoch::Modern, PathEpoch::Legacy].into_iter().any(|epoch| {
                let source = SourcePath::new(root, *vendor, epoch);
                app_folder(source.path()).is_some_and(|dir| dir.is_dir())
            })
        })
        .collect();
    debug!(
        root = %root.display(),
        vendors = ?found,
        "detected installed vendors from tree"
    );
    InstalledPackages::vendors(&found)
}

/// `<app>/Media/.Statuses` -> `<app>`.
fn app_folder(statuses: &Path) -> Option<PathBuf> {
    statuses
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
}

/// Stand-in for hosts with no media catalogue. Queries fail the way an
/// unreachable platform index would.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMediaIndex;

#[async_trait]
impl MediaIndex for NoMediaIndex {
    async fn query_by_path_prefix_and_time(
        &self,
        prefix: &Path,
        _since: DateTime<Utc>,
        kind: MediaKind,
    ) -> statuskeep_core::Result<Vec<IndexedMedia>> {
        Err(StatusError::QueryFailure {
            prefix: prefix.to_path_buf(),
            kind,
            reason: "no media index on this host".to_owned(),
        })
    }

    async fn resolve_path(
        &self,
        _reference: &MediaIndexRef,
    ) -> statuskeep_core::Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Logs saved files instead of handing them to a media scanner.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingRegistrar;

#[async_trait]
impl FileRegistrar for LoggingRegistrar {
    async fn register_new_file(
        &self,
        path: &Path,
    ) -> statuskeep_core::Result<()> {
        info!(path = %path.display(), "saved file ready for indexing");
        Ok(())
    }
}
