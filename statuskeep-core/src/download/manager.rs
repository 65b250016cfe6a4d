use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::download::registrar::FileRegistrar;
use crate::error::{CopyFailure, CopyStage};
use crate::index::MediaIndex;
use crate::paths::SaveDirectory;
use crate::refresh::trigger::RefreshTrigger;
use crate::types::{StatusItem, StatusLocation};

/// Copies statuses into the save directory.
///
/// A copy either lands complete under its base name or leaves nothing
/// behind. On success the new file is handed to the registrar in a detached
/// task and a refresh is requested; on failure neither happens.
///
/// Copies always go through the host filesystem (`std::fs`), never the
/// injected [`FileSystem`](crate::FileSystem). Pair it with `RealFs` so the
/// downloaded flag sees what was written.
#[derive(Clone)]
pub struct DownloadManager {
    save_dir: SaveDirectory,
    index: Arc<dyn MediaIndex>,
    registrar: Arc<dyn FileRegistrar>,
    trigger: RefreshTrigger,
}

impl fmt::Debug for DownloadManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadManager")
            .field("save_dir", &self.save_dir)
            .finish()
    }
}

impl DownloadManager {
    pub fn new(
        save_dir: SaveDirectory,
        index: Arc<dyn MediaIndex>,
        registrar: Arc<dyn FileRegistrar>,
        trigger: RefreshTrigger,
    ) -> Self {
        Self {
            save_dir,
            index,
            registrar,
            trigger,
        }
    }

    /// Copy `item` into the save directory, returning the saved path.
    ///
    /// An existing file with the same name is replaced.
    pub async fn download(
        &self,
        item: &StatusItem,
    ) -> Result<PathBuf, CopyFailure> {
        let source = self.resolve(&item.location).await?;
        let name = source
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_owned)
            .ok_or_else(|| CopyFailure::MissingFileName {
                location: item.location.to_string(),
            })?;
        if item.downloaded {
            debug!(name, "overwriting previously saved status");
        }

        let save_dir = self.save_dir.path().to_path_buf();
        let copy_source = source.clone();
        let saved = tokio::task::spawn_blocking(move || {
            copy_atomically(&copy_source, &save_dir, &name)
        })
        .await
        .map_err(|err| CopyFailure::Interrupted(err.to_string()))?
        .inspect_err(|err| {
            error!(source = %source.display(), error = %err, "download failed");
        })?;

        info!(
            source = %source.display(),
            saved = %saved.display(),
            "saved status"
        );
        self.register_detached(saved.clone());
        self.trigger.request();
        Ok(saved)
    }

    async fn resolve(
        &self,
        location: &StatusLocation,
    ) -> Result<PathBuf, CopyFailure> {
        let reference = match location {
            StatusLocation::File(path) => return Ok(path.clone()),
            StatusLocation::Indexed(reference) => reference,
        };
        match self.index.resolve_path(reference).await {
            Ok(Some(path)) => Ok(path),
            Ok(None) => Err(CopyFailure::Unresolvable {
                location: location.to_string(),
            }),
            Err(err) => {
                warn!(
                    %reference,
                    error = %err,
                    "media index could not resolve status"
                );
                Err(CopyFailure::Unresolvable {
                    location: location.to_string(),
                })
            }
        }
    }

    fn register_detached(&self, saved: PathBuf) {
        let registrar = Arc::clone(&self.registrar);
        tokio::spawn(async move {
            match registrar.register_new_file(&saved).await {
                Ok(()) => {
                    debug!(path = %saved.display(), "registered saved status")
                }
                Err(err) => debug!(
                    path = %saved.display(),
                    error = %err,
                    "media registration failed; ignoring"
                ),
            }
        });
    }
}

/// Stage into a hidden sibling temp file, fsync, then rename over the
/// destination. The temp file is removed on every error path, and nothing
/// is created when the source cannot be opened.
fn copy_atomically(
    source: &Path,
    save_dir: &Path,
    name: &str,
) -> Result<PathBuf, CopyFailure> {
    let mut input = File::open(source)
        .map_err(|err| CopyFailure::io(CopyStage::OpenSource, source, err))?;
    std::fs::create_dir_all(save_dir).map_err(|err| {
        CopyFailure::io(CopyStage::PrepareSaveDirectory, save_dir, err)
    })?;
    let mut staged = tempfile::Builder::new()
        .prefix(".statuskeep-")
        .suffix(".part")
        .tempfile_in(save_dir)
        .map_err(|err| {
            CopyFailure::io(CopyStage::StageTemporary, save_dir, err)
        })?;

    io::copy(&mut input, staged.as_file_mut())
        .map_err(|err| CopyFailure::io(CopyStage::CopyBytes, source, err))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|err| {
            CopyFailure::io(CopyStage::Flush, staged.path(), err)
        })?;

    let destination = save_dir.join(name);
    staged
        .persist(&destination)
        .map_err(|err| {
            CopyFailure::io(CopyStage::Commit, &destination, err.error)
        })?;

    // Directory fsync is best-effort.
    if let Ok(dir) = File::open(save_dir) {
        let _ = dir.sync_all();
    }
    Ok(destination)
}
