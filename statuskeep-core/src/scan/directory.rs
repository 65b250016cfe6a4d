//! Direct listing of a source directory.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::Stream;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::download::state::DownloadStateTracker;
use crate::error::{Result, StatusError};
use crate::scan::fs::{FileSystem, ReadDirStream};
use crate::scan::settings::is_recent;
use crate::types::{MediaKind, StatusItem, StatusLocation};

/// Lazy, finite, single-use sequence of statuses from one directory.
pub type ScanStream = Pin<Box<dyn Stream<Item = StatusItem> + Send>>;

/// Lists a directory and keeps recent images and videos.
#[derive(Clone)]
pub struct DirectoryScanner {
    fs: Arc<dyn FileSystem>,
    tracker: DownloadStateTracker,
    io_timeout: Duration,
}

impl fmt::Debug for DirectoryScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryScanner")
            .field("tracker", &self.tracker)
            .field("io_timeout", &self.io_timeout)
            .finish()
    }
}

impl DirectoryScanner {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        tracker: DownloadStateTracker,
        io_timeout: Duration,
    ) -> Self {
        Self {
            fs,
            tracker,
            io_timeout,
        }
    }

    /// Scan `dir` as of `now`.
    ///
    /// An unreadable or missing directory yields an empty stream; a file
    /// that cannot be inspected is skipped. Neither is surfaced.
    pub fn scan(&self, dir: PathBuf, now: DateTime<Utc>) -> ScanStream {
        let scanner = self.clone();
        Box::pin(stream! {
            let mut entries = match scanner.open(&dir).await {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(
                        path = %dir.display(),
                        error = %err,
                        "skipping source path"
                    );
                    return;
                }
            };
            let mut kept = 0usize;
            loop {
                let path = match scanner.next_entry(entries.as_mut()).await {
                    Ok(Some(path)) => path,
                    Ok(None) => break,
                    Err(err) => {
                        warn!(
                            path = %dir.display(),
                            error = %err,
                            "directory listing ended early"
                        );
                        break;
                    }
                };
                match scanner.inspect(&path, now).await {
                    Ok(Some(item)) => {
                        kept += 1;
                        yield item;
                    }
                    Ok(None) => {}
                    Err(err) => debug!(error = %err, "skipping entry"),
                }
            }
            debug!(path = %dir.display(), kept, "scanned source path");
        })
    }

    async fn open(&self, dir: &Path) -> Result<Box<dyn ReadDirStream + Send>> {
        self.bounded("open directory", self.fs.read_dir(dir))
            .await?
            .map_err(|source| StatusError::PathUnreadable {
                path: dir.to_path_buf(),
                source,
            })
    }

    async fn next_entry(
        &self,
        entries: &mut (dyn ReadDirStream + Send),
    ) -> Result<Option<PathBuf>> {
        Ok(self.bounded("read directory entry", entries.next_entry()).await??)
    }

    /// Decide whether one entry becomes a status.
    async fn inspect(
        &self,
        path: &Path,
        now: DateTime<Utc>,
    ) -> Result<Option<StatusItem>> {
        let md = self
            .bounded("read metadata", self.fs.metadata(path))
            .await?
            .map_err(|err| partial(path, err.to_string()))?;
        if !md.is_file {
            trace!(path = %path.display(), "not a regular file");
            return Ok(None);
        }
        let modified = md
            .modified
            .ok_or_else(|| partial(path, "no modification time"))?;
        let modified = utc_from_system(modified).ok_or_else(|| {
            partial(path, "modification time out of range")
        })?;
        if !is_recent(modified, now) {
            trace!(path = %path.display(), %modified, "outside recency window");
            return Ok(None);
        }
        let Some(kind) = MediaKind::classify(path) else {
            trace!(path = %path.display(), "unrecognised extension");
            return Ok(None);
        };
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| partial(path, "file name is not valid UTF-8"))?;
        let downloaded = self.tracker.is_downloaded(name).await;
        debug!(path = %path.display(), %kind, downloaded, "found status");
        Ok(Some(StatusItem::new(
            StatusLocation::File(path.to_path_buf()),
            kind,
            name,
            downloaded,
        )))
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = T>,
    ) -> Result<T> {
        timeout(self.io_timeout, fut).await.map_err(|_| {
            StatusError::Timeout {
                operation,
                timeout_ms: self.io_timeout.as_millis() as u64,
            }
        })
    }
}

/// `None` when the time falls outside what `DateTime` can represent.
fn utc_from_system(stamp: SystemTime) -> Option<DateTime<Utc>> {
    match stamp.duration_since(UNIX_EPOCH) {
        Ok(after) => DateTime::from_timestamp(
            i64::try_from(after.as_secs()).ok()?,
            after.subsec_nanos(),
        ),
        Err(before) => {
            let before = before.duration();
            let secs = i64::try_from(before.as_secs()).ok()?;
            match before.subsec_nanos() {
                0 => DateTime::from_timestamp(-secs, 0),
                nanos => DateTime::from_timestamp(
                    -secs - 1,
                    1_000_000_000 - nanos,
                ),
            }
        }
    }
}

fn partial(path: &Path, reason: impl Into<String>) -> StatusError {
    StatusError::ScanPartialFailure {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
