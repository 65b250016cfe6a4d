//! Fallback discovery through the system media index.
//!
//! Only consulted when a direct scan of every source path came back empty
//! and the process holds the elevated "manage all files" grant. Index
//! queries are slow, so this is a last resort rather than a second source.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::download::state::DownloadStateTracker;
use crate::error::{Result, StatusError};
use crate::index::{IndexedMedia, MediaIndex};
use crate::paths::SourcePath;
use crate::scan::settings::{is_recent, window_start};
use crate::types::{MediaIndexRef, MediaKind, StatusItem, StatusLocation};

#[derive(Clone)]
pub struct MediaIndexScanner {
    index: Arc<dyn MediaIndex>,
    tracker: DownloadStateTracker,
    query_timeout: Duration,
}

impl fmt::Debug for MediaIndexScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaIndexScanner")
            .field("tracker", &self.tracker)
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

impl MediaIndexScanner {
    pub fn new(
        index: Arc<dyn MediaIndex>,
        tracker: DownloadStateTracker,
        query_timeout: Duration,
    ) -> Self {
        Self {
            index,
            tracker,
            query_timeout,
        }
    }

    /// Query every source path in order, images before videos per path.
    pub async fn scan_all(
        &self,
        sources: &[SourcePath],
        now: DateTime<Utc>,
    ) -> Vec<StatusItem> {
        let mut items = Vec::new();
        for source in sources {
            items.extend(self.scan(source.path(), now).await);
        }
        info!(
            sources = sources.len(),
            found = items.len(),
            "media index fallback finished"
        );
        items
    }

    /// Statuses the index knows under `dir`, newest first per media kind.
    pub async fn scan(
        &self,
        dir: &Path,
        now: DateTime<Utc>,
    ) -> Vec<StatusItem> {
        let mut items = Vec::new();
        for kind in MediaKind::ALL {
            let rows = match self.query(dir, now, kind).await {
                Ok(rows) => rows,
                Err(err) => {
                    warn!(error = %err, "treating media index query as empty");
                    continue;
                }
            };
            for row in rows {
                if let Some(item) = self.to_item(row, kind).await {
                    items.push(item);
                }
            }
        }
        items
    }

    async fn query(
        &self,
        dir: &Path,
        now: DateTime<Utc>,
        kind: MediaKind,
    ) -> Result<Vec<IndexedMedia>> {
        let since = window_start(now);
        let query = self.index.query_by_path_prefix_and_time(dir, since, kind);
        let mut rows = timeout(self.query_timeout, query)
            .await
            .map_err(|_| StatusError::Timeout {
                operation: "media index query",
                timeout_ms: self.query_timeout.as_millis() as u64,
            })?
            .map_err(|err| match err {
                err @ StatusError::QueryFailure { .. } => err,
                other => StatusError::QueryFailure {
                    prefix: dir.to_path_buf(),
                    kind,
                    reason: other.to_string(),
                },
            })?;
        // The index is trusted for neither ordering nor filtering.
        rows.retain(|row| {
            row.path.starts_with(dir)
                && row.path != dir
                && is_recent(row.added_at, now)
        });
        rows.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        debug!(
            path = %dir.display(),
            %kind,
            rows = rows.len(),
            "queried media index"
        );
        Ok(rows)
    }

    async fn to_item(
        &self,
        row: IndexedMedia,
        kind: MediaKind,
    ) -> Option<StatusItem> {
        let Some(name) = row.path.file_name().and_then(|n| n.to_str()) else {
            debug!(path = %row.path.display(), "index row has no file name");
            return None;
        };
        let downloaded = self.tracker.is_downloaded(name).await;
        Some(StatusItem::new(
            StatusLocation::Indexed(MediaIndexRef { kind, id: row.id }),
            kind,
            name,
            downloaded,
        ))
    }
}
