//! The system media index consulted by the fallback scanner.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{MediaIndexRef, MediaKind};

/// One row returned by an index query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedMedia {
    /// Path the index recorded for the file.
    pub path: PathBuf,
    pub id: u64,
    pub added_at: DateTime<Utc>,
}

/// Query surface of the platform's media catalogue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaIndex: Send + Sync {
    /// Entries of `kind` whose path lies under `prefix` and whose added
    /// time is at or after `since`, newest first.
    async fn query_by_path_prefix_and_time(
        &self,
        prefix: &Path,
        since: DateTime<Utc>,
        kind: MediaKind,
    ) -> Result<Vec<IndexedMedia>>;

    /// Map an index reference back to the file it describes, if the index
    /// still knows it.
    async fn resolve_path(
        &self,
        reference: &MediaIndexRef,
    ) -> Result<Option<PathBuf>>;
}

/// Index kept in memory, for hosts without a platform catalogue and for
/// tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMediaIndex {
    rows: Arc<RwLock<Vec<(MediaKind, IndexedMedia)>>>,
}

impl InMemoryMediaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        kind: MediaKind,
        id: u64,
        path: impl Into<PathBuf>,
        added_at: DateTime<Utc>,
    ) {
        let mut rows =
            self.rows.write().unwrap_or_else(|poison| poison.into_inner());
        rows.push((
            kind,
            IndexedMedia {
                path: path.into(),
                id,
                added_at,
            },
        ));
    }

    fn rows(&self) -> Vec<(MediaKind, IndexedMedia)> {
        self.rows
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }
}

#[async_trait]
impl MediaIndex for InMemoryMediaIndex {
    async fn query_by_path_prefix_and_time(
        &self,
        prefix: &Path,
        since: DateTime<Utc>,
        kind: MediaKind,
    ) -> Result<Vec<IndexedMedia>> {
        let mut hits: Vec<IndexedMedia> = self
            .rows()
            .into_iter()
            .filter(|(row_kind, row)| {
                *row_kind == kind
                    && row.path.starts_with(prefix)
                    && row.path != prefix
                    && row.added_at >= since
            })
            .map(|(_, row)| row)
            .collect();
        hits.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(hits)
    }

    async fn resolve_path(
        &self,
        reference: &MediaIndexRef,
    ) -> Result<Option<PathBuf>> {
        Ok(self
            .rows()
            .into_iter()
            .find(|(kind, row)| {
                *kind == reference.kind && row.id == reference.id
            })
            .map(|(_, row)| row.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[tokio::test]
    async fn query_filters_by_kind_prefix_and_time() {
        let now = Utc::now();
        let index = InMemoryMediaIndex::new();
        let dir = Path::new("/sdcard/WhatsApp/Media/.Statuses");
        let ago = |hours| now - TimeDelta::hours(hours);
        index.insert(MediaKind::Image, 1, dir.join("old.jpg"), ago(30));
        index.insert(MediaKind::Image, 2, dir.join("a.jpg"), ago(2));
        index.insert(MediaKind::Image, 3, dir.join("b.jpg"), ago(1));
        index.insert(MediaKind::Video, 4, dir.join("c.mp4"), now);
        index.insert(MediaKind::Image, 5, "/sdcard/DCIM/d.jpg", now);

        let hits = index
            .query_by_path_prefix_and_time(
                dir,
                now - TimeDelta::hours(24),
                MediaKind::Image,
            )
            .await
            .unwrap();
        let ids: Vec<u64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[tokio::test]
    async fn resolve_path_matches_kind_and_id() {
        let index = InMemoryMediaIndex::new();
        index.insert(MediaKind::Video, 9, "/s/v.mp4", Utc::now());
        let hit = index
            .resolve_path(&MediaIndexRef {
                kind: MediaKind::Video,
                id: 9,
            })
            .await
            .unwrap();
        assert_eq!(hit, Some(PathBuf::from("/s/v.mp4")));
        let miss = index
            .resolve_path(&MediaIndexRef {
                kind: MediaKind::Image,
                id: 9,
            })
            .await
            .unwrap();
        assert_eq!(miss, None);
    }
}
