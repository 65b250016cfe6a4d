use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::access::{AccessCapabilities, access_summary};
use crate::download::state::DownloadStateTracker;
use crate::index::MediaIndex;
use crate::paths::{SaveDirectory, SourcePath};
use crate::scan::directory::DirectoryScanner;
use crate::scan::fs::FileSystem;
use crate::scan::media_index::MediaIndexScanner;
use crate::scan::settings::SaverSettings;
use crate::types::{AccessSummary, MediaKind, StatusItem};

/// Everything one cycle produced, before it is published.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    pub items: Vec<StatusItem>,
    pub access: AccessSummary,
}

/// One full discovery pass. The orchestrator runs these one at a time.
#[async_trait]
pub trait StatusCollector: Send + Sync {
    async fn collect(&self) -> Collected;
}

/// Which strategy produced a cycle's items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Directory,
    MediaIndex,
}

/// Direct scan of every source path, falling back to the media index when
/// that finds nothing and elevated access is granted.
pub struct DiscoveryPipeline {
    sources: Arc<[SourcePath]>,
    save_dir: SaveDirectory,
    io_timeout: Duration,
    fs: Arc<dyn FileSystem>,
    access: Arc<dyn AccessCapabilities>,
    directory: DirectoryScanner,
    fallback: MediaIndexScanner,
}

impl fmt::Debug for DiscoveryPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryPipeline")
            .field("sources", &self.sources)
            .field("save_dir", &self.save_dir)
            .field("io_timeout", &self.io_timeout)
            .field("directory", &self.directory)
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl DiscoveryPipeline {
    pub fn new(
        settings: &SaverSettings,
        sources: impl Into<Arc<[SourcePath]>>,
        fs: Arc<dyn FileSystem>,
        access: Arc<dyn AccessCapabilities>,
        index: Arc<dyn MediaIndex>,
    ) -> Self {
        let save_dir = settings.save_directory();
        let tracker =
            DownloadStateTracker::new(Arc::clone(&fs), save_dir.clone())
                .with_io_timeout(settings.io_timeout());
        let directory = DirectoryScanner::new(
            Arc::clone(&fs),
            tracker.clone(),
            settings.io_timeout(),
        );
        let fallback = MediaIndexScanner::new(
            index,
            tracker,
            settings.index_query_timeout(),
        );
        Self {
            sources: sources.into(),
            save_dir,
            io_timeout: settings.io_timeout(),
            fs,
            access,
            directory,
            fallback,
        }
    }

    pub fn sources(&self) -> &[SourcePath] {
        &self.sources
    }

    /// Run one pass as of `now`. Never fails; an empty list is a valid
    /// outcome.
    pub async fn collect_at(&self, now: DateTime<Utc>) -> Collected {
        let access = access_summary(self.access.as_ref()).await;
        if !access.broad_read {
            warn!("broad read access not granted; direct scan may be empty");
        }
        let ensured =
            self.save_dir.ensure(self.fs.as_ref(), self.io_timeout).await;
        if let Err(err) = ensured {
            warn!(
                path = %self.save_dir.path().display(),
                error = %err,
                "could not create save directory"
            );
        }

        // Staged locally; nothing is visible until the orchestrator
        // publishes the finished list.
        let mut staged = Vec::new();
        for source in self.sources.iter() {
            let found: Vec<StatusItem> = self
                .directory
                .scan(source.path().to_path_buf(), now)
                .collect()
                .await;
            debug!(path = %source, found = found.len(), "direct scan");
            staged.extend(found);
        }

        let mut strategy = Strategy::Directory;
        if staged.is_empty() && access.manage_all_files {
            debug!("direct scan empty; querying media index");
            staged = self.fallback.scan_all(&self.sources, now).await;
            strategy = Strategy::MediaIndex;
        }

        info!(
            strategy = ?strategy,
            total = staged.len(),
            images = count(&staged, MediaKind::Image),
            videos = count(&staged, MediaKind::Video),
            "collected statuses"
        );
        Collected {
            items: staged,
            access,
        }
    }
}

#[async_trait]
impl StatusCollector for DiscoveryPipeline {
    async fn collect(&self) -> Collected {
        self.collect_at(Utc::now()).await
    }
}

fn count(items: &[StatusItem], kind: MediaKind) -> usize {
    items.iter().filter(|item| item.media_type == kind).count()
}
