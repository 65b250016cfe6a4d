use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::access::{AccessCapabilities, StaticAccess};
use crate::download::manager::DownloadManager;
use crate::download::registrar::{FileRegistrar, NoopFileRegistrar};
use crate::error::CopyFailure;
use crate::index::{InMemoryMediaIndex, MediaIndex};
use crate::paths::{
    InstallProbe, PathResolver, SaveDirectory, SourcePath, describe_sources,
};
use crate::refresh::orchestrator::{RefreshOrchestrator, StatusFeed};
use crate::refresh::pipeline::DiscoveryPipeline;
use crate::scan::fs::{FileSystem, RealFs};
use crate::scan::settings::SaverSettings;
use crate::types::{RefreshPhase, StatusItem, StatusSnapshot};

/// Host services the saver depends on.
#[derive(Clone)]
pub struct Collaborators {
    /// Used for discovery and download-state checks. Downloads themselves
    /// always write through the host filesystem.
    pub fs: Arc<dyn FileSystem>,
    pub access: Arc<dyn AccessCapabilities>,
    pub media_index: Arc<dyn MediaIndex>,
    pub registrar: Arc<dyn FileRegistrar>,
}

impl Collaborators {
    /// Real filesystem, fixed access answers, an empty index and no
    /// registrar.
    pub fn local(access: StaticAccess) -> Self {
        Self {
            fs: Arc::new(RealFs::new()),
            access: Arc::new(access),
            media_index: Arc::new(InMemoryMediaIndex::new()),
            registrar: Arc::new(NoopFileRegistrar),
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Entry point wiring path resolution, discovery, refresh and download.
#[derive(Debug)]
pub struct StatusSaver {
    sources: Arc<[SourcePath]>,
    save_dir: SaveDirectory,
    orchestrator: RefreshOrchestrator,
    downloads: DownloadManager,
}

impl StatusSaver {
    /// Resolve source paths, start the refresh worker and queue the first
    /// refresh. Must be called inside a tokio runtime.
    pub async fn start(
        settings: SaverSettings,
        probe: &dyn InstallProbe,
        collaborators: Collaborators,
    ) -> Self {
        let sources: Arc<[SourcePath]> =
            PathResolver::resolve(&settings.storage_root, probe).into();
        describe_sources(
            collaborators.fs.as_ref(),
            &sources,
            settings.io_timeout(),
        )
        .await;

        let save_dir = settings.save_directory();
        let pipeline = DiscoveryPipeline::new(
            &settings,
            Arc::clone(&sources),
            Arc::clone(&collaborators.fs),
            Arc::clone(&collaborators.access),
            Arc::clone(&collaborators.media_index),
        );
        let orchestrator = RefreshOrchestrator::spawn(Arc::new(pipeline));
        let downloads = DownloadManager::new(
            save_dir.clone(),
            collaborators.media_index,
            collaborators.registrar,
            orchestrator.trigger(),
        );

        info!(
            root = %settings.storage_root.display(),
            sources = sources.len(),
            save_dir = %save_dir.path().display(),
            "status saver started"
        );
        orchestrator.request_refresh();

        Self {
            sources,
            save_dir,
            orchestrator,
            downloads,
        }
    }

    /// Run (or join) a refresh and return the list it published.
    pub async fn refresh(&self) -> Arc<StatusSnapshot> {
        self.orchestrator.refresh().await
    }

    /// Queue a refresh and return immediately.
    pub fn request_refresh(&self) {
        self.orchestrator.request_refresh();
    }

    /// Save `item`. Failures are logged and reported as `false`.
    pub async fn download(&self, item: &StatusItem) -> bool {
        match self.downloads.download(item).await {
            Ok(_) => true,
            Err(err) => {
                warn!(name = item.name, error = %err, "status not saved");
                false
            }
        }
    }

    /// Like [`StatusSaver::download`], keeping the failure detail.
    pub async fn try_download(
        &self,
        item: &StatusItem,
    ) -> Result<PathBuf, CopyFailure> {
        self.downloads.download(item).await
    }

    pub fn observe_statuses(&self) -> StatusFeed {
        self.orchestrator.observe()
    }

    pub fn current(&self) -> Arc<StatusSnapshot> {
        self.orchestrator.current()
    }

    pub fn phase(&self) -> RefreshPhase {
        self.orchestrator.phase()
    }

    pub fn sources(&self) -> &[SourcePath] {
        &self.sources
    }

    pub fn save_directory(&self) -> &SaveDirectory {
        &self.save_dir
    }

    /// Stop the refresh worker; an in-flight cycle publishes nothing.
    pub async fn shutdown(self) {
        self.orchestrator.shutdown().await;
    }
}
