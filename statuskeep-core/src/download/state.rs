use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, trace};

use crate::paths::SaveDirectory;
use crate::scan::fs::FileSystem;
use crate::scan::settings::DEFAULT_IO_TIMEOUT;

/// Answers whether a status has been saved, by base name.
///
/// Nothing is cached: every call is one existence check against the save
/// directory, so the answer matches the filesystem at the moment of the
/// check. A check that does not answer within the io timeout reads as
/// not downloaded.
#[derive(Clone)]
pub struct DownloadStateTracker {
    fs: Arc<dyn FileSystem>,
    save_dir: SaveDirectory,
    io_timeout: Duration,
}

impl fmt::Debug for DownloadStateTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadStateTracker")
            .field("save_dir", &self.save_dir)
            .field("io_timeout", &self.io_timeout)
            .finish()
    }
}

impl DownloadStateTracker {
    pub fn new(fs: Arc<dyn FileSystem>, save_dir: SaveDirectory) -> Self {
        Self {
            fs,
            save_dir,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn save_dir(&self) -> &SaveDirectory {
        &self.save_dir
    }

    pub async fn is_downloaded(&self, name: &str) -> bool {
        let destination = self.save_dir.destination_for(name);
        match timeout(self.io_timeout, self.fs.path_exists(&destination)).await
        {
            Ok(exists) => {
                trace!(name, exists, "checked download state");
                exists
            }
            Err(_) => {
                debug!(name, "download state check timed out");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::fs::{InMemoryFs, StalledFs};
    use std::path::Path;

    #[tokio::test]
    async fn reflects_the_save_directory_at_call_time() {
        let fs = InMemoryFs::new();
        let save = SaveDirectory::under(Path::new("/sdcard"));
        let tracker =
            DownloadStateTracker::new(Arc::new(fs.clone()), save.clone());

        assert!(!tracker.is_downloaded("IMG-1.jpg").await);
        fs.add_file(save.destination_for("IMG-1.jpg"), 10);
        assert!(tracker.is_downloaded("IMG-1.jpg").await);
        assert!(!tracker.is_downloaded("img-1.jpg").await);
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_check_reads_as_not_downloaded() {
        let tracker = DownloadStateTracker::new(
            Arc::new(StalledFs),
            SaveDirectory::under(Path::new("/sdcard")),
        )
        .with_io_timeout(Duration::from_millis(50));

        assert!(!tracker.is_downloaded("IMG-1.jpg").await);
    }
}
