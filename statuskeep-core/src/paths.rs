//! Candidate source directories and the save directory.
//!
//! Source directories come from a fixed table of vendor variant × path
//! epoch templates, filtered by which vendor apps are installed. Only
//! [`describe_sources`], which just logs, and [`SaveDirectory::ensure`]
//! touch the filesystem.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::scan::fs::FileSystem;

/// Messaging app flavours that drop status media.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum Vendor {
    Primary,
    Business,
}

impl Vendor {
    pub const ALL: [Vendor; 2] = [Vendor::Primary, Vendor::Business];

    pub const fn package_id(self) -> &'static str {
        match self {
            Vendor::Primary => "com.whatsapp",
            Vendor::Business => "com.whatsapp.w4b",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Vendor::Primary => "WhatsApp",
            Vendor::Business => "WhatsApp Business",
        }
    }
}

/// Generation of the on-disk layout a vendor app writes to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum PathEpoch {
    /// Scoped-storage layout under `Android/media/<package>`.
    Modern,
    /// Pre-scoped-storage layout at the storage root.
    Legacy,
}

/// Templates in resolution order; Modern precedes Legacy per vendor.
const SOURCE_TEMPLATES: [(Vendor, PathEpoch); 4] = [
    (Vendor::Primary, PathEpoch::Modern),
    (Vendor::Primary, PathEpoch::Legacy),
    (Vendor::Business, PathEpoch::Modern),
    (Vendor::Business, PathEpoch::Legacy),
];

const STATUSES_SUFFIX: [&str; 2] = ["Media", ".Statuses"];

/// A candidate directory where status media may appear.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePath {
    pub vendor: Vendor,
    pub epoch: PathEpoch,
    path: PathBuf,
}

impl SourcePath {
    pub fn new(root: &Path, vendor: Vendor, epoch: PathEpoch) -> Self {
        let mut path = root.to_path_buf();
        if epoch == PathEpoch::Modern {
            path.push("Android");
            path.push("media");
            path.push(vendor.package_id());
        }
        path.push(vendor.display_name());
        path.extend(STATUSES_SUFFIX);
        Self {
            vendor,
            epoch,
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Installation probe supplied by the host platform.
pub trait InstallProbe: Send + Sync {
    fn is_vendor_installed(&self, package_id: &str) -> bool;
}

/// Probe answering from a fixed list of package identifiers.
#[derive(Clone, Debug, Default)]
pub struct InstalledPackages(Vec<String>);

impl InstalledPackages {
    pub fn new<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(packages.into_iter().map(Into::into).collect())
    }

    pub fn vendors(vendors: &[Vendor]) -> Self {
        Self::new(vendors.iter().map(|vendor| vendor.package_id()))
    }
}

impl InstallProbe for InstalledPackages {
    fn is_vendor_installed(&self, package_id: &str) -> bool {
        self.0.iter().any(|pkg| pkg == package_id)
    }
}

/// Builds the ordered source path list.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver;

impl PathResolver {
    /// Resolve against an installation probe.
    pub fn resolve(root: &Path, probe: &dyn InstallProbe) -> Vec<SourcePath> {
        let sources = Self::resolve_with(root, |vendor| {
            let installed = probe.is_vendor_installed(vendor.package_id());
            debug!(
                package = vendor.package_id(),
                installed, "probed vendor installation"
            );
            installed
        });
        info!(count = sources.len(), "resolved status source paths");
        sources
    }

    /// Pure form: `installed` answers once per vendor.
    pub fn resolve_with(
        root: &Path,
        mut installed: impl FnMut(Vendor) -> bool,
    ) -> Vec<SourcePath> {
        let mut sources = Vec::with_capacity(SOURCE_TEMPLATES.len());
        for vendor in Vendor::ALL {
            if !installed(vendor) {
                continue;
            }
            sources.extend(
                SOURCE_TEMPLATES
                    .iter()
                    .filter(|(v, _)| *v == vendor)
                    .map(|(v, epoch)| SourcePath::new(root, *v, *epoch)),
            );
        }
        sources
    }
}

/// Log existence and readability of every source path. A call that does
/// not answer within `io_timeout` counts as a failure.
pub async fn describe_sources(
    fs: &dyn FileSystem,
    sources: &[SourcePath],
    io_timeout: Duration,
) {
    for source in sources {
        let path = source.path();
        let md = bounded(io_timeout, fs.metadata(path)).await.ok();
        let readable = bounded(io_timeout, fs.read_dir(path)).await.is_ok();
        let parent_readable = match path.parent() {
            Some(parent) => {
                bounded(io_timeout, fs.read_dir(parent)).await.is_ok()
            }
            None => false,
        };
        let exists = md.is_some();
        let is_dir = md.is_some_and(|md| md.is_dir);
        if exists && readable {
            debug!(
                path = %path.display(),
                vendor = ?source.vendor,
                epoch = ?source.epoch,
                is_dir,
                "status source accessible"
            );
        } else {
            warn!(
                path = %path.display(),
                vendor = ?source.vendor,
                epoch = ?source.epoch,
                exists,
                is_dir,
                readable,
                parent_readable,
                "status source not accessible"
            );
        }
    }
}

/// The stable directory downloads are copied into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveDirectory {
    path: PathBuf,
}

impl SaveDirectory {
    /// `<root>/Download/StatusSaver`.
    pub fn under(root: &Path) -> Self {
        Self {
            path: root.join("Download").join("StatusSaver"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn destination_for(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Idempotent create. Each filesystem call is bounded by `io_timeout`
    /// and fails with `TimedOut` past it.
    pub async fn ensure(
        &self,
        fs: &dyn FileSystem,
        io_timeout: Duration,
    ) -> io::Result<()> {
        let exists = timeout(io_timeout, fs.path_exists(&self.path))
            .await
            .map_err(|_| timed_out("save directory check", io_timeout))?;
        if exists {
            return Ok(());
        }
        bounded(io_timeout, fs.create_dir_all(&self.path)).await?;
        info!(path = %self.path.display(), "created save directory");
        Ok(())
    }
}

async fn bounded<T>(
    io_timeout: Duration,
    call: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    timeout(io_timeout, call)
        .await
        .map_err(|_| timed_out("filesystem call", io_timeout))?
}

fn timed_out(operation: &str, io_timeout: Duration) -> io::Error {
    io::Error::new(
        io::ErrorKind::TimedOut,
        format!("{operation} exceeded {}ms", io_timeout.as_millis()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::fs::{InMemoryFs, StalledFs};

    #[test]
    fn both_vendors_yield_modern_then_legacy() {
        let root = Path::new("/storage/emulated/0");
        let probe = InstalledPackages::vendors(&Vendor::ALL);
        let sources = PathResolver::resolve(root, &probe);
        let paths: Vec<_> =
            sources.iter().map(|s| s.path().to_path_buf()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from(
                    "/storage/emulated/0/Android/media/com.whatsapp/WhatsApp/Media/.Statuses"
                ),
                PathBuf::from("/storage/emulated/0/WhatsApp/Media/.Statuses"),
                PathBuf::from(
                    "/storage/emulated/0/Android/media/com.whatsapp.w4b/WhatsApp Business/Media/.Statuses"
                ),
                PathBuf::from(
                    "/storage/emulated/0/WhatsApp Business/Media/.Statuses"
                ),
            ]
        );
    }

    #[test]
    fn only_installed_vendors_contribute() {
        let root = Path::new("/sdcard");
        let sources = PathResolver::resolve_with(root, |vendor| {
            vendor == Vendor::Business
        });
        assert_eq!(sources.len(), 2);
        assert!(sources.iter().all(|s| s.vendor == Vendor::Business));
        assert_eq!(sources[0].epoch, PathEpoch::Modern);
        assert_eq!(sources[1].epoch, PathEpoch::Legacy);
    }

    #[test]
    fn nothing_installed_is_empty_not_an_error() {
        let probe = InstalledPackages::default();
        assert!(PathResolver::resolve(Path::new("/sdcard"), &probe).is_empty());
    }

    #[test]
    fn save_directory_is_fixed_under_root() {
        let save = SaveDirectory::under(Path::new("/sdcard"));
        assert_eq!(save.path(), Path::new("/sdcard/Download/StatusSaver"));
        assert_eq!(
            save.destination_for("IMG-1.jpg"),
            PathBuf::from("/sdcard/Download/StatusSaver/IMG-1.jpg")
        );
    }

    #[tokio::test]
    async fn ensure_creates_once() {
        let fs = InMemoryFs::new();
        let save = SaveDirectory::under(Path::new("/sdcard"));
        save.ensure(&fs, Duration::from_secs(1)).await.unwrap();
        save.ensure(&fs, Duration::from_secs(1)).await.unwrap();
        assert!(fs.contains(save.path()));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_save_directory_times_out() {
        let save = SaveDirectory::under(Path::new("/sdcard"));
        let err = save
            .ensure(&StalledFs, Duration::from_millis(50))
            .await
            .expect_err("never answers");
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn describing_stalled_sources_completes() {
        let probe = InstalledPackages::vendors(&Vendor::ALL);
        let sources = PathResolver::resolve(Path::new("/sdcard"), &probe);
        let described = tokio::time::timeout(
            Duration::from_secs(60),
            describe_sources(&StalledFs, &sources, Duration::from_millis(50)),
        )
        .await;
        assert!(described.is_ok());
    }
}
