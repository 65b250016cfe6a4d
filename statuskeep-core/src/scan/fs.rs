use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

/// Minimal, async-capable filesystem abstraction used by the scanners and
/// the download state check.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Check whether a path exists. Permission errors read as absent.
    async fn path_exists(&self, path: &Path) -> bool;

    /// Open a directory for iteration.
    async fn read_dir(
        &self,
        path: &Path,
    ) -> io::Result<Box<dyn ReadDirStream + Send>>;

    /// Fetch lightweight file metadata.
    async fn metadata(&self, path: &Path) -> io::Result<FsMetadata>;

    /// Create a directory and any missing parents; succeeds if it exists.
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// Lightweight metadata needed by scanners.
#[derive(Debug, Clone, Copy)]
pub struct FsMetadata {
    pub is_dir: bool,
    pub is_file: bool,
    pub len: u64,
    /// Last modified time if available
    pub modified: Option<SystemTime>,
}

/// Async directory iterator (similar to tokio::fs::ReadDir).
#[async_trait]
pub trait ReadDirStream {
    /// Return next entry's path, or None when exhausted.
    async fn next_entry(&mut self) -> io::Result<Option<PathBuf>>;
}

/// Real filesystem implementation backed by tokio::fs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for RealFs {
    async fn path_exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read_dir(
        &self,
        path: &Path,
    ) -> io::Result<Box<dyn ReadDirStream + Send>> {
        let rd = tokio::fs::read_dir(path).await?;
        Ok(Box::new(RealReadDir { inner: rd }))
    }

    async fn metadata(&self, path: &Path) -> io::Result<FsMetadata> {
        let md = tokio::fs::metadata(path).await?;
        Ok(FsMetadata {
            is_dir: md.is_dir(),
            is_file: md.is_file(),
            len: md.len(),
            modified: md.modified().ok(),
        })
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }
}

struct RealReadDir {
    inner: tokio::fs::ReadDir,
}

#[async_trait]
impl ReadDirStream for RealReadDir {
    async fn next_entry(&mut self) -> io::Result<Option<PathBuf>> {
        Ok(self.inner.next_entry().await?.map(|entry| entry.path()))
    }
}

/// In-memory filesystem for tests.
///
/// Paths are treated literally; callers should use consistent absolute
/// paths. Clones share the same tree so a test can keep a handle while the
/// engine owns another.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFs {
    inner: Arc<RwLock<InMemoryTree>>,
}

#[derive(Debug, Default)]
struct InMemoryTree {
    nodes: HashMap<PathBuf, Node>,
    unreadable: HashSet<PathBuf>,
}

#[derive(Debug, Clone)]
enum Node {
    Dir { children: Vec<PathBuf> },
    File { len: u64, modified: SystemTime },
}

impl InMemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir<P: Into<PathBuf>>(&self, path: P) {
        let path = path.into();
        let mut tree = self.write();
        tree.insert_dir(path);
    }

    /// Add a file stamped with the current time.
    pub fn add_file<P: Into<PathBuf>>(&self, path: P, len: u64) {
        self.add_file_modified(path, len, SystemTime::now());
    }

    pub fn add_file_modified<P: Into<PathBuf>>(
        &self,
        path: P,
        len: u64,
        modified: SystemTime,
    ) {
        let path = path.into();
        let mut tree = self.write();
        tree.ensure_parent_link(&path);
        tree.nodes.insert(path, Node::File { len, modified });
    }

    /// Make `read_dir` on `path` fail with `PermissionDenied`.
    pub fn deny_read<P: Into<PathBuf>>(&self, path: P) {
        self.write().unreadable.insert(path.into());
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.read().nodes.contains_key(path)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryTree> {
        self.inner.read().unwrap_or_else(|poison| poison.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryTree> {
        self.inner.write().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl InMemoryTree {
    fn insert_dir(&mut self, path: PathBuf) {
        if self.nodes.contains_key(&path) {
            return;
        }
        self.ensure_parent_link(&path);
        self.nodes.insert(
            path,
            Node::Dir {
                children: Vec::new(),
            },
        );
    }

    fn ensure_parent_link(&mut self, path: &Path) {
        if let Some(parent) = path.parent() {
            if !self.nodes.contains_key(parent) {
                self.nodes.insert(
                    parent.to_path_buf(),
                    Node::Dir {
                        children: Vec::new(),
                    },
                );
                self.ensure_parent_link(parent);
            }
            if let Some(Node::Dir { children }) = self.nodes.get_mut(parent)
                && !children.iter().any(|p| p.as_path() == path)
            {
                children.push(path.to_path_buf());
            }
        }
    }
}

fn not_found(op: &str, path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{op} on missing path: {}", path.display()),
    )
}

#[async_trait]
impl FileSystem for InMemoryFs {
    async fn path_exists(&self, path: &Path) -> bool {
        self.contains(path)
    }

    async fn read_dir(
        &self,
        path: &Path,
    ) -> io::Result<Box<dyn ReadDirStream + Send>> {
        let tree = self.read();
        if tree.unreadable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("read_dir denied: {}", path.display()),
            ));
        }
        match tree.nodes.get(path) {
            Some(Node::Dir { children }) => Ok(Box::new(InMemReadDir {
                queue: children.clone().into(),
            })),
            Some(Node::File { .. }) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("read_dir on file: {}", path.display()),
            )),
            None => Err(not_found("read_dir", path)),
        }
    }

    async fn metadata(&self, path: &Path) -> io::Result<FsMetadata> {
        match self.read().nodes.get(path) {
            Some(Node::Dir { .. }) => Ok(FsMetadata {
                is_dir: true,
                is_file: false,
                len: 0,
                modified: None,
            }),
            Some(Node::File { len, modified }) => Ok(FsMetadata {
                is_dir: false,
                is_file: true,
                len: *len,
                modified: Some(*modified),
            }),
            None => Err(not_found("metadata", path)),
        }
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut tree = self.write();
        if let Some(Node::File { .. }) = tree.nodes.get(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists at {}", path.display()),
            ));
        }
        tree.insert_dir(path.to_path_buf());
        Ok(())
    }
}

struct InMemReadDir {
    queue: VecDeque<PathBuf>,
}

#[async_trait]
impl ReadDirStream for InMemReadDir {
    async fn next_entry(&mut self) -> io::Result<Option<PathBuf>> {
        Ok(self.queue.pop_front())
    }
}

/// Never answers any call.
#[cfg(test)]
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct StalledFs;

#[cfg(test)]
#[async_trait]
impl FileSystem for StalledFs {
    async fn path_exists(&self, _path: &Path) -> bool {
        std::future::pending().await
    }

    async fn read_dir(
        &self,
        _path: &Path,
    ) -> io::Result<Box<dyn ReadDirStream + Send>> {
        std::future::pending().await
    }

    async fn metadata(&self, _path: &Path) -> io::Result<FsMetadata> {
        std::future::pending().await
    }

    async fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        std::future::pending().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_listing_preserves_insertion_order() {
        let fs = InMemoryFs::new();
        fs.add_file("/root/dir/b.jpg", 1);
        fs.add_file("/root/dir/a.jpg", 1);
        fs.add_dir("/root/dir/nested");

        let mut entries = fs.read_dir(Path::new("/root/dir")).await.unwrap();
        let mut seen = Vec::new();
        while let Some(path) = entries.next_entry().await.unwrap() {
            seen.push(path);
        }
        assert_eq!(
            seen,
            vec![
                PathBuf::from("/root/dir/b.jpg"),
                PathBuf::from("/root/dir/a.jpg"),
                PathBuf::from("/root/dir/nested"),
            ]
        );
    }

    #[tokio::test]
    async fn denied_and_missing_directories_error() {
        let fs = InMemoryFs::new();
        fs.add_dir("/root/locked");
        fs.deny_read("/root/locked");

        let denied = fs.read_dir(Path::new("/root/locked")).await;
        assert_eq!(
            denied.err().map(|e| e.kind()),
            Some(io::ErrorKind::PermissionDenied)
        );
        let missing = fs.read_dir(Path::new("/root/absent")).await;
        assert_eq!(
            missing.err().map(|e| e.kind()),
            Some(io::ErrorKind::NotFound)
        );
    }

    #[tokio::test]
    async fn create_dir_all_is_idempotent_and_shared_between_clones() {
        let fs = InMemoryFs::new();
        let handle = fs.clone();
        fs.create_dir_all(Path::new("/root/Download/StatusSaver"))
            .await
            .unwrap();
        fs.create_dir_all(Path::new("/root/Download/StatusSaver"))
            .await
            .unwrap();
        assert!(handle.path_exists(Path::new("/root/Download")).await);
        let md = handle
            .metadata(Path::new("/root/Download/StatusSaver"))
            .await
            .unwrap();
        assert!(md.is_dir);
    }

    #[tokio::test]
    async fn real_fs_reports_file_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("IMG-1.jpg");
        std::fs::write(&file, b"jpeg").unwrap();

        let fs = RealFs::new();
        let md = fs.metadata(&file).await.unwrap();
        assert!(md.is_file);
        assert_eq!(md.len, 4);
        assert!(md.modified.is_some());
        assert!(fs.path_exists(&file).await);
        assert!(!fs.path_exists(&dir.path().join("missing")).await);
    }
}
