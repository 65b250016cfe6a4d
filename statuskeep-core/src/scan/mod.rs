//! Status discovery.
//!
//! Two strategies feed a refresh: [`directory`] lists source paths directly
//! and is always tried first; [`media_index`] asks the system media index
//! and only runs when the direct scan found nothing and elevated access is
//! granted.

pub mod directory;
pub mod fs;
pub mod media_index;
pub mod settings;

pub use directory::{DirectoryScanner, ScanStream};
pub use fs::{FileSystem, FsMetadata, InMemoryFs, ReadDirStream, RealFs};
pub use media_index::MediaIndexScanner;
pub use settings::{RECENCY_WINDOW, SaverSettings, is_recent};
