//! # statuskeep core
//!
//! Discovers the ephemeral status media a messaging app leaves on shared
//! storage, tracks which items were already saved, and copies items into a
//! fixed save directory.
//!
//! ## Overview
//!
//! - **Path resolution**: [`paths`] builds the ordered list of candidate
//!   status directories for each installed vendor app.
//! - **Discovery**: [`scan`] lists those directories directly and falls back
//!   to the platform media index when direct listing finds nothing.
//! - **Download state**: [`download`] answers "was this saved?" by name and
//!   performs all-or-nothing copies.
//! - **Refresh**: [`refresh`] serializes discovery cycles, coalesces
//!   requests and publishes complete snapshots.
//!
//! ## Example
//!
//! ```no_run
//! use statuskeep_core::{
//!     Collaborators, InstalledPackages, SaverSettings, StaticAccess,
//!     StatusSaver, Vendor,
//! };
//!
//! async fn save_first() {
//!     let saver = StatusSaver::start(
//!         SaverSettings::default(),
//!         &InstalledPackages::vendors(&[Vendor::Primary]),
//!         Collaborators::local(StaticAccess::read_only()),
//!     )
//!     .await;
//!
//!     let snapshot = saver.refresh().await;
//!     if let Some(item) = snapshot.items.first() {
//!         saver.download(item).await;
//!     }
//! }
//! ```

#![allow(missing_docs)]

/// Host capability queries
pub mod access;
/// Download state, copying and registration
pub mod download;
pub mod error;
/// Platform media index abstraction
pub mod index;
/// Source path resolution and the save directory
pub mod paths;
/// Refresh orchestration
pub mod refresh;
mod saver;
/// Directory and media index discovery
pub mod scan;
pub mod types;

pub use access::{AccessCapabilities, StaticAccess, access_summary};
pub use download::{
    DownloadManager, DownloadStateTracker, FileRegistrar, NoopFileRegistrar,
};
pub use error::{CopyFailure, CopyStage, Result, StatusError};
pub use index::{InMemoryMediaIndex, IndexedMedia, MediaIndex};
pub use paths::{
    InstallProbe, InstalledPackages, PathEpoch, PathResolver, SaveDirectory,
    SourcePath, Vendor,
};
pub use refresh::{
    Collected, DiscoveryPipeline, RefreshOrchestrator, RefreshTrigger,
    StatusCollector, StatusFeed,
};
pub use saver::{Collaborators, StatusSaver};
pub use scan::{
    DirectoryScanner, FileSystem, InMemoryFs, MediaIndexScanner, RealFs,
    SaverSettings,
};
pub use types::{
    AccessSummary, MediaIndexRef, MediaKind, RefreshPhase, StatusItem,
    StatusLocation, StatusSnapshot,
};
