//! Values produced by a refresh cycle.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scan::settings::{IMAGE_FILE_EXTENSIONS, VIDEO_FILE_EXTENSIONS};

/// The two media kinds a status can carry.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Query order used by the index fallback.
    pub const ALL: [MediaKind; 2] = [MediaKind::Image, MediaKind::Video];

    /// Classify an extension (without the dot), ignoring ASCII case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let matches = |list: &[&str]| {
            list.iter().any(|known| known.eq_ignore_ascii_case(ext))
        };
        if matches(IMAGE_FILE_EXTENSIONS) {
            Some(MediaKind::Image)
        } else if matches(VIDEO_FILE_EXTENSIONS) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn classify(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    fn collection(self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => f.write_str("image"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

/// Reference to a row in the system media index.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct MediaIndexRef {
    pub kind: MediaKind,
    pub id: u64,
}

impl fmt::Display for MediaIndexRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "content://media/external/{}/media/{}",
            self.kind.collection(),
            self.id
        )
    }
}

/// Where a status can be read from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", content = "at", rename_all = "lowercase")]
pub enum StatusLocation {
    /// Found by listing a source directory.
    File(PathBuf),
    /// Found through the media index; only the index can map it to a path.
    Indexed(MediaIndexRef),
}

impl StatusLocation {
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            StatusLocation::File(path) => Some(path),
            StatusLocation::Indexed(_) => None,
        }
    }
}

impl fmt::Display for StatusLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLocation::File(path) => {
                write!(f, "file://{}", path.display())
            }
            StatusLocation::Indexed(reference) => reference.fmt(f),
        }
    }
}

/// A discovered status.
///
/// `name` is the base name of the underlying file and is the item's
/// identity: download state and any comparison between items key on it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusItem {
    pub location: StatusLocation,
    pub media_type: MediaKind,
    pub name: String,
    pub downloaded: bool,
}

impl StatusItem {
    pub fn new(
        location: StatusLocation,
        media_type: MediaKind,
        name: impl Into<String>,
        downloaded: bool,
    ) -> Self {
        Self {
            location,
            media_type,
            name: name.into(),
            downloaded,
        }
    }
}

/// Permission state observed at the start of a cycle.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct AccessSummary {
    pub broad_read: bool,
    pub manage_all_files: bool,
}

/// A committed, immutable result of one refresh cycle.
#[derive(Clone, Debug, Serialize)]
pub struct StatusSnapshot {
    /// Incremented once per published cycle; 0 is the pre-start value.
    pub generation: u64,
    /// Highest refresh ticket this cycle answers.
    pub covers_request: u64,
    pub items: Arc<[StatusItem]>,
    pub access: AccessSummary,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StatusSnapshot {
    pub(crate) fn initial() -> Self {
        Self {
            generation: 0,
            covers_request: 0,
            items: Arc::from(Vec::new()),
            access: AccessSummary::default(),
            completed_at: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn images(&self) -> usize {
        self.count(MediaKind::Image)
    }

    pub fn videos(&self) -> usize {
        self.count(MediaKind::Video)
    }

    pub fn find(&self, name: &str) -> Option<&StatusItem> {
        self.items.iter().find(|item| item.name == name)
    }

    fn count(&self, kind: MediaKind) -> usize {
        self.items
            .iter()
            .filter(|item| item.media_type == kind)
            .count()
    }
}

/// Where a refresh cycle currently is.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPhase {
    #[default]
    Idle,
    Scanning,
    Publishing,
}
