use std::path::PathBuf;

use thiserror::Error;

use crate::types::MediaKind;

/// Non-fatal conditions raised while discovering statuses.
///
/// None of these ever reach the caller of a refresh; they are logged at the
/// point where they occur and the affected path, file, or query contributes
/// nothing to the published list.
#[derive(Error, Debug)]
pub enum StatusError {
    #[error("source path {path:?} is not readable: {source}")]
    PathUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("skipped {path:?}: {reason}")]
    ScanPartialFailure { path: PathBuf, reason: String },

    #[error("media index query for {kind} under {prefix:?} failed: {reason}")]
    QueryFailure {
        prefix: PathBuf,
        kind: MediaKind,
        reason: String,
    },

    #[error("failed to register {path:?} with the media indexer: {reason}")]
    IndexRegistrationFailure { path: PathBuf, reason: String },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StatusError>;

/// Stage of a download at which an I/O error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStage {
    PrepareSaveDirectory,
    OpenSource,
    StageTemporary,
    CopyBytes,
    Flush,
    Commit,
}

impl std::fmt::Display for CopyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CopyStage::PrepareSaveDirectory => "prepare save directory",
            CopyStage::OpenSource => "open source",
            CopyStage::StageTemporary => "stage temporary file",
            CopyStage::CopyBytes => "copy bytes",
            CopyStage::Flush => "flush staged copy",
            CopyStage::Commit => "commit",
        };
        f.write_str(label)
    }
}

/// The only failure a caller of `download` can observe.
///
/// Whatever the variant, the save directory holds no new or partial file
/// when this is returned.
#[derive(Error, Debug)]
pub enum CopyFailure {
    #[error("{location} does not resolve to a file on disk")]
    Unresolvable { location: String },

    #[error("{location} has no usable file name")]
    MissingFileName { location: String },

    #[error("failed to {stage} for {path:?}: {source}")]
    Io {
        stage: CopyStage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("copy worker terminated before completing: {0}")]
    Interrupted(String),
}

impl CopyFailure {
    pub(crate) fn io(
        stage: CopyStage,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        CopyFailure::Io {
            stage,
            path: path.into(),
            source,
        }
    }
}
