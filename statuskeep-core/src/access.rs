//! Capability queries answered by the host's permission subsystem.

use async_trait::async_trait;

use crate::types::AccessSummary;

/// Whether the process may currently read shared storage.
///
/// Hosts answer in terms of granted capabilities, never platform versions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessCapabilities: Send + Sync {
    async fn has_broad_read_access(&self) -> bool;

    /// Elevated "manage all files" grant; required for the index fallback.
    async fn has_manage_all_files_access(&self) -> bool;
}

/// Query both capabilities once.
pub async fn access_summary(access: &dyn AccessCapabilities) -> AccessSummary {
    AccessSummary {
        broad_read: access.has_broad_read_access().await,
        manage_all_files: access.has_manage_all_files_access().await,
    }
}

/// Fixed answers, for hosts that resolve grants up front and for tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticAccess {
    pub broad_read: bool,
    pub manage_all_files: bool,
}

impl StaticAccess {
    pub fn granted() -> Self {
        Self {
            broad_read: true,
            manage_all_files: true,
        }
    }

    pub fn read_only() -> Self {
        Self {
            broad_read: true,
            manage_all_files: false,
        }
    }
}

#[async_trait]
impl AccessCapabilities for StaticAccess {
    async fn has_broad_read_access(&self) -> bool {
        self.broad_read
    }

    async fn has_manage_all_files_access(&self) -> bool {
        self.manage_all_files
    }
}
