use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Platform hook that makes a newly saved file visible to galleries.
///
/// Registration is fire-and-forget: callers never await or inspect the
/// outcome beyond logging it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileRegistrar: Send + Sync {
    async fn register_new_file(&self, path: &Path) -> Result<()>;
}

/// Registrar for hosts without a media indexer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFileRegistrar;

#[async_trait]
impl FileRegistrar for NoopFileRegistrar {
    async fn register_new_file(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}
