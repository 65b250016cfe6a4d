//! Saving statuses and answering whether they were saved.

pub mod manager;
pub mod registrar;
pub mod state;

pub use manager::DownloadManager;
pub use registrar::{FileRegistrar, NoopFileRegistrar};
pub use state::DownloadStateTracker;
