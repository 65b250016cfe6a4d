//! Serialized refresh cycles and the published status list.

pub mod orchestrator;
pub mod pipeline;
pub mod trigger;

pub use orchestrator::{RefreshOrchestrator, StatusFeed};
pub use pipeline::{Collected, DiscoveryPipeline, StatusCollector};
pub use trigger::RefreshTrigger;
