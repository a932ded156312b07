//! Endpoint synchronization: sources, snapshot assembly and the sync cycle

pub mod error;
pub mod orchestrator;
pub mod rates;
pub mod source;

pub use error::{EndpointFailure, SyncError};
pub use orchestrator::SyncOrchestrator;
pub use rates::{NetworkRates, RateTracker};
pub use source::{HttpSource, MetricsSource};
