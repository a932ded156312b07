//! Error types for the sync cycle

use serde::{Deserialize, Serialize};

use crate::snapshot::Endpoint;

/// Why a single endpoint did not produce a section payload
///
/// These never abort a cycle; they are stored in the snapshot as
/// [`Section::Failed`](crate::snapshot::Section::Failed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum EndpointFailure {
    /// Connection refused, timeout, reset, ...
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("HTTP error: {0}")]
    Status(u16),

    /// Body was not JSON or did not match the section shape
    #[error("malformed body: {0}")]
    Malformed(String),

    /// Backend answered with an `{"error": ...}` body
    #[error("backend reported: {0}")]
    Reported(String),

    /// Backend answered with an empty object
    #[error("empty payload")]
    Empty,
}

impl EndpointFailure {
    /// Whether the backend never answered at all
    pub fn is_transport(&self) -> bool {
        matches!(self, EndpointFailure::Transport(_))
    }
}

/// Cycle-level failures; the only conditions surfaced to the user
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    /// A required section failed; consumers keep their previous state
    #[error("snapshot is missing required sections: {}", join_endpoints(.missing))]
    Invalid { missing: Vec<Endpoint> },

    /// No endpoint answered at all
    #[error("all {attempted} endpoints unreachable: {reason}")]
    Unreachable { attempted: usize, reason: String },
}

fn join_endpoints(endpoints: &[Endpoint]) -> String {
    endpoints
        .iter()
        .map(Endpoint::name)
        .collect::<Vec<_>>()
        .join(", ")
}
