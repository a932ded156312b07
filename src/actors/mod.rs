//! Actor that drives the dashboard
//!
//! A single scheduler task owns all mutable dashboard state. Everything else
//! talks to it through its handle.
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: mpsc command channel for control messages
//! 2. **Events**: broadcast channel of [`DashboardEvent`](messages::DashboardEvent) for fan-out
//! 3. **Request/Response**: oneshot channels for queries

pub mod messages;
pub mod scheduler;

pub use scheduler::{SchedulerActor, SchedulerHandle};
