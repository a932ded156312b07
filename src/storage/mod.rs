//! Storage backends for persisted dashboard settings
//!
//! ## Backends
//!
//! - **SQLite** (default, `storage-sqlite` feature): settings survive restarts
//! - **In-Memory**: no persistence, for tests or read-only setups
//!
//! ## Usage
//!
//! ```no_run
//! use pulseboard::storage::{SettingsBackend, sqlite::SqliteBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::new("./settings.db").await?;
//!     backend.set("theme", "\"dark\"").await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{HealthStatus, SettingsBackend};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
