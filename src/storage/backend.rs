//! Settings backend trait definition

use std::collections::HashMap;

use async_trait::async_trait;

use super::error::StorageResult;

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// String key/value store for persisted dashboard settings
///
/// Values are opaque strings (usually JSON); interpreting them and
/// recovering from corrupt entries is up to [`Settings`](crate::settings::Settings).
///
/// Implementations must be `Send + Sync` as they are shared between the
/// scheduler task and the binary.
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    /// Read a value; `None` if the key was never written
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Insert or overwrite a value
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a value. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// All stored keys, sorted
    async fn keys(&self) -> StorageResult<Vec<String>>;

    /// Lightweight check that the backend is operational
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
