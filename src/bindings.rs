//! In-memory user → device bindings.
//!
//! Maps a chat user id to the device their commands are routed to. One
//! binding per user, last write wins; several users may point at the same
//! device. Process lifetime only, nothing is persisted.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Thread-safe handle to the binding map. Cheap to clone; one instance is
/// created at startup and shared through `AppState`.
#[derive(Clone, Default)]
pub struct DeviceBindings {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl DeviceBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `user_id` to `device_id`, replacing any existing binding.
    pub async fn set(&self, user_id: &str, device_id: &str) {
        self.inner
            .write()
            .await
            .insert(user_id.to_string(), device_id.to_string());
    }

    /// Device currently bound to `user_id`, if any.
    pub async fn get(&self, user_id: &str) -> Option<String> {
        self.inner.read().await.get(user_id).cloned()
    }
}
