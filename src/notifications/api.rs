use async_trait::async_trait;

use crate::error::BackendError;
use crate::notifications::{LoadOptions, Notification};

/// REST operations the notification store relies on.
///
/// Implemented against the real backend by
/// [`AuthedBackend`](crate::backend::AuthedBackend); tests use an in-memory fake.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn list(&self, options: &LoadOptions) -> Result<Vec<Notification>, BackendError>;

    async fn unread_count(&self) -> Result<u64, BackendError>;

    async fn mark_read(&self, id: &str) -> Result<(), BackendError>;

    async fn mark_all_read(&self) -> Result<(), BackendError>;

    async fn delete(&self, id: &str) -> Result<(), BackendError>;
}
