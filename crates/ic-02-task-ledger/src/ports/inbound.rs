//! # Inbound Port - TaskLedgerApi
//!
//! Consumed by the submission guard and the composition layer.

use async_trait::async_trait;
use shared_types::{ClientResult, Task, TaskId};

use crate::domain::{ImageUpload, LedgerSnapshot};

#[async_trait]
pub trait TaskLedgerApi: Send + Sync {
    /// Replaces the collection with the backend's listing.
    ///
    /// # Errors
    /// - `AuthRequired`: no session, or the session changed mid-flight
    /// - `NetworkOrServer`: the collection is left unchanged
    async fn fetch_tasks(&self) -> ClientResult<Vec<Task>>;

    /// Submits an image; on success the created task is at the front of the
    /// collection.
    async fn create_task(&self, image: ImageUpload, metadata: Option<String>)
        -> ClientResult<Task>;

    /// Refreshes a single task.
    async fn fetch_task(&self, id: TaskId) -> ClientResult<Task>;

    fn snapshot(&self) -> LedgerSnapshot;

    /// Forgets every task. Used on logout.
    fn clear(&self);
}
