//! Outbound (Driven) ports for the Task Ledger.

use async_trait::async_trait;
use shared_types::{AuthToken, BackendError, Task, TaskId};

use crate::domain::ImageUpload;

/// Task endpoints of the backend.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// `GET /tasks`, newest first.
    async fn list_tasks(&self, token: &AuthToken) -> Result<Vec<Task>, BackendError>;

    /// `GET /tasks/{id}`.
    async fn get_task(&self, token: &AuthToken, id: TaskId) -> Result<Task, BackendError>;

    /// `POST /tasks` as multipart with parts `image` and optional `metadata`.
    async fn create_task(
        &self,
        token: &AuthToken,
        image: &ImageUpload,
        metadata: Option<&str>,
    ) -> Result<Task, BackendError>;
}

/// Builds a task that satisfies the status invariants.
#[cfg(test)]
pub fn task_fixture(id: u64, status: shared_types::TaskStatus) -> Task {
    use shared_types::{TaskRecord, TaskStatus};

    let now = chrono::Utc::now();
    let record = TaskRecord {
        id: TaskId(id),
        image_path: format!("uploads/{id}.png"),
        metadata: None,
        status,
        result_path: (status == TaskStatus::Completed).then(|| format!("results/{id}.png")),
        error_message: (status == TaskStatus::Failed).then(|| "worker crashed".to_string()),
        credits_used: 1,
        created_at: now,
        updated_at: now,
    };
    Task::try_from(record).expect("fixture satisfies invariants")
}

/// Mock backend with scripted responses for testing.
#[cfg(test)]
#[derive(Default)]
pub struct MockTaskBackend {
    pub listings: parking_lot::Mutex<
        std::collections::VecDeque<(
            Option<std::sync::Arc<tokio::sync::Notify>>,
            Result<Vec<Task>, BackendError>,
        )>,
    >,
    pub created: parking_lot::Mutex<std::collections::VecDeque<Result<Task, BackendError>>>,
    pub singles: parking_lot::Mutex<std::collections::VecDeque<Result<Task, BackendError>>>,
    pub list_calls: std::sync::atomic::AtomicUsize,
    pub create_calls: std::sync::atomic::AtomicUsize,
    pub last_metadata: parking_lot::Mutex<Option<String>>,
}

#[cfg(test)]
impl MockTaskBackend {
    pub fn push_listing(&self, listing: Result<Vec<Task>, BackendError>) {
        self.listings.lock().push_back((None, listing));
    }

    /// The listing is returned only after `gate` is notified.
    pub fn push_gated_listing(
        &self,
        gate: std::sync::Arc<tokio::sync::Notify>,
        listing: Result<Vec<Task>, BackendError>,
    ) {
        self.listings.lock().push_back((Some(gate), listing));
    }

    pub fn push_created(&self, created: Result<Task, BackendError>) {
        self.created.lock().push_back(created);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl TaskBackend for MockTaskBackend {
    async fn list_tasks(&self, _token: &AuthToken) -> Result<Vec<Task>, BackendError> {
        self.list_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let next = self.listings.lock().pop_front();
        match next {
            Some((gate, listing)) => {
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                listing
            }
            None => Ok(Vec::new()),
        }
    }

    async fn get_task(&self, _token: &AuthToken, _id: TaskId) -> Result<Task, BackendError> {
        self.singles
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Rejected { status: 404, detail: "Task not found".into() }))
    }

    async fn create_task(
        &self,
        _token: &AuthToken,
        _image: &ImageUpload,
        metadata: Option<&str>,
    ) -> Result<Task, BackendError> {
        self.create_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        *self.last_metadata.lock() = metadata.map(str::to_string);
        self.created
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Transport("no scripted response".into())))
    }
}
