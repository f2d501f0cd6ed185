//! # Task Ledger Service
//!
//! Owns the task collection for the current session. Every request captures
//! the session epoch; a response whose epoch is no longer current is dropped
//! and the caller sees `AuthRequired`.
//!
//! Listings are ordered by a ledger-local sequence number: a listing issued
//! before one that has already been applied is stale and ignored.

use std::sync::Arc;

use async_trait::async_trait;
use ic_01_session::SessionApi;
use parking_lot::Mutex;
use shared_types::{ClientError, ClientResult, Credentials, SessionEpoch, Task, TaskId};
use tracing::{debug, info, warn};

use crate::domain::{ImageUpload, LedgerSnapshot, StatusRegression, TaskCollection};
use crate::ports::inbound::TaskLedgerApi;
use crate::ports::outbound::TaskBackend;

/// Regressions kept for inspection; older ones are dropped.
const MAX_REGRESSIONS: usize = 32;

#[derive(Debug, Default)]
struct LedgerState {
    collection: TaskCollection,
    /// Session the collection belongs to.
    owner: Option<SessionEpoch>,
    seq: u64,
    last_applied_fetch: Option<u64>,
    fetches_in_flight: usize,
    submissions_in_flight: usize,
    error: Option<String>,
    regressions: Vec<StatusRegression>,
}

impl LedgerState {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Forgets another session's tasks before applying a response of `epoch`.
    fn adopt(&mut self, epoch: SessionEpoch) {
        if self.owner == Some(epoch) {
            return;
        }
        if self.owner.is_some() {
            debug!(epoch = %epoch, "session changed, resetting task collection");
        }
        self.reset();
        self.owner = Some(epoch);
    }

    fn reset(&mut self) {
        self.collection.clear();
        self.owner = None;
        self.last_applied_fetch = None;
        self.error = None;
        self.regressions.clear();
    }

    fn flag(&mut self, regressions: impl IntoIterator<Item = StatusRegression>) {
        for regression in regressions {
            warn!(
                task_id = %regression.task_id,
                current = %regression.current,
                reported = %regression.reported,
                "backend reported an older task status, keeping current"
            );
            self.regressions.push(regression);
        }
        let overflow = self.regressions.len().saturating_sub(MAX_REGRESSIONS);
        self.regressions.drain(..overflow);
    }
}

#[derive(Clone, Copy)]
enum Activity {
    Fetch,
    Submit,
}

/// Keeps the loading/submitting flags accurate even if the calling future is
/// dropped mid-request.
struct InFlight<'a> {
    state: &'a Mutex<LedgerState>,
    activity: Activity,
}

impl<'a> InFlight<'a> {
    fn start(state: &'a Mutex<LedgerState>, activity: Activity) -> Self {
        {
            let mut st = state.lock();
            match activity {
                Activity::Fetch => st.fetches_in_flight += 1,
                Activity::Submit => st.submissions_in_flight += 1,
            }
        }
        Self { state, activity }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut st = self.state.lock();
        match self.activity {
            Activity::Fetch => st.fetches_in_flight = st.fetches_in_flight.saturating_sub(1),
            Activity::Submit => {
                st.submissions_in_flight = st.submissions_in_flight.saturating_sub(1)
            }
        }
    }
}

pub struct TaskLedger {
    backend: Arc<dyn TaskBackend>,
    session: Arc<dyn SessionApi>,
    state: Mutex<LedgerState>,
}

impl TaskLedger {
    pub fn new(backend: Arc<dyn TaskBackend>, session: Arc<dyn SessionApi>) -> Self {
        Self {
            backend,
            session,
            state: Mutex::new(LedgerState::default()),
        }
    }

    fn credentials_for(&self, action: &str) -> ClientResult<Credentials> {
        self.session.credentials().map_err(|err| {
            self.state.lock().error = Some(format!("Failed to {action}: {err}"));
            err
        })
    }
}

#[async_trait]
impl TaskLedgerApi for TaskLedger {
    async fn fetch_tasks(&self) -> ClientResult<Vec<Task>> {
        let credentials = self.credentials_for("fetch tasks")?;
        let started = {
            let mut st = self.state.lock();
            st.error = None;
            st.next_seq()
        };

        let in_flight = InFlight::start(&self.state, Activity::Fetch);
        let result = self.backend.list_tasks(&credentials.token).await;
        drop(in_flight);

        let mut st = self.state.lock();
        if !self.session.is_current(credentials.epoch) {
            debug!(epoch = %credentials.epoch, "discarding task listing for ended session");
            return Err(ClientError::AuthRequired);
        }
        match result {
            Ok(listing) => {
                st.adopt(credentials.epoch);
                if st.last_applied_fetch.is_some_and(|last| started < last) {
                    debug!(started, "discarding task listing older than the applied one");
                    return Ok(st.collection.tasks());
                }
                st.last_applied_fetch = Some(started);
                let report = st.collection.replace_with_listing(listing, started);
                debug!(
                    listed = report.listed,
                    retained_local = report.retained_local,
                    duplicates = report.duplicates,
                    "task listing applied"
                );
                st.flag(report.regressions);
                Ok(st.collection.tasks())
            }
            Err(err) => {
                let err = ClientError::from(err);
                warn!(error = %err, "task listing failed");
                st.error = Some(format!("Failed to fetch tasks: {err}"));
                Err(err)
            }
        }
    }

    async fn create_task(
        &self,
        image: ImageUpload,
        metadata: Option<String>,
    ) -> ClientResult<Task> {
        let metadata = metadata
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        let credentials = self.credentials_for("create task")?;
        self.state.lock().error = None;

        let in_flight = InFlight::start(&self.state, Activity::Submit);
        let result = self
            .backend
            .create_task(&credentials.token, &image, metadata.as_deref())
            .await;
        drop(in_flight);

        let mut st = self.state.lock();
        if !self.session.is_current(credentials.epoch) {
            debug!(epoch = %credentials.epoch, "discarding created task for ended session");
            return Err(ClientError::AuthRequired);
        }
        match result {
            Ok(task) => {
                st.adopt(credentials.epoch);
                let seq = st.next_seq();
                let regression = st.collection.insert_created(task.clone(), seq);
                st.flag(regression);
                info!(task_id = %task.id(), status = %task.status(), file = image.file_name(), "task created");
                Ok(task)
            }
            Err(err) => {
                let err = ClientError::from(err);
                warn!(error = %err, file = image.file_name(), "task submission failed");
                st.error = Some(format!("Failed to create task: {err}"));
                Err(err)
            }
        }
    }

    async fn fetch_task(&self, id: TaskId) -> ClientResult<Task> {
        let credentials = self.credentials_for("fetch task")?;
        let result = self.backend.get_task(&credentials.token, id).await;

        let mut st = self.state.lock();
        if !self.session.is_current(credentials.epoch) {
            return Err(ClientError::AuthRequired);
        }
        match result {
            Ok(task) if task.id() != id => {
                let err = ClientError::NetworkOrServer(format!(
                    "requested task {id} but backend returned task {}",
                    task.id()
                ));
                st.error = Some(format!("Failed to fetch task: {err}"));
                Err(err)
            }
            Ok(task) => {
                st.adopt(credentials.epoch);
                let seq = st.next_seq();
                let regression = st.collection.upsert(task, seq);
                st.flag(regression);
                st.collection
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| ClientError::NetworkOrServer(format!("task {id} vanished")))
            }
            Err(err) => {
                let err = ClientError::from(err);
                warn!(task_id = %id, error = %err, "task refresh failed");
                st.error = Some(format!("Failed to fetch task: {err}"));
                Err(err)
            }
        }
    }

    fn snapshot(&self) -> LedgerSnapshot {
        let st = self.state.lock();
        LedgerSnapshot {
            tasks: st.collection.tasks(),
            loading: st.fetches_in_flight > 0,
            submitting: st.submissions_in_flight > 0,
            error: st.error.clone(),
            regressions: st.regressions.clone(),
        }
    }

    fn clear(&self) {
        self.state.lock().reset();
        debug!("task ledger cleared");
    }
}
