//! # Task Collection
//!
//! Ordered, id-keyed task store. The order vector is what the user sees; the
//! map is what reconciliation works on.
//!
//! ## Reconciliation rules
//!
//! | Event | Effect |
//! |-------|--------|
//! | Listing applied | Order and membership replaced by the listing |
//! | Listing reports an older status | Current task kept, regression flagged |
//! | Local task newer than the listing's start | Kept at the front |
//! | Local task older than the listing's start, absent | Dropped (backend authority) |
//! | Task created locally | Inserted at the front |
//! | Unknown task from a single-task refresh | Inserted at the front, local until listed |

use std::collections::{HashMap, HashSet};

use shared_types::{Task, TaskId, TaskStatus};

/// A backend response that would have moved a task backwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRegression {
    pub task_id: TaskId,
    pub current: TaskStatus,
    pub reported: TaskStatus,
}

/// Outcome of applying one listing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub listed: usize,
    pub retained_local: usize,
    pub duplicates: usize,
    pub regressions: Vec<StatusRegression>,
}

#[derive(Debug, Default, Clone)]
pub struct TaskCollection {
    order: Vec<TaskId>,
    by_id: HashMap<TaskId, Task>,
    /// Tasks added by a submission or single-task refresh that no listing has
    /// confirmed yet, with the ledger sequence number at which they were added.
    unconfirmed: HashMap<TaskId, u64>,
}

impl TaskCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.by_id.get(id)
    }

    pub fn ids(&self) -> &[TaskId] {
        &self.order
    }

    /// Tasks in display order.
    pub fn tasks(&self) -> Vec<Task> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.by_id.clear();
        self.unconfirmed.clear();
    }

    /// Replaces the collection with a backend listing, preserving the
    /// listing's order.
    ///
    /// `fetch_started` is the ledger sequence number taken when the listing
    /// request was issued; local creations with a later number cannot have
    /// been visible to it and are kept.
    pub fn replace_with_listing(&mut self, listing: Vec<Task>, fetch_started: u64) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut order = Vec::with_capacity(listing.len());
        let mut by_id = HashMap::with_capacity(listing.len());

        for incoming in listing {
            let id = incoming.id();
            if by_id.contains_key(&id) {
                report.duplicates += 1;
                continue;
            }
            let task = match self.by_id.get(&id) {
                Some(current) => merge_forward(current, incoming, &mut report.regressions),
                None => incoming,
            };
            order.push(id);
            by_id.insert(id, task);
        }
        report.listed = order.len();

        let retained: Vec<TaskId> = self
            .order
            .iter()
            .copied()
            .filter(|id| !by_id.contains_key(id))
            .filter(|id| {
                self.unconfirmed
                    .get(id)
                    .is_some_and(|added| *added > fetch_started)
            })
            .collect();
        let retained_set: HashSet<TaskId> = retained.iter().copied().collect();

        for id in &retained {
            if let Some(task) = self.by_id.remove(id) {
                by_id.insert(*id, task);
            }
        }
        report.retained_local = retained.len();

        let mut merged = retained;
        merged.extend(order);
        self.order = merged;
        self.by_id = by_id;
        self.unconfirmed.retain(|id, _| retained_set.contains(id));

        report
    }

    /// Adds a task returned by a successful submission to the front.
    ///
    /// If a concurrent listing already delivered the task, it keeps its
    /// position and is merged forward instead.
    pub fn insert_created(&mut self, task: Task, added_at: u64) -> Option<StatusRegression> {
        self.upsert(task, added_at)
    }

    /// Applies a single-task refresh received at sequence `seen_at`.
    ///
    /// Known tasks are merged forward in place. Unknown ones go to the front
    /// and survive listings issued before `seen_at`, like local creations.
    pub fn upsert(&mut self, task: Task, seen_at: u64) -> Option<StatusRegression> {
        let id = task.id();
        if self.by_id.contains_key(&id) {
            return self.merge_in_place(task);
        }
        self.order.insert(0, id);
        self.by_id.insert(id, task);
        self.unconfirmed.insert(id, seen_at);
        None
    }

    fn merge_in_place(&mut self, incoming: Task) -> Option<StatusRegression> {
        let id = incoming.id();
        let current = self.by_id.get(&id)?;
        let mut regressions = Vec::new();
        let merged = merge_forward(current, incoming, &mut regressions);
        self.by_id.insert(id, merged);
        regressions.pop()
    }
}

/// Takes the incoming version unless it would move the status backwards.
fn merge_forward(current: &Task, incoming: Task, regressions: &mut Vec<StatusRegression>) -> Task {
    if current.status().can_advance_to(incoming.status()) {
        incoming
    } else {
        regressions.push(StatusRegression {
            task_id: current.id(),
            current: current.status(),
            reported: incoming.status(),
        });
        current.clone()
    }
}

/// Observable ledger state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub tasks: Vec<Task>,
    pub loading: bool,
    pub submitting: bool,
    pub error: Option<String>,
    pub regressions: Vec<StatusRegression>,
}

impl LedgerSnapshot {
    /// Tasks the backend has not finished with yet.
    pub fn pending_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_terminal()).count()
    }

    pub fn all_settled(&self) -> bool {
        self.pending_count() == 0
    }
}
