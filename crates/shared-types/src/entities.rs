//! # Core Domain Entities
//!
//! Defines the entities exchanged with the backend.
//!
//! ## Clusters
//!
//! - **Identity**: `User`, `UserId`
//! - **Processing**: `Task`, `TaskRecord`, `TaskStatus`, `TaskId`
//! - **Payments**: `PaymentOrder`, `OrderId`, `OrderStatus`

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::errors::TaskInvariantError;

/// Timestamps are normalised to UTC on decode.
pub type Timestamp = DateTime<Utc>;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Backend-assigned user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The authenticated user as reported by the backend.
///
/// `credits` is only ever replaced wholesale by a backend response; no
/// component adjusts it locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    /// The backend stores credits as a float column; fractional parts are
    /// truncated and negative values are rejected.
    #[serde(deserialize_with = "credits_from_number")]
    pub credits: u64,
}

impl User {
    /// Name shown to the payment provider, falling back to the email.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

fn credits_from_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(credits) = number.as_u64() {
        return Ok(credits);
    }
    match number.as_f64() {
        Some(value) if value.is_finite() && value >= 0.0 => Ok(value.floor() as u64),
        _ => Err(de::Error::custom(format!(
            "credit balance must be a non-negative number, got {number}"
        ))),
    }
}

// =============================================================================
// CLUSTER B: PROCESSING TASKS
// =============================================================================

/// Backend-assigned task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a processing task.
///
/// ```text
/// [queued] ──→ [processing] ──→ [completed]
///     │              │
///     └──────────────┴────────→ [failed]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Accepted by the backend, waiting for a worker. The backend model
    /// calls this `pending`.
    #[serde(alias = "pending")]
    Queued,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Position in the lifecycle. Both terminal states share the last stage.
    pub const fn stage(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether an observed task may move from `self` to `next`.
    ///
    /// Repeating the same status is allowed; terminal states are final.
    pub fn can_advance_to(self, next: TaskStatus) -> bool {
        if self == next {
            return true;
        }
        !self.is_terminal() && next.stage() > self.stage()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task exactly as the backend serialises it.
///
/// Use `Task::try_from` to obtain a validated task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub image_path: String,
    #[serde(default, deserialize_with = "metadata_as_text")]
    pub metadata: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub result_path: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub credits_used: u32,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: Timestamp,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub updated_at: Timestamp,
}

/// A validated processing task.
///
/// Invariants (checked on construction):
/// - `result_path` is present iff `status == Completed`
/// - `error_message` is present iff `status == Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaskRecord", into = "TaskRecord")]
pub struct Task {
    id: TaskId,
    image_path: String,
    metadata: Option<String>,
    status: TaskStatus,
    result_path: Option<String>,
    error_message: Option<String>,
    credits_used: u32,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Task {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn image_path(&self) -> &str {
        &self.image_path
    }

    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn result_path(&self) -> Option<&str> {
        self.result_path.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn credits_used(&self) -> u32 {
        self.credits_used
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl TryFrom<TaskRecord> for Task {
    type Error = TaskInvariantError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        let id = record.id;
        let status = record.status;
        let result_path = non_blank(record.result_path);
        let error_message = non_blank(record.error_message);

        match (status == TaskStatus::Completed, result_path.is_some()) {
            (true, false) => return Err(TaskInvariantError::MissingResultPath { id }),
            (false, true) => return Err(TaskInvariantError::UnexpectedResultPath { id, status }),
            _ => {}
        }
        match (status == TaskStatus::Failed, error_message.is_some()) {
            (true, false) => return Err(TaskInvariantError::MissingErrorMessage { id }),
            (false, true) => {
                return Err(TaskInvariantError::UnexpectedErrorMessage { id, status })
            }
            _ => {}
        }

        Ok(Self {
            id,
            image_path: record.image_path,
            metadata: non_blank(record.metadata),
            status,
            result_path,
            error_message,
            credits_used: record.credits_used,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            image_path: task.image_path,
            metadata: task.metadata,
            status: task.status,
            result_path: task.result_path,
            error_message: task.error_message,
            credits_used: task.credits_used,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// The backend stores metadata in a JSON column; anything that is not a
/// string is kept in its JSON text form.
fn metadata_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp `{raw}`")))
}

/// Parses RFC 3339 timestamps and the offset-less form the backend's ORM
/// emits (treated as UTC).
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

// =============================================================================
// CLUSTER C: PAYMENTS
// =============================================================================

/// Provider-scoped order handle created by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A top-up order as returned by the create-order endpoint.
///
/// `amount` is authoritative from this response only and is never re-read
/// from a provider callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub order_id: OrderId,
    pub amount: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "INR".to_string()
}

/// Status of the order during one top-up attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Created,
    AwaitingProvider,
    Verifying,
    Verified,
    Failed,
}

impl OrderStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AwaitingProvider => "awaiting-provider",
            Self::Verifying => "verifying",
            Self::Verified => "verified",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
