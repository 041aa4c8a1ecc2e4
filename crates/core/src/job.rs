//! Job model for server-side asynchronous operations.
//!
//! Some mutations do not complete within a single request/response cycle:
//! the backend accepts them and returns a job id (an inventory sync run, a
//! bulk reorder dispatch). The tracker polls a status endpoint until the job
//! reaches a terminal state.
//!
//! ## Job lifecycle
//!
//! ```text
//! [accepted] --> Pending --> Running --> Succeeded | Failed | Cancelled
//! ```
//!
//! A [`JobHandle`] is created when a mutation returns "accepted, in
//! progress" and is never reused after a terminal status. The client may
//! additionally synthesize `TimedOut`, `Unreachable`, or `CancelledByCaller`
//! terminal outcomes that the server never reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a server-side asynchronous job.
///
/// Opaque to the client; minted by the backend when it accepts a
/// long-running operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// View the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        JobId(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        JobId(id.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-reported job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, not yet started
    Pending,
    /// Executing
    Running,
    /// Completed successfully
    Succeeded,
    /// Completed with an error
    Failed,
    /// Cancelled on the server side
    Cancelled,
}

impl JobStatus {
    /// True if no further server-side transition occurs from this status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One status-endpoint response for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPoll {
    /// Current server-reported status
    pub status: JobStatus,
    /// Completion fraction in percent, if the endpoint reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

impl JobPoll {
    /// A poll result with no progress figure.
    pub fn new(status: JobStatus) -> Self {
        JobPoll {
            status,
            progress: None,
        }
    }

    /// A poll result carrying a progress percentage.
    pub fn with_progress(status: JobStatus, progress: f64) -> Self {
        JobPoll {
            status,
            progress: Some(progress),
        }
    }
}

/// Handle for a job the backend accepted.
///
/// Created when a mutation resolves to "accepted, in progress"; screens keep
/// it to display submission time while the tracker drives the poll loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHandle {
    /// The backend-minted job id
    pub id: JobId,
    /// When the client observed the acceptance
    pub submitted_at: DateTime<Utc>,
}

impl JobHandle {
    /// Create a handle for a freshly accepted job, stamped now.
    pub fn new(id: JobId) -> Self {
        JobHandle {
            id,
            submitted_at: Utc::now(),
        }
    }
}

/// Final outcome of tracking one job.
///
/// The first three mirror the server's terminal statuses; the rest are
/// synthesized by the client and never appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    /// Server reported `succeeded`
    Succeeded,
    /// Server reported `failed`
    Failed,
    /// Server reported `cancelled`
    Cancelled,
    /// Polling ceiling reached while the job was still pending/running
    TimedOut,
    /// Too many consecutive poll failures; job state unknown
    Unreachable,
    /// The caller cancelled tracking; the server job keeps running
    CancelledByCaller,
}

impl TerminalStatus {
    /// Map a server status to its terminal outcome, if it is terminal.
    pub fn from_status(status: JobStatus) -> Option<Self> {
        match status {
            JobStatus::Succeeded => Some(TerminalStatus::Succeeded),
            JobStatus::Failed => Some(TerminalStatus::Failed),
            JobStatus::Cancelled => Some(TerminalStatus::Cancelled),
            JobStatus::Pending | JobStatus::Running => None,
        }
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminalStatus::Succeeded => "succeeded",
            TerminalStatus::Failed => "failed",
            TerminalStatus::Cancelled => "cancelled",
            TerminalStatus::TimedOut => "timed_out",
            TerminalStatus::Unreachable => "unreachable",
            TerminalStatus::CancelledByCaller => "cancelled_by_caller",
        };
        f.write_str(s)
    }
}
