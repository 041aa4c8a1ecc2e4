//! Error taxonomy for the mutation core.
//!
//! Two layers of errors exist:
//!
//! - [`RemoteError`] is what a gateway call site reports: the backend either
//!   rejected the request (domain error) or could not be reached (transport
//!   error). Call sites produce these; the core consumes them.
//! - [`MutationError`] is what the coordinator surfaces to the caller after
//!   resolution. It folds gateway errors together with the core's own
//!   contract violations and job outcomes.
//!
//! ## Propagation rules
//!
//! | Error | Raised | Store state on return |
//! |-------|--------|-----------------------|
//! | `NotFound` | before any store write or network call | untouched |
//! | `Conflict` | before any store write or network call | untouched |
//! | `RemoteRejected` | after the remote call resolves | rolled back |
//! | `RemoteUnreachable` | after the remote call resolves | rolled back |
//! | `TimedOut` | after job tracking hits the ceiling | rolled back |
//! | `CancelledByCaller` | when job tracking is cancelled | optimistic |

use crate::job::JobId;
use thiserror::Error;

/// Result alias used across the opsdeck crates.
pub type OpsResult<T> = std::result::Result<T, MutationError>;

/// Error reported by a remote operation or status fetch.
///
/// Supplied by the gateway call site; the coordinator and tracker map these
/// into [`MutationError`] variants (and into rollback decisions).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The backend processed the request and refused it (validation failure,
    /// illegal state transition, permission denial).
    #[error("remote rejected the request: {0}")]
    Rejected(String),

    /// The backend could not be reached or did not answer (DNS, connect,
    /// transport timeout). Transport timeouts are ordinary failures here,
    /// not a special case.
    #[error("remote unreachable: {0}")]
    Unreachable(String),
}

/// Error surfaced to the caller of a coordinator or orchestrator operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    /// The entity id is absent from the store. Raised synchronously, before
    /// any optimistic write.
    #[error("entity `{id}` not found in store")]
    NotFound {
        /// The id that was requested
        id: String,
    },

    /// A mutation for this entity is already in flight. Raised synchronously;
    /// callers wait for resolution rather than queueing.
    #[error("mutation already in flight for entity `{id}`")]
    Conflict {
        /// The id with an unresolved mutation
        id: String,
    },

    /// The backend refused the mutation. The store was rolled back to the
    /// pre-mutation snapshot before this error was returned.
    #[error("mutation for `{id}` rejected: {reason}")]
    RemoteRejected {
        /// The entity the mutation targeted
        id: String,
        /// Backend-supplied cause
        reason: String,
    },

    /// The backend could not be reached. The store was rolled back to the
    /// pre-mutation snapshot before this error was returned.
    #[error("mutation for `{id}` failed, remote unreachable: {reason}")]
    RemoteUnreachable {
        /// The entity the mutation targeted
        id: String,
        /// Transport-level cause
        reason: String,
    },

    /// Job tracking reached its polling ceiling without a terminal server
    /// status. The store was rolled back before this error was returned.
    #[error("job `{job_id}` for entity `{id}` timed out")]
    TimedOut {
        /// The entity the mutation targeted
        id: String,
        /// The job that was being tracked
        job_id: JobId,
    },

    /// The caller cancelled job tracking. The store keeps the optimistic
    /// state it held at cancellation time; the server job is not cancelled.
    #[error("tracking of job `{job_id}` for entity `{id}` cancelled by caller")]
    CancelledByCaller {
        /// The entity the mutation targeted
        id: String,
        /// The job whose tracking was cancelled
        job_id: JobId,
    },
}

impl MutationError {
    /// The entity id this error concerns.
    pub fn entity_id(&self) -> &str {
        match self {
            MutationError::NotFound { id }
            | MutationError::Conflict { id }
            | MutationError::RemoteRejected { id, .. }
            | MutationError::RemoteUnreachable { id, .. }
            | MutationError::TimedOut { id, .. }
            | MutationError::CancelledByCaller { id, .. } => id,
        }
    }

    /// True if the store was rolled back before this error was returned.
    ///
    /// `NotFound`/`Conflict` never wrote, and `CancelledByCaller` leaves the
    /// optimistic state in place; everything else rolled back.
    pub fn rolled_back(&self) -> bool {
        matches!(
            self,
            MutationError::RemoteRejected { .. }
                | MutationError::RemoteUnreachable { .. }
                | MutationError::TimedOut { .. }
        )
    }
}
