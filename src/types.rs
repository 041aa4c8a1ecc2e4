//! Public types for the opsdeck unified API.
//!
//! This module re-exports types from internal crates with a clean public
//! interface.

// ============================================================================
// Public API types - these are what users should use
// ============================================================================

// Entity contract and server-field merging
pub use opsdeck_core::{merge_confirmed, ConfirmedFields, Entity, RemoteOutcome};

// Store interface and default implementation
pub use opsdeck_core::{EntityStore, MemoryStore};

// Job model
pub use opsdeck_core::{JobHandle, JobId, JobPoll, JobStatus, TerminalStatus};

// Error taxonomy
pub use opsdeck_core::{MutationError, OpsResult, RemoteError};

// Coordinator and orchestration
pub use opsdeck_engine::{run_all, BulkFailure, BulkResult, Coordinator};

// Job tracking
pub use opsdeck_engine::{track, CancelToken, TrackOptions, DEFAULT_MAX_POLL_FAILURES};
