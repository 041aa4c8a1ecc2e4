//! Async machinery of the opsdeck mutation core.
//!
//! Three pieces, leaves first:
//!
//! - [`tracker`]: polls a server job until it reaches a terminal state,
//!   with a timeout ceiling, bounded failure tolerance, and cooperative
//!   cancellation via [`CancelToken`].
//! - [`coordinator`]: applies an optimistic patch to the store before the
//!   remote call, then merges the confirmation or rolls back the snapshot.
//! - [`bulk`]: fans one user action out into many coordinator mutations and
//!   reports a single aggregate outcome.
//!
//! All operations are cooperative async tasks; the only suspension points
//! are the awaited gateway calls and poll sleeps.

pub mod bulk;
pub mod cancel;
pub mod coordinator;
pub mod tracker;

pub use bulk::{run_all, BulkFailure, BulkResult};
pub use cancel::CancelToken;
pub use coordinator::Coordinator;
pub use tracker::{track, TrackOptions, DEFAULT_MAX_POLL_FAILURES};
