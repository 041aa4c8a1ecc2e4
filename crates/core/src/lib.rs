//! Entity, store, and job model for the opsdeck mutation core.
//!
//! This crate holds the synchronous building blocks: the [`Entity`]
//! contract, the keyed in-memory [`store`], the [`job`] lifecycle model,
//! and the [`error`] taxonomy. The async machinery (coordinator, tracker,
//! bulk orchestrator) lives in `opsdeck-engine`.

pub mod entity;
pub mod error;
pub mod job;
pub mod store;

pub use entity::{merge_confirmed, ConfirmedFields, Entity, RemoteOutcome};
pub use error::{MutationError, OpsResult, RemoteError};
pub use job::{JobHandle, JobId, JobPoll, JobStatus, TerminalStatus};
pub use store::{EntityStore, MemoryStore};
