//! Optimistic mutation coordinator.
//!
//! The coordinator keeps a screen's entity store consistent with the remote
//! system of record while hiding request latency: it writes the patched
//! entity into the store before the network call, then either merges the
//! server's confirmation or restores the pre-mutation snapshot.
//!
//! ## Guarantees
//!
//! - At every point the store holds either the pre-mutation state, a
//!   server-confirmed state, or the caller-authorized optimistic state.
//!   It never holds state from a failed remote call.
//! - Exactly one store write before the remote call and exactly one after
//!   (confirmed merge or rollback).
//! - At most one in-flight mutation per entity id; a second `apply` on the
//!   same id resolves `Conflict` without queueing or overwriting.
//!
//! ## Ownership
//!
//! The coordinator holds an `Arc` to the screen's store and never retains
//! entity state beyond one resolution cycle. One coordinator per screen,
//! torn down with it.

use crate::cancel::CancelToken;
use crate::tracker::{track, TrackOptions};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use opsdeck_core::{
    merge_confirmed, ConfirmedFields, Entity, EntityStore, JobHandle, JobId, JobPoll,
    MutationError, OpsResult, RemoteError, RemoteOutcome, TerminalStatus,
};
use std::future::Future;
use std::sync::Arc;

/// Coordinates optimistic mutations against one entity store.
pub struct Coordinator<S> {
    store: Arc<S>,
    in_flight: DashMap<String, ()>,
}

/// Releases the in-flight claim for an entity when the mutation resolves.
struct FlightGuard<'a> {
    registry: &'a DashMap<String, ()>,
    id: String,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}

impl<S> Coordinator<S> {
    /// Create a coordinator over the screen's store.
    pub fn new(store: Arc<S>) -> Self {
        Coordinator {
            store,
            in_flight: DashMap::new(),
        }
    }

    /// The store this coordinator mutates.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// True if a mutation for `id` is currently unresolved.
    pub fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight.contains_key(id)
    }

    /// Apply an optimistic mutation backed by a request/response operation.
    ///
    /// `patch` is a pure function computing the optimistic state; it must
    /// not fail and must not change the entity id. `remote` receives the
    /// optimistic entity as its payload and returns the server-confirmed
    /// field set (full or partial).
    ///
    /// ## Errors
    ///
    /// - `NotFound`: `id` absent from the store (raised before any write)
    /// - `Conflict`: a mutation for `id` is already in flight (before any write)
    /// - `RemoteRejected` / `RemoteUnreachable`: remote failed; store rolled back
    pub async fn apply<E, P, R, Fut>(&self, id: &str, patch: P, remote: R) -> OpsResult<E>
    where
        S: EntityStore<E>,
        E: Entity,
        P: FnOnce(&E) -> E,
        R: FnOnce(E) -> Fut,
        Fut: Future<Output = Result<ConfirmedFields, RemoteError>>,
    {
        let (_guard, snapshot, optimistic) = self.begin(id, patch)?;

        match remote(optimistic.clone()).await {
            Ok(confirmed) => self.finish_confirmed(id, optimistic, &confirmed, snapshot),
            Err(err) => Err(self.rollback(id, snapshot, remote_to_mutation(id, err))),
        }
    }

    /// Apply an optimistic mutation whose remote operation may resolve as a
    /// long-running job.
    ///
    /// If `remote` returns [`RemoteOutcome::JobAccepted`], the coordinator
    /// tracks the job with `fetch_status` under `options`. On terminal
    /// success, `confirm` supplies the server-confirmed field set to merge
    /// (`None` keeps the optimistic state, which the job's success has
    /// confirmed). On `failed`, `timed_out`, or `unreachable` the store is
    /// rolled back.
    ///
    /// Cancelling `cancel` stops tracking only: the store keeps the
    /// optimistic state it held at cancellation time and the call resolves
    /// `CancelledByCaller`; the server job is not cancelled.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_tracked<E, P, R, RFut, SF, SFut, C, CFut>(
        &self,
        id: &str,
        patch: P,
        remote: R,
        fetch_status: SF,
        confirm: C,
        options: &TrackOptions,
        cancel: &CancelToken,
    ) -> OpsResult<E>
    where
        S: EntityStore<E>,
        E: Entity,
        P: FnOnce(&E) -> E,
        R: FnOnce(E) -> RFut,
        RFut: Future<Output = Result<RemoteOutcome, RemoteError>>,
        SF: FnMut(JobId) -> SFut,
        SFut: Future<Output = Result<JobPoll, RemoteError>>,
        C: FnOnce(JobId) -> CFut,
        CFut: Future<Output = Option<ConfirmedFields>>,
    {
        let (_guard, snapshot, optimistic) = self.begin(id, patch)?;

        let outcome = match remote(optimistic.clone()).await {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.rollback(id, snapshot, remote_to_mutation(id, err))),
        };

        let job_id = match outcome {
            RemoteOutcome::Confirmed(confirmed) => {
                return self.finish_confirmed(id, optimistic, &confirmed, snapshot);
            }
            RemoteOutcome::JobAccepted { job_id } => job_id,
        };

        let handle = JobHandle::new(job_id);
        tracing::info!(
            target: "opsdeck::coordinator",
            entity = id,
            job = %handle.id,
            submitted_at = %handle.submitted_at,
            "mutation accepted as job"
        );

        match track(&handle.id, fetch_status, options, cancel).await {
            TerminalStatus::Succeeded => match confirm(handle.id.clone()).await {
                Some(confirmed) => self.finish_confirmed(id, optimistic, &confirmed, snapshot),
                None => {
                    // Job success confirms the optimistic state as-is; the
                    // write keeps the one-write-after-resolution rule.
                    self.store.set(id, optimistic.clone());
                    tracing::debug!(
                        target: "opsdeck::coordinator",
                        entity = id,
                        job = %handle.id,
                        "job succeeded, optimistic state confirmed"
                    );
                    Ok(optimistic)
                }
            },
            TerminalStatus::Failed => Err(self.rollback(
                id,
                snapshot,
                MutationError::RemoteRejected {
                    id: id.to_string(),
                    reason: format!("job `{}` failed", handle.id),
                },
            )),
            TerminalStatus::Cancelled => Err(self.rollback(
                id,
                snapshot,
                MutationError::RemoteRejected {
                    id: id.to_string(),
                    reason: format!("job `{}` cancelled on server", handle.id),
                },
            )),
            TerminalStatus::TimedOut => Err(self.rollback(
                id,
                snapshot,
                MutationError::TimedOut {
                    id: id.to_string(),
                    job_id: handle.id,
                },
            )),
            TerminalStatus::Unreachable => Err(self.rollback(
                id,
                snapshot,
                MutationError::RemoteUnreachable {
                    id: id.to_string(),
                    reason: format!("status polling for job `{}` unreachable", handle.id),
                },
            )),
            TerminalStatus::CancelledByCaller => {
                tracing::warn!(
                    target: "opsdeck::coordinator",
                    entity = id,
                    job = %handle.id,
                    "tracking cancelled; entity left in optimistic state"
                );
                Err(MutationError::CancelledByCaller {
                    id: id.to_string(),
                    job_id: handle.id,
                })
            }
        }
    }

    /// Claim the in-flight slot, snapshot the entity, write the optimistic
    /// state. `NotFound`/`Conflict` are raised here, before any write.
    fn begin<E, P>(&self, id: &str, patch: P) -> OpsResult<(FlightGuard<'_>, E, E)>
    where
        S: EntityStore<E>,
        E: Entity,
        P: FnOnce(&E) -> E,
    {
        match self.in_flight.entry(id.to_string()) {
            Entry::Occupied(_) => {
                return Err(MutationError::Conflict { id: id.to_string() });
            }
            Entry::Vacant(slot) => {
                slot.insert(());
            }
        }
        let guard = FlightGuard {
            registry: &self.in_flight,
            id: id.to_string(),
        };

        let current = match self.store.get(id) {
            Some(entity) => entity,
            None => {
                return Err(MutationError::NotFound { id: id.to_string() });
            }
        };

        let snapshot = current.clone();
        let optimistic = patch(&current);
        self.store.set(id, optimistic.clone());
        tracing::debug!(target: "opsdeck::coordinator", entity = id, "optimistic write");

        Ok((guard, snapshot, optimistic))
    }

    /// Merge the confirmed fields over the optimistic entity and write the
    /// result. An unmergeable payload rolls back like any rejection.
    fn finish_confirmed<E>(
        &self,
        id: &str,
        optimistic: E,
        confirmed: &ConfirmedFields,
        snapshot: E,
    ) -> OpsResult<E>
    where
        S: EntityStore<E>,
        E: Entity,
    {
        match merge_confirmed(&optimistic, confirmed) {
            Ok(merged) => {
                self.store.set(id, merged.clone());
                tracing::debug!(target: "opsdeck::coordinator", entity = id, "mutation confirmed");
                Ok(merged)
            }
            Err(err) => Err(self.rollback(id, snapshot, err)),
        }
    }

    /// Restore the pre-mutation snapshot verbatim and pass the error on.
    fn rollback<E>(&self, id: &str, snapshot: E, err: MutationError) -> MutationError
    where
        S: EntityStore<E>,
        E: Entity,
    {
        self.store.set(id, snapshot);
        tracing::warn!(
            target: "opsdeck::coordinator",
            entity = id,
            error = %err,
            "mutation failed, rolled back"
        );
        err
    }
}

/// Map a gateway error onto the caller-facing taxonomy.
fn remote_to_mutation(id: &str, err: RemoteError) -> MutationError {
    match err {
        RemoteError::Rejected(reason) => MutationError::RemoteRejected {
            id: id.to_string(),
            reason,
        },
        RemoteError::Unreachable(reason) => MutationError::RemoteUnreachable {
            id: id.to_string(),
            reason,
        },
    }
}
