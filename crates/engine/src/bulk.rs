//! Bulk operation orchestrator.
//!
//! Fans a single user action (approve all, liquidate selected) out into one
//! coordinator mutation per entity, all issued concurrently. Failures are
//! isolated per entity: one rejection never aborts or rolls back another
//! entity's successful mutation. The aggregate result is handed to the
//! caller only after every member has resolved, so screens present a single
//! summarized message instead of a burst of per-item errors.

use futures::future;
use opsdeck_core::{MutationError, OpsResult};
use std::fmt;
use std::future::Future;

/// One failed member of a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    /// The entity whose mutation failed
    pub id: String,
    /// Why it failed (store already rolled back where applicable)
    pub error: MutationError,
}

/// Aggregate outcome of a bulk operation.
///
/// Never partially observed: constructed only once every member mutation
/// has resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkResult {
    succeeded: Vec<String>,
    failed: Vec<BulkFailure>,
}

impl BulkResult {
    /// Ids whose mutations succeeded, in completion order.
    pub fn succeeded_ids(&self) -> &[String] {
        &self.succeeded
    }

    /// Failed members with their causes.
    pub fn failures(&self) -> &[BulkFailure] {
        &self.failed
    }

    /// Number of members that succeeded.
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    /// Number of members that failed.
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// True if every member succeeded.
    pub fn is_all_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// One-line summary for a single user-facing message.
    pub fn summary(&self) -> String {
        if self.is_all_ok() {
            format!("{} succeeded", self.succeeded.len())
        } else {
            let ids: Vec<&str> = self.failed.iter().map(|f| f.id.as_str()).collect();
            format!(
                "{} succeeded, {} failed ({})",
                self.succeeded.len(),
                self.failed.len(),
                ids.join(", ")
            )
        }
    }
}

impl fmt::Display for BulkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Run one mutation per entity id, all concurrently, and aggregate.
///
/// `per_entity` receives an owned id and typically closes over a
/// [`Coordinator`](crate::Coordinator), calling `apply` with the
/// entity-specific patch and remote operation. There is no ordering
/// guarantee between members; the coordinator's per-entity conflict rule is
/// what makes the fan-out safe.
pub async fn run_all<E, F, Fut>(ids: impl IntoIterator<Item = String>, per_entity: F) -> BulkResult
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = OpsResult<E>>,
{
    let members = ids.into_iter().map(|id| {
        let fut = per_entity(id.clone());
        async move { (id, fut.await) }
    });

    let resolved = future::join_all(members).await;

    let mut result = BulkResult {
        succeeded: Vec::new(),
        failed: Vec::new(),
    };
    for (id, outcome) in resolved {
        match outcome {
            Ok(_) => result.succeeded.push(id),
            Err(error) => result.failed.push(BulkFailure { id, error }),
        }
    }

    tracing::info!(
        target: "opsdeck::bulk",
        succeeded = result.succeeded_count(),
        failed = result.failed_count(),
        "bulk operation resolved"
    );
    result
}
