//! Opsdeck — optimistic mutation core for operations-console front ends.
//!
//! Screens render entities fetched from a remote backend and let operators
//! trigger state-changing actions: approve or reject purchase orders,
//! adjust stock counts, liquidate aging inventory, kick off sync jobs. The
//! recurring engineering problem behind every one of those buttons is the
//! same: keep local state consistent with the system of record when the
//! remote call may fail or take time.
//!
//! This crate unifies that pattern:
//!
//! - [`Coordinator`] applies the patched entity to the store immediately
//!   (zero perceived latency), then merges the server's confirmation or
//!   rolls back to the pre-mutation snapshot.
//! - [`track`] polls a long-running server job until a terminal status,
//!   with a timeout ceiling and cooperative cancellation.
//! - [`run_all`] fans a bulk action out into per-entity mutations with
//!   isolated failures and a single aggregate outcome.
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(MemoryStore::new());
//! store.load(initial_fetch);
//! let coordinator = Coordinator::new(store.clone());
//!
//! let outcome = coordinator
//!     .apply(
//!         "po-1",
//!         |po| PurchaseOrder { status: Status::Sent, ..po.clone() },
//!         |payload| gateway.approve_purchase_order(payload),
//!     )
//!     .await;
//! ```
//!
//! One store and one coordinator per screen, constructed and torn down with
//! the screen's lifecycle. The core is a library consumed by view code; it
//! defines no transport, endpoints, or CLI surface.

mod types;

pub use types::*;
