//! Entity contract and server-field merging.
//!
//! An entity is any mutable record a screen displays and the operator can
//! act on: a purchase order, a stock line, an aging-inventory row. Concrete
//! types live with the screens; the core only requires a stable id and
//! serde round-tripping.
//!
//! ## Merging
//!
//! When the backend confirms a mutation it may return the full entity or
//! just the fields it changed (an approval returns `status` plus the
//! server-assigned `sent_date`). [`merge_confirmed`] overlays those fields
//! on the optimistic entity: server values win for every field present in
//! the response, optimistic values survive for the rest.

use crate::error::{MutationError, OpsResult};
use crate::job::JobId;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A mutable record held in an [`EntityStore`](crate::store::EntityStore).
///
/// ## Contract
///
/// - `id()` is stable for the lifetime of the record; exactly one entity
///   with a given id exists in a store at any time.
/// - The type serializes to a JSON object (field-level merging depends on
///   this; a newtype over a scalar does not qualify).
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable identifier of this record.
    fn id(&self) -> &str;
}

/// Field set returned by the backend when it confirms a mutation.
///
/// May be partial; only the fields present override the optimistic state.
pub type ConfirmedFields = serde_json::Map<String, serde_json::Value>;

/// Successful reply of a remote mutation operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    /// The backend applied the mutation and returned the confirmed fields
    /// (possibly the complete entity, possibly a partial field set).
    Confirmed(ConfirmedFields),

    /// The backend accepted the mutation as a long-running job; the final
    /// outcome must be obtained by polling.
    JobAccepted {
        /// Backend-minted id for the pending job
        job_id: JobId,
    },
}

/// Overlay server-confirmed fields on an optimistic entity.
///
/// Server values win for every field present in `confirmed`; all other
/// fields keep their optimistic values. A payload that does not fit the
/// entity shape is a domain error ([`MutationError::RemoteRejected`]) — the
/// backend is speaking a different schema.
pub fn merge_confirmed<E: Entity>(current: &E, confirmed: &ConfirmedFields) -> OpsResult<E> {
    let reject = |reason: String| MutationError::RemoteRejected {
        id: current.id().to_string(),
        reason,
    };

    let mut value = serde_json::to_value(current)
        .map_err(|e| reject(format!("entity failed to serialize: {e}")))?;
    let fields = value
        .as_object_mut()
        .ok_or_else(|| reject("entity did not serialize to an object".to_string()))?;

    for (name, confirmed_value) in confirmed {
        fields.insert(name.clone(), confirmed_value.clone());
    }

    serde_json::from_value(value)
        .map_err(|e| reject(format!("confirmed payload does not fit entity shape: {e}")))
}
