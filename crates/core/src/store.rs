//! Keyed in-memory entity collection.
//!
//! Each screen owns one store per entity type, populated by its initial
//! load and mutated only by the coordinator. Readers may read concurrently;
//! writers are serialized per entity by the coordinator's conflict rule,
//! not by this module.

use crate::entity::Entity;
use dashmap::DashMap;

/// Minimal store interface the coordinator requires.
///
/// Any keyed in-memory map satisfies it. The coordinator performs exactly
/// one `set` before the remote call (the optimistic write) and exactly one
/// after (the confirmed merge or the rollback).
pub trait EntityStore<E: Entity>: Send + Sync {
    /// Current state of the entity, if present.
    fn get(&self, id: &str) -> Option<E>;

    /// Replace the entity under `id`.
    fn set(&self, id: &str, entity: E);
}

/// Default store implementation backed by a sharded concurrent map.
///
/// # Thread Safety
///
/// All operations are thread-safe; reads are lock-free and writes only lock
/// the target shard. Clone the surrounding `Arc` to share between the
/// screen and the coordinator.
pub struct MemoryStore<E> {
    entries: DashMap<String, E>,
}

impl<E: Entity> MemoryStore<E> {
    /// Create an empty store.
    pub fn new() -> Self {
        MemoryStore {
            entries: DashMap::new(),
        }
    }

    /// Create a store sized for an expected row count.
    pub fn with_capacity(capacity: usize) -> Self {
        MemoryStore {
            entries: DashMap::with_capacity(capacity),
        }
    }

    /// Populate from an initial fetch, keyed by each entity's own id.
    ///
    /// Later entities win on duplicate ids, preserving the one-entity-per-id
    /// invariant.
    pub fn load(&self, entities: impl IntoIterator<Item = E>) {
        for entity in entities {
            self.entries.insert(entity.id().to_string(), entity);
        }
    }

    /// Remove an entity (a row the backend deleted, e.g. liquidated stock).
    ///
    /// Returns the removed entity if it was present.
    pub fn remove(&self, id: &str) -> Option<E> {
        self.entries.remove(id).map(|(_, entity)| entity)
    }

    /// Ids of all entities currently held, in no particular order.
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of entities held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the store holds no entities.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntityStore<E> for MemoryStore<E> {
    fn get(&self, id: &str) -> Option<E> {
        self.entries.get(id).map(|e| e.value().clone())
    }

    fn set(&self, id: &str, entity: E) {
        self.entries.insert(id.to_string(), entity);
    }
}
