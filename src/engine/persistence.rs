//! Persistence context - the identity map of one session.
//!
//! Entity instances and collections live in arenas addressed by
//! [`EntityHandle`] / [`CollectionHandle`]. There is at most one instance per
//! [`EntityKey`], so two results referring to the same row compare equal by
//! handle.

use std::collections::HashMap;
use std::fmt;

use crate::value::{DomainValue, SqlValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionHandle(pub usize);

/// Entity name plus identifier value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub entity: String,
    pub id: SqlValue,
}

impl EntityKey {
    pub fn new(entity: impl Into<String>, id: impl Into<SqlValue>) -> Self {
        Self {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityStatus {
    /// A reference whose state has not been read.
    Uninitialized,
    /// Being hydrated by an active result set.
    Loading,
    Loaded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityInstance {
    pub key: EntityKey,
    pub status: EntityStatus,
    pub attributes: Vec<(String, DomainValue)>,
}

impl EntityInstance {
    pub fn get(&self, name: &str) -> Option<&DomainValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn set(&mut self, name: &str, value: DomainValue) {
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.status == EntityStatus::Loaded
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionKey {
    pub role: String,
    pub owner: EntityKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistentCollection {
    /// `Entity.attribute`, e.g. `Customer.orders`.
    pub role: String,
    pub owner: EntityKey,
    pub elements: Vec<DomainValue>,
    pub initialized: bool,
}

#[derive(Debug, Default)]
pub struct PersistenceContext {
    entities: Vec<EntityInstance>,
    entities_by_key: HashMap<EntityKey, EntityHandle>,
    collections: Vec<PersistentCollection>,
    collections_by_key: HashMap<CollectionKey, CollectionHandle>,
    load_events: usize,
    load_contexts: usize,
    batch_queue: Vec<EntityKey>,
}

impl PersistenceContext {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Entities
    // =========================================================================

    pub fn find(&self, key: &EntityKey) -> Option<EntityHandle> {
        self.entities_by_key.get(key).copied()
    }

    /// The managed instance for `key`, registering an uninitialized
    /// reference the first time the key is seen.
    pub fn get_or_create_reference(&mut self, key: EntityKey) -> EntityHandle {
        if let Some(handle) = self.find(&key) {
            return handle;
        }
        let handle = EntityHandle(self.entities.len());
        self.entities.push(EntityInstance {
            key: key.clone(),
            status: EntityStatus::Uninitialized,
            attributes: Vec::new(),
        });
        self.entities_by_key.insert(key, handle);
        handle
    }

    pub fn entity(&self, handle: EntityHandle) -> &EntityInstance {
        &self.entities[handle.0]
    }

    pub fn entity_mut(&mut self, handle: EntityHandle) -> &mut EntityInstance {
        &mut self.entities[handle.0]
    }

    /// Claim an uninitialized instance for hydration. Returns `false` when
    /// the instance is already loaded or being loaded.
    pub fn start_loading(&mut self, handle: EntityHandle) -> bool {
        let instance = &mut self.entities[handle.0];
        if instance.status != EntityStatus::Uninitialized {
            return false;
        }
        instance.status = EntityStatus::Loading;
        true
    }

    /// Write hydrated state and count the load event.
    pub fn hydrate(&mut self, handle: EntityHandle, attributes: Vec<(String, DomainValue)>) {
        let instance = &mut self.entities[handle.0];
        for (name, value) in attributes {
            instance.set(&name, value);
        }
        self.load_events += 1;
    }

    pub fn finish_loading(&mut self, handle: EntityHandle) {
        let instance = &mut self.entities[handle.0];
        if instance.status == EntityStatus::Loading {
            instance.status = EntityStatus::Loaded;
        }
    }

    /// Number of entity hydrations performed.
    pub fn load_events(&self) -> usize {
        self.load_events
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // =========================================================================
    // Collections
    // =========================================================================

    pub fn get_or_create_collection(&mut self, role: &str, owner: EntityKey) -> CollectionHandle {
        let key = CollectionKey {
            role: role.to_string(),
            owner,
        };
        if let Some(handle) = self.collections_by_key.get(&key) {
            return *handle;
        }
        let handle = CollectionHandle(self.collections.len());
        self.collections.push(PersistentCollection {
            role: key.role.clone(),
            owner: key.owner.clone(),
            elements: Vec::new(),
            initialized: false,
        });
        self.collections_by_key.insert(key, handle);
        handle
    }

    pub fn collection(&self, handle: CollectionHandle) -> &PersistentCollection {
        &self.collections[handle.0]
    }

    pub fn collection_mut(&mut self, handle: CollectionHandle) -> &mut PersistentCollection {
        &mut self.collections[handle.0]
    }

    // =========================================================================
    // Load Contexts
    // =========================================================================

    pub fn register_load_context(&mut self) {
        self.load_contexts += 1;
    }

    pub fn deregister_load_context(&mut self) {
        self.load_contexts = self.load_contexts.saturating_sub(1);
    }

    /// Number of result sets currently being processed.
    pub fn active_load_contexts(&self) -> usize {
        self.load_contexts
    }

    // =========================================================================
    // Batch Fetch Queue
    // =========================================================================

    /// Queue an uninitialized entity for the next batch load.
    pub fn enqueue_batch_load(&mut self, key: EntityKey) {
        let loaded = self
            .find(&key)
            .is_some_and(|h| self.entity(h).status != EntityStatus::Uninitialized);
        if !loaded && !self.batch_queue.contains(&key) {
            self.batch_queue.push(key);
        }
    }

    /// Entity name of the oldest queued key.
    pub fn next_batch_entity(&self) -> Option<&str> {
        self.batch_queue.first().map(|k| k.entity.as_str())
    }

    /// Remove and return up to `size` queued keys of `entity`, oldest first,
    /// skipping keys loaded since they were queued.
    pub fn take_batch(&mut self, entity: &str, size: usize) -> Vec<EntityKey> {
        let mut batch = Vec::new();
        let mut remaining = Vec::with_capacity(self.batch_queue.len());
        for key in std::mem::take(&mut self.batch_queue) {
            if key.entity != entity || batch.len() >= size {
                remaining.push(key);
                continue;
            }
            let pending = self
                .find(&key)
                .map_or(true, |h| self.entity(h).status == EntityStatus::Uninitialized);
            if pending {
                batch.push(key);
            }
        }
        self.batch_queue = remaining;
        batch
    }

    pub fn has_pending_batch_loads(&self) -> bool {
        !self.batch_queue.is_empty()
    }

    /// Drop every managed instance.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_map() {
        let mut pc = PersistenceContext::new();
        let a = pc.get_or_create_reference(EntityKey::new("Order", 1));
        let b = pc.get_or_create_reference(EntityKey::new("Order", 1));
        let c = pc.get_or_create_reference(EntityKey::new("Customer", 1));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pc.entity_count(), 2);
    }

    #[test]
    fn test_loading_lifecycle() {
        let mut pc = PersistenceContext::new();
        let h = pc.get_or_create_reference(EntityKey::new("Order", 1));
        assert!(pc.start_loading(h));
        assert!(!pc.start_loading(h));
        pc.hydrate(h, vec![("total".into(), DomainValue::Scalar(SqlValue::Float(9.5)))]);
        pc.finish_loading(h);
        assert!(pc.entity(h).is_initialized());
        assert_eq!(pc.load_events(), 1);
        assert!(!pc.start_loading(h));
    }

    #[test]
    fn test_batch_queue() {
        let mut pc = PersistenceContext::new();
        for id in 1..=3 {
            let key = EntityKey::new("Customer", id);
            pc.get_or_create_reference(key.clone());
            pc.enqueue_batch_load(key.clone());
            pc.enqueue_batch_load(key);
        }
        pc.enqueue_batch_load(EntityKey::new("Product", 7));

        assert_eq!(pc.next_batch_entity(), Some("Customer"));
        let batch = pc.take_batch("Customer", 2);
        assert_eq!(batch, vec![EntityKey::new("Customer", 1), EntityKey::new("Customer", 2)]);

        let loaded = pc.find(&EntityKey::new("Customer", 3)).unwrap();
        pc.start_loading(loaded);
        assert!(pc.take_batch("Customer", 2).is_empty());
        assert_eq!(pc.next_batch_entity(), Some("Product"));
    }

    #[test]
    fn test_collection_per_role_and_owner() {
        let mut pc = PersistenceContext::new();
        let a = pc.get_or_create_collection("Customer.orders", EntityKey::new("Customer", 1));
        let b = pc.get_or_create_collection("Customer.orders", EntityKey::new("Customer", 1));
        let c = pc.get_or_create_collection("Customer.orders", EntityKey::new("Customer", 2));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!pc.collection(a).initialized);
    }
}
