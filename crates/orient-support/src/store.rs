//! In-memory mesh store keyed by opaque identifiers.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::mesh::Mesh;

/// Opaque identifier of a stored mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(Uuid);

impl MeshId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for MeshId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Meshes owned for the length of an optimization session.
///
/// Meshes are handed out as `Arc`s so a running search keeps its mesh alive
/// even if the entry is removed or evicted. With a capacity set, inserting
/// into a full store evicts the oldest entry first.
#[derive(Debug, Default)]
pub struct MeshStore {
    meshes: HashMap<MeshId, Arc<Mesh>>,
    order: VecDeque<MeshId>,
    capacity: Option<usize>,
}

impl MeshStore {
    /// An unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding at most `capacity` meshes (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Default::default()
        }
    }

    /// Store `mesh` under a fresh identifier.
    pub fn insert(&mut self, mesh: Mesh) -> MeshId {
        if let Some(capacity) = self.capacity {
            while self.meshes.len() >= capacity {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                if self.meshes.remove(&oldest).is_some() {
                    info!(id = %oldest, "evicted mesh from store");
                }
            }
        }

        let id = MeshId::new();
        debug!(id = %id, triangles = mesh.len(), "stored mesh");
        self.meshes.insert(id, Arc::new(mesh));
        self.order.push_back(id);
        id
    }

    /// The mesh stored under `id`.
    pub fn get(&self, id: &MeshId) -> Option<Arc<Mesh>> {
        self.meshes.get(id).cloned()
    }

    /// Remove and return the mesh stored under `id`.
    pub fn remove(&mut self, id: &MeshId) -> Option<Arc<Mesh>> {
        let mesh = self.meshes.remove(id)?;
        self.order.retain(|other| other != id);
        Some(mesh)
    }

    /// Number of stored meshes.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Identifiers in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &MeshId> + '_ {
        self.order.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::make_cube_mesh;

    #[test]
    fn test_insert_get_remove() {
        let mut store = MeshStore::new();
        assert!(store.is_empty());

        let id = store.insert(make_cube_mesh(1.0, 0.0));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().len(), 12);

        let removed = store.remove(&id).unwrap();
        assert_eq!(removed.len(), 12);
        assert!(store.get(&id).is_none());
        assert!(store.remove(&id).is_none());
        assert_eq!(store.ids().count(), 0);
    }

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let mut store = MeshStore::new();
        let a = store.insert(Mesh::empty());
        let b = store.insert(Mesh::empty());
        assert_ne!(a, b);
        assert_eq!(store.ids().copied().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut store = MeshStore::with_capacity(2);
        let a = store.insert(make_cube_mesh(1.0, 0.0));
        let b = store.insert(make_cube_mesh(2.0, 0.0));
        let c = store.insert(make_cube_mesh(3.0, 0.0));

        assert_eq!(store.len(), 2);
        assert!(store.get(&a).is_none());
        assert!(store.get(&b).is_some());
        assert!(store.get(&c).is_some());
    }

    #[test]
    fn test_removed_entry_frees_capacity() {
        let mut store = MeshStore::with_capacity(2);
        let a = store.insert(Mesh::empty());
        let b = store.insert(Mesh::empty());
        store.remove(&a);
        let c = store.insert(Mesh::empty());
        assert!(store.get(&b).is_some());
        assert!(store.get(&c).is_some());
    }

    #[test]
    fn test_shared_mesh_outlives_eviction() {
        let mut store = MeshStore::with_capacity(1);
        let a = store.insert(make_cube_mesh(1.0, 0.0));
        let held = store.get(&a).unwrap();
        store.insert(Mesh::empty());
        assert!(store.get(&a).is_none());
        assert_eq!(held.len(), 12);
    }

    #[test]
    fn test_mesh_id_parse_roundtrip() {
        let mut store = MeshStore::new();
        let id = store.insert(Mesh::empty());
        let parsed: MeshId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<MeshId>().is_err());
    }
}
