//! Entity references for AST nodes.
//!
//! Nodes live in a dense arena owned by [`crate::Ast`] and are addressed by
//! [`NodeId`]. Detached nodes stay in the arena until the tree is dropped, so
//! a `NodeId` handed out by an `Ast` is valid for that tree's whole lifetime.

use std::{
    fmt,
    marker::PhantomData,
    ops::{Index, IndexMut},
};

/// Base trait for entity references.
pub trait EntityRef: Copy + Eq + std::hash::Hash + fmt::Debug {
    /// Get the index of this entity
    fn index(self) -> usize;

    /// Create an entity from an index
    fn from_index(index: usize) -> Self;
}

/// Node entity reference
///
/// A type-safe handle to a node inside one [`crate::Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a node entity with the given index
    pub fn new(index: u32) -> Self {
        NodeId(index)
    }
}

impl EntityRef for NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

/// Dense map from entity to data.
///
/// Essentially a `Vec` with entity-based indexing.
#[derive(Debug, Clone)]
pub struct PrimaryMap<K: EntityRef, V> {
    data: Vec<V>,
    _phantom: PhantomData<K>,
}

impl<K: EntityRef, V> PrimaryMap<K, V> {
    /// Create a new empty PrimaryMap
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            _phantom: PhantomData,
        }
    }

    /// Push a value and return its entity key
    pub fn push(&mut self, value: V) -> K {
        let index = self.data.len();
        self.data.push(value);
        K::from_index(index)
    }

    /// Get a value by entity key
    pub fn get(&self, key: K) -> Option<&V> {
        self.data.get(key.index())
    }

    /// Get a mutable value by entity key
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.data.get_mut(key.index())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over all (key, value) pairs in allocation order
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, v)| (K::from_index(i), v))
    }
}

impl<K: EntityRef, V> Default for PrimaryMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityRef, V> Index<K> for PrimaryMap<K, V> {
    type Output = V;

    fn index(&self, key: K) -> &V {
        &self.data[key.index()]
    }
}

impl<K: EntityRef, V> IndexMut<K> for PrimaryMap<K, V> {
    fn index_mut(&mut self, key: K) -> &mut V {
        &mut self.data[key.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_round_trip() {
        let id = NodeId::from_index(7);
        assert_eq!(id.index(), 7);
        assert_eq!(id, NodeId::new(7));
        assert_eq!(format!("{}", id), "node7");
    }

    #[test]
    fn test_primary_map_basic() {
        let mut map: PrimaryMap<NodeId, &str> = PrimaryMap::new();
        assert!(map.is_empty());

        let a = map.push("a");
        let b = map.push("b");

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(a), Some(&"a"));
        assert_eq!(map[b], "b");
        assert_eq!(map.get(NodeId::new(9)), None);

        map[a] = "z";
        let items: Vec<_> = map.iter().map(|(_, v)| *v).collect();
        assert_eq!(items, vec!["z", "b"]);
    }
}
