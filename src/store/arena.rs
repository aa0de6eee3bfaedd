//! Id-indexed arena for nodes and edges.
//!
//! Items live in insertion order (generation output depends on it) and are
//! looked up by their string id. Nothing outside the arena holds positions.

use std::collections::HashMap;

pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for crate::model::Node {
    fn key(&self) -> &str {
        self.id()
    }
}

impl Keyed for crate::model::Edge {
    fn key(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone)]
pub struct Arena<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Keyed> Arena<T> {
    pub fn from_items(items: Vec<T>) -> Self {
        let mut arena = Self::default();
        for item in items {
            // A repeat keeps the first.
            if let Err(item) = arena.insert(item) {
                tracing::warn!(id = item.key(), "dropping item with a duplicate id");
            }
        }
        arena
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    /// Mutable access. Callers must not change the item's id.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.items[i]),
            None => None,
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Mutable iteration. Callers must not change ids.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    /// Insert at the end. Hands the item back if its id is taken.
    pub fn insert(&mut self, item: T) -> Result<(), T> {
        if self.index.contains_key(item.key()) {
            return Err(item);
        }
        self.index.insert(item.key().to_string(), self.items.len());
        self.items.push(item);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        let pos = self.index.remove(id)?;
        let item = self.items.remove(pos);
        self.reindex_from(pos);
        Some(item)
    }

    /// Keep the items matching `keep`; return the rest in order.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> Vec<T> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.items.len());
        for item in self.items.drain(..) {
            if keep(&item) {
                kept.push(item);
            } else {
                removed.push(item);
            }
        }
        self.items = kept;
        if !removed.is_empty() {
            self.reindex_from(0);
        }
        removed
    }

    fn reindex_from(&mut self, start: usize) {
        if start == 0 {
            self.index.clear();
        }
        for (i, item) in self.items.iter().enumerate().skip(start) {
            self.index.insert(item.key().to_string(), i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cardinality, Edge};

    fn edge(id: &str) -> Edge {
        Edge::new(id, "a", "b", Cardinality::OneToMany)
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut arena = Arena::default();
        arena.insert(edge("e1")).unwrap();
        arena.insert(edge("e2")).unwrap();
        assert!(arena.insert(edge("e1")).is_err());
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get("e2").unwrap().id, "e2");
    }

    #[test]
    fn test_remove_keeps_order_and_index() {
        let mut arena = Arena::from_items(vec![edge("e1"), edge("e2"), edge("e3")]);
        arena.remove("e1").unwrap();
        let ids: Vec<&str> = arena.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e3"]);
        assert_eq!(arena.get("e3").unwrap().id, "e3");
        assert!(arena.get("e1").is_none());
    }

    #[test]
    fn test_from_items_keeps_first_of_a_repeat() {
        let arena = Arena::from_items(vec![edge("e1"), Edge::new("e1", "x", "y", Cardinality::OneToOne), edge("e2")]);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get("e1").unwrap().source_node_id, "a");
    }

    #[test]
    fn test_retain() {
        let mut arena = Arena::from_items(vec![edge("e1"), edge("e2"), edge("e3")]);
        let removed = arena.retain(|e| e.id != "e2");
        assert_eq!(removed.len(), 1);
        assert_eq!(arena.get("e3").unwrap().id, "e3");
        assert!(!arena.contains("e2"));
    }
}
