//! Ordered, id-unique entity collection.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::{Entity, EntityId};

/// Ordered entities with unique ids. When duplicates are offered the first
/// occurrence is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewCollection<T> {
    items: Vec<T>,
}

impl<T> Default for ViewCollection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> ViewCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from items in order, dropping later duplicates.
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        let mut collection = Self::new();
        for item in items {
            collection.push(item);
        }
        collection
    }

    /// Append unless the id is already present. Returns whether it was added.
    pub fn push(&mut self, item: T) -> bool {
        if self.contains(item.id()) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn position(&self, id: &EntityId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &EntityId) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    pub fn remove(&mut self, id: &EntityId) -> Option<T> {
        self.position(id).map(|idx| self.items.remove(idx))
    }

    /// Put `item` at `index` (clamped), unless its id is already present.
    pub fn insert_at(&mut self, index: usize, item: T) -> bool {
        if self.contains(item.id()) {
            return false;
        }
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        true
    }

    /// Replace the entity with the same id in place, or append it.
    pub fn upsert(&mut self, item: T) {
        match self.position(item.id()) {
            Some(idx) => self.items[idx] = item,
            None => self.items.push(item),
        }
    }

    /// Give the entity `from` the id `to`. If `to` is already present the
    /// `from` entity is dropped instead.
    pub fn rename(&mut self, from: &EntityId, to: EntityId) {
        if self.contains(&to) {
            self.remove(from);
        } else if let Some(item) = self.get_mut(from) {
            item.set_id(to);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    pub fn ids(&self) -> Vec<&EntityId> {
        self.items.iter().map(Entity::id).collect()
    }
}

impl<T: Entity> FromIterator<T> for ViewCollection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_items(iter)
    }
}

impl<'a, T> IntoIterator for &'a ViewCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Serialize> Serialize for ViewCollection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Entity> Deserialize<'de> for ViewCollection<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::from_items)
    }
}
