//! Ordered associative container keyed by [`Identifier`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::util::ident::Identifier;

/// Deterministic map from [`Identifier`] to `V`, backed by a sorted array.
///
/// Iteration always happens in key order, so two maps with the same contents iterate identically and
/// produce the same [`content_hash`](SortedMap::content_hash), regardless of insertion order.
/// Keys are unique: [`insert`](SortedMap::insert) replaces the value of an existing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedMap<V> {
    entries: Vec<(Identifier, V)>,
}

impl<V> Default for SortedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> SortedMap<V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `key` if it is present, otherwise the index it must be inserted at to keep the map sorted.
    fn find_closest_index(&self, key: &Identifier) -> Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| k.cmp(key))
    }

    /// Insert a value, replacing and returning the previous value stored under the same key.
    pub fn insert(&mut self, key: impl Into<Identifier>, value: V) -> Option<V> {
        let key = key.into();
        match self.find_closest_index(&key) {
            Ok(index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
            Err(index) => {
                self.entries.insert(index, (key, value));
                None
            }
        }
    }

    /// Get the value stored under `key`.
    pub fn get(&self, key: &Identifier) -> Option<&V> {
        self.find_closest_index(key)
            .ok()
            .map(|index| &self.entries[index].1)
    }

    /// Get mutable access to the value stored under `key`.
    pub fn get_mut(&mut self, key: &Identifier) -> Option<&mut V> {
        match self.find_closest_index(key) {
            Ok(index) => Some(&mut self.entries[index].1),
            Err(_) => None,
        }
    }

    /// Get the stored key equal to `key`. Useful to recover the original name of a hashed identifier.
    pub fn get_key(&self, key: &Identifier) -> Option<&Identifier> {
        self.find_closest_index(key)
            .ok()
            .map(|index| &self.entries[index].0)
    }

    pub fn contains_key(&self, key: &Identifier) -> bool {
        self.find_closest_index(key).is_ok()
    }

    /// Remove and return the value stored under `key`.
    pub fn remove(&mut self, key: &Identifier) -> Option<V> {
        self.find_closest_index(key)
            .ok()
            .map(|index| self.entries.remove(index).1)
    }

    /// Keep only the entries for which `f` returns true.
    pub fn retain<F: FnMut(&Identifier, &V) -> bool>(&mut self, mut f: F) {
        self.entries.retain(|(k, v)| f(k, v));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Identifier> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear()
    }
}

impl<V: Hash> SortedMap<V> {
    /// Hash over all keys and values, in key order.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl<V: Hash> Hash for SortedMap<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.entries.len());
        for (key, value) in &self.entries {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl<K: Into<Identifier>, V> Extend<(K, V)> for SortedMap<V> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Into<Identifier>, V> FromIterator<(K, V)> for SortedMap<V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = SortedMap::new();
        map.extend(iter);
        map
    }
}

impl<V> IntoIterator for SortedMap<V> {
    type Item = (Identifier, V);
    type IntoIter = std::vec::IntoIter<(Identifier, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, V> IntoIterator for &'a SortedMap<V> {
    type Item = (&'a Identifier, &'a V);
    type IntoIter = std::iter::Map<std::slice::Iter<'a, (Identifier, V)>, fn(&'a (Identifier, V)) -> (&'a Identifier, &'a V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter().map(split_entry as fn(&'a (Identifier, V)) -> (&'a Identifier, &'a V))
    }
}

fn split_entry<V>(entry: &(Identifier, V)) -> (&Identifier, &V) {
    (&entry.0, &entry.1)
}
