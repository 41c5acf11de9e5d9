use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;
use std::ops::Index;

use crate::error::{InvariantViolation, MapError};

use super::rbtree::{self, RBTree, Slot, probe_cmp};

/// What a [`Map`] stores per key. Ordered (and compared) by `key` alone.
#[derive(Clone)]
pub struct MapEntry<K, V> {
    key: K,
    value: V,
}

impl<K, V> MapEntry<K, V> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }
}

impl<K: PartialEq, V> PartialEq for MapEntry<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<K: Eq, V> Eq for MapEntry<K, V> {}

impl<K: Ord, V> PartialOrd for MapEntry<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord, V> Ord for MapEntry<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for MapEntry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {:?}", self.key, self.value)
    }
}

/// An ordered map with unique keys.
pub struct Map<K, V> {
    tree: RBTree<MapEntry<K, V>>,
}

impl<K, V> Map<K, V> {
    pub const fn new() -> Self {
        Self { tree: RBTree::new() }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn clear(&mut self) {
        self.tree.clear()
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter { inner: self.tree.iter() }
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator {
        self.iter().map(|(_, v)| v)
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree.first().map(|e| (&e.key, &e.value))
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree.last().map(|e| (&e.key, &e.value))
    }
}

impl<K: Ord, V> Map<K, V> {
    /// Adds `key -> value` if `key` isn't in the map yet. An existing entry is
    /// left alone and `false` is returned.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.tree.insert_unique(MapEntry { key, value })
    }

    /// Removes `key`, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.take_by(|e| probe_cmp(&e.key, key)).map(|e| e.value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).is_some()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.tree.find_node_by(|e| probe_cmp(&e.key, key))?;
        Some(&node.value().value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.tree.find_node_by(|e| probe_cmp(&e.key, key))?;
        // only the value half is handed out, so the ordering can't be broken
        Some(&mut node.value_mut().value)
    }

    /// The read-only indexed lookup: the value for `key`, or
    /// [`MapError::KeyNotFound`] naming the key.
    pub fn at<Q>(&self, key: &Q) -> Result<&V, MapError>
    where
        K: Borrow<Q>,
        Q: Ord + fmt::Debug + ?Sized,
    {
        self.get(key).ok_or_else(|| MapError::KeyNotFound { key: format!("{key:?}") })
    }

    /// The writable indexed lookup: the value slot for `key`, inserting
    /// `V::default()` first if the key is new.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let node = match self.tree.unique_slot_by(|e| e.key.cmp(&key)) {
            Slot::Occupied(node) => node,
            Slot::Vacant { parent, dir } => {
                self.tree.link_new(parent, dir, || MapEntry { key, value: V::default() })
            }
        };
        &mut node.value_mut().value
    }

    pub fn validate(&self) -> Result<usize, InvariantViolation> {
        self.tree.validate()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> Map<K, V> {
    /// See [`RBTree::dump`].
    pub fn dump(&self) -> String {
        self.tree.dump()
    }
}

/// Panics with the `KeyError` message if `key` is missing; use
/// [`Map::at`] to get the error instead.
impl<K, V, Q> Index<&Q> for Map<K, V>
where
    K: Ord + Borrow<Q>,
    Q: Ord + fmt::Debug + ?Sized,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        match self.at(key) {
            Ok(value) => value,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<K, V> Default for Map<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> Clone for Map<K, V> {
    fn clone(&self) -> Self {
        Self { tree: self.tree.clone() }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Map<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for Map<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

/// Keeps the first value seen for each key, like [`Map::insert`].
impl<K: Ord, V> Extend<(K, V)> for Map<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

pub struct Iter<'a, K, V> {
    inner: rbtree::Iter<'a, MapEntry<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|e| (&e.key, &e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|e| (&e.key, &e.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a Map<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct IntoIter<K, V> {
    inner: rbtree::IntoIter<MapEntry<K, V>>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|e| (e.key, e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|e| (e.key, e.value))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<K, V> IntoIterator for Map<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { inner: self.tree.into_iter() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_by_number() {
        let mut map = Map::new();
        *map.get_or_insert_default(2) = "alice";
        *map.get_or_insert_default(1) = "nina birch";
        assert_eq!(format!("{map:?}"), r#"{1: "nina birch", 2: "alice"}"#);

        *map.get_or_insert_default(2) = "horsedog";
        assert_eq!(map.len(), 2);

        let view = &map;
        assert_eq!(view.at(&2), Ok(&"horsedog"));
        assert_eq!(view[&2], "horsedog");
        assert_eq!(view.at(&55), Err(MapError::KeyNotFound { key: "55".into() }));
        assert_eq!(view.at(&55).unwrap_err().to_string(), "KeyError: 55");
        map.validate().unwrap();
    }

    #[test]
    #[should_panic(expected = "KeyError: 7")]
    fn indexing_a_missing_key_panics() {
        let map: Map<i32, i32> = [(1, 1)].into_iter().collect();
        let _missing = map[&7];
    }

    #[test]
    fn insert_never_overwrites() {
        let mut map = Map::new();
        assert!(map.insert("k", 1));
        assert!(!map.insert("k", 2));
        assert_eq!(map.get("k"), Some(&1));

        *map.get_mut("k").unwrap() += 10;
        assert_eq!(map.get("k"), Some(&11));
        assert_eq!(map.remove("k"), Some(11));
        assert_eq!(map.remove("k"), None);
        assert!(map.is_empty());
    }

    #[test]
    fn string_keys_borrow_as_str() {
        let mut map: Map<String, usize> = Map::new();
        for word in "the quick brown fox jumps over the lazy dog the end".split(' ') {
            *map.get_or_insert_default(word.to_string()) += 1;
        }
        assert_eq!(map.get("the"), Some(&3));
        assert_eq!(map.at("cat"), Err(MapError::KeyNotFound { key: r#""cat""#.into() }));
        assert!(map.contains_key("fox"));

        let keys: Vec<_> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, ["brown", "dog", "end", "fox", "jumps", "lazy", "over", "quick", "the"]);
        assert_eq!(map.first_key_value().map(|(k, v)| (k.as_str(), *v)), Some(("brown", 1)));
        assert_eq!(map.values().rev().next(), Some(&3));
        map.validate().unwrap();
    }

    #[test]
    fn dump_and_owned_iteration() {
        let map: Map<i32, char> = [(2, 'b'), (1, 'a'), (3, 'c')].into_iter().collect();
        assert_eq!(map.dump(), "2: 'b':B(1: 'a':R, 3: 'c':R)");

        let copy = map.clone();
        let pairs: Vec<_> = map.into_iter().collect();
        assert_eq!(pairs, [(1, 'a'), (2, 'b'), (3, 'c')]);
        assert_eq!(copy.len(), 3);
    }
}
