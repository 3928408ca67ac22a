use std::collections::HashMap;
use std::hash::Hash;

/// Read-only keyed access to a reference data set, used by stages such as
/// [`crate::transformer::FilterTransformer`].
pub trait Lookup<K, V>: Send + Sync {
    /// Returns the value stored for `key`, if any.
    fn get(&self, key: &K) -> Option<V>;
}

/// A [`Lookup`] backed by a [`HashMap`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryLookup<K, V> {
    values: HashMap<K, V>,
}

impl<K, V> InMemoryLookup<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.values.insert(key, value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K> InMemoryLookup<K, K>
where
    K: Eq + Hash + Clone,
{
    /// Builds a set-like lookup where every key maps to itself.
    pub fn from_keys(keys: impl IntoIterator<Item = K>) -> Self {
        keys.into_iter().map(|key| (key.clone(), key)).collect()
    }
}

impl<K, V> FromIterator<(K, V)> for InMemoryLookup<K, V>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<K, V> Lookup<K, V> for InMemoryLookup<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        self.values.get(key).cloned()
    }
}
