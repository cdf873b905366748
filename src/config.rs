//! Fallible map construction.

use crate::error::ConfigError;
use crate::linked_tree_hash_map::LinkedTreeHashMap;
use crate::ordering::Unordered;
use crate::table::{BucketTable, DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR};
use crate::tree_hash_map::TreeHashMap;
use hashbrown::hash_map::DefaultHashBuilder;

/// Collects capacity, load factor, hasher and comparator, then validates
/// them in `build`/`build_linked`.
///
/// ```
/// use rb_hashmap::{Builder, Natural};
///
/// let mut m = Builder::new()
///     .capacity(100)
///     .load_factor(0.5)
///     .comparator(Natural)
///     .build()
///     .unwrap();
/// m.insert("k", 1);
/// assert_eq!(m.get("k"), Some(&1));
/// ```
#[derive(Clone, Debug)]
pub struct Builder<S = DefaultHashBuilder, C = Unordered> {
    capacity: usize,
    load_factor: f32,
    hasher: S,
    comparator: C,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            load_factor: DEFAULT_LOAD_FACTOR,
            hasher: DefaultHashBuilder::default(),
            comparator: Unordered,
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C> Builder<S, C> {
    /// Initial bucket count, rounded up to a power of two.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Entries per bucket above which the table doubles.
    pub fn load_factor(mut self, load_factor: f32) -> Self {
        self.load_factor = load_factor;
        self
    }

    pub fn hasher<S2>(self, hasher: S2) -> Builder<S2, C> {
        Builder {
            capacity: self.capacity,
            load_factor: self.load_factor,
            hasher,
            comparator: self.comparator,
        }
    }

    pub fn comparator<C2>(self, comparator: C2) -> Builder<S, C2> {
        Builder {
            capacity: self.capacity,
            load_factor: self.load_factor,
            hasher: self.hasher,
            comparator,
        }
    }

    pub fn build<K, V>(self) -> Result<TreeHashMap<K, V, S, C>, ConfigError> {
        let table = BucketTable::new(self.capacity, self.load_factor)?;
        tracing::trace!(
            capacity = self.capacity,
            load_factor = self.load_factor,
            "building map"
        );
        Ok(TreeHashMap::from_parts(table, self.hasher, self.comparator))
    }

    pub fn build_linked<K, V>(self) -> Result<LinkedTreeHashMap<K, V, S, C>, ConfigError> {
        self.build().map(LinkedTreeHashMap::from_map)
    }
}
