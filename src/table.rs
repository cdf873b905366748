//! Bucket table: a power-of-two array of tree roots.

use crate::error::ConfigError;
use crate::node::NodeKey;

pub(crate) const DEFAULT_CAPACITY: usize = 16;
pub(crate) const DEFAULT_LOAD_FACTOR: f32 = 0.75;
/// Smallest accepted load factor. Below it the threshold rounds to zero for
/// small tables and every insert would double the table.
pub(crate) const MIN_LOAD_FACTOR: f32 = 0.05;

/// Fold the upper half of the hash into the lower half; masking alone only
/// sees the low bits.
#[inline]
pub(crate) fn scramble(hash: u64) -> u64 {
    hash ^ (hash >> 32)
}

#[derive(Clone, Debug)]
pub(crate) struct BucketTable {
    // Empty until the first insert.
    slots: Vec<Option<NodeKey>>,
    initial: usize,
    load_factor: f32,
}

impl BucketTable {
    pub fn new(capacity: usize, load_factor: f32) -> Result<Self, ConfigError> {
        if !(load_factor.is_finite() && load_factor >= MIN_LOAD_FACTOR) {
            return Err(ConfigError::InvalidLoadFactor(load_factor));
        }
        let initial = capacity
            .max(1)
            .checked_next_power_of_two()
            .ok_or(ConfigError::CapacityOverflow(capacity))?;
        Ok(Self {
            slots: Vec::new(),
            initial,
            load_factor,
        })
    }

    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        Self::new(capacity, DEFAULT_LOAD_FACTOR)
    }

    /// Allocated slot count (0 before the first insert).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn threshold(&self) -> usize {
        if self.slots.len() == Self::max_capacity() {
            return usize::MAX;
        }
        (self.slots.len() as f64 * f64::from(self.load_factor)) as usize
    }

    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    const fn max_capacity() -> usize {
        1 << (usize::BITS - 1)
    }

    pub fn ensure_allocated(&mut self) {
        if self.slots.is_empty() {
            self.slots = vec![None; self.initial];
        }
    }

    #[inline]
    pub fn index(&self, hash: u64) -> usize {
        debug_assert!(self.slots.len().is_power_of_two());
        (scramble(hash) as usize) & (self.slots.len() - 1)
    }

    /// Root of the bucket `hash` maps to, or `None` when unallocated.
    pub fn root_for(&self, hash: u64) -> Option<NodeKey> {
        if self.slots.is_empty() {
            return None;
        }
        self.slots[self.index(hash)]
    }

    pub fn root(&self, index: usize) -> Option<NodeKey> {
        self.slots[index]
    }

    pub fn root_mut(&mut self, index: usize) -> &mut Option<NodeKey> {
        &mut self.slots[index]
    }

    pub fn roots(&self) -> impl Iterator<Item = (usize, NodeKey)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.map(|r| (i, r)))
    }

    /// Swap in an empty array of twice the size and hand back the old roots.
    pub fn grow(&mut self) -> Vec<Option<NodeKey>> {
        let doubled = self.slots.len() * 2;
        core::mem::replace(&mut self.slots, vec![None; doubled])
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }
}

impl Default for BucketTable {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            initial: DEFAULT_CAPACITY,
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: Requested capacities round up to a power of two.
    #[test]
    fn capacity_rounds_to_power_of_two() {
        for (asked, got) in [(0, 1), (1, 1), (3, 4), (16, 16), (17, 32), (1000, 1024)] {
            let mut t = BucketTable::new(asked, DEFAULT_LOAD_FACTOR).unwrap();
            assert_eq!(t.capacity(), 0, "allocation is lazy");
            t.ensure_allocated();
            assert_eq!(t.capacity(), got);
        }
    }

    /// Invariant: Unrepresentable capacities and bad load factors are rejected.
    #[test]
    fn invalid_configuration_rejected() {
        assert_eq!(
            BucketTable::new(usize::MAX, 0.75).unwrap_err(),
            ConfigError::CapacityOverflow(usize::MAX)
        );
        for lf in [0.0, -1.0, 1e-30, 0.01, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                BucketTable::new(16, lf),
                Err(ConfigError::InvalidLoadFactor(_))
            ));
        }
    }

    /// Invariant: At the smallest accepted load factor the threshold turns
    /// non-zero within a few doublings and then tracks capacity.
    #[test]
    fn minimum_load_factor_grows_proportionally() {
        let mut t = BucketTable::new(1, MIN_LOAD_FACTOR).unwrap();
        t.ensure_allocated();
        while t.threshold() == 0 {
            t.grow();
        }
        assert_eq!(t.capacity(), 32);
        assert_eq!(t.threshold(), 1);
        t.grow();
        assert_eq!(t.threshold(), 3);
    }

    /// Invariant: High hash bits influence the bucket index.
    #[test]
    fn scramble_spreads_high_bits() {
        let mut t = BucketTable::new(16, DEFAULT_LOAD_FACTOR).unwrap();
        t.ensure_allocated();
        assert_eq!(t.index(0x0000_0001_0000_0000), 1);
        assert_eq!(t.index(0x0000_0005_0000_0000), 5);
        assert_eq!(t.index(3), 3);
        assert_eq!(scramble(0xdead_beef), 0xdead_beef);
    }

    /// Invariant: The threshold tracks capacity times load factor, and
    /// growing doubles the slot count.
    #[test]
    fn threshold_and_growth() {
        let mut t = BucketTable::new(16, 0.75).unwrap();
        assert_eq!(t.threshold(), 0);
        t.ensure_allocated();
        assert_eq!(t.threshold(), 12);
        let old = t.grow();
        assert_eq!(old.len(), 16);
        assert_eq!(t.capacity(), 32);
        assert_eq!(t.threshold(), 24);
        assert!(t.roots().next().is_none());
    }
}
