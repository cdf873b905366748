#![cfg(test)]

// Property tests for TreeHashMap kept inside the crate so they can reach
// the structural checker alongside the public API.

use crate::ordering::{KeyComparator, Natural, Unordered};
use crate::tree_hash_map::TreeHashMap;
use core::hash::BuildHasher;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hasher;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    ContainsValue(i32),
    Mutate(usize, i32),
    Iterate,
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            6 => (idx.clone(), -8i32..8).prop_map(|(i, v)| OpI::Insert(i, v)),
            3 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => (-10i32..10).prop_map(OpI::ContainsValue),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::Clear),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - insert returns the previous value exactly when the model had the key.
// - get/contains_key/contains_value agree with the model.
// - remove returns the model's value; removing an absent key is a no-op.
// - iter yields each live entry exactly once.
// - After every op: validate() passes (red-black, order, placement, len).
fn run<S, C>(mut sut: TreeHashMap<Key, i32, S, C>, pool: &[String], ops: Vec<OpI>) -> Result<(), TestCaseError>
where
    S: BuildHasher,
    C: KeyComparator<Key> + KeyComparator<str>,
{
    let mut model: HashMap<Key, i32> = HashMap::new();
    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(pool, i);
                let prev = sut.insert(k.clone(), v);
                prop_assert_eq!(prev, model.insert(k, v));
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
            }
            OpI::Get(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            OpI::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            OpI::ContainsValue(v) => {
                let has_model = model.values().any(|&mv| mv == v);
                prop_assert_eq!(sut.contains_value(&v), has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(pool, i);
                if let Some(vr) = sut.get_mut(&k) {
                    *vr = vr.saturating_add(d);
                    let mv = model.get_mut(&k).expect("model has live key");
                    *mv = mv.saturating_add(d);
                } else {
                    prop_assert!(!model.contains_key(&k));
                }
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.keys().cloned().collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(sut.iter().count(), model.len());
                prop_assert_eq!(s_keys, m_keys);
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
            }
        }

        if let Err(e) = sut.validate() {
            return Err(TestCaseError::fail(format!("invariant broken: {e}")));
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    for (k, v) in &model {
        prop_assert_eq!(sut.get(k), Some(v));
    }
    Ok(())
}

// Collision variant using a constant hasher to stress tie resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Two-value hasher: keys split by length parity into two hash classes, so
// trees mix hash-ordered and tie-ordered regions.
#[derive(Clone, Default)]
struct ParityBuildHasher;
#[derive(Default)]
struct ParityHasher(u64);
impl BuildHasher for ParityBuildHasher {
    type Hasher = ParityHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ParityHasher::default()
    }
}
impl Hasher for ParityHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.0 = self.0.wrapping_add(bytes.len() as u64);
    }
    fn finish(&self) -> u64 {
        (self.0 % 2) << 40
    }
}

// Orders two keys only when both have even length; other pairs defer to
// creation order, so the order inside a hash class is not transitive.
#[derive(Clone, Copy, Default)]
struct EvenLengths;
impl KeyComparator<str> for EvenLengths {
    fn compare(&self, a: &str, b: &str) -> Option<core::cmp::Ordering> {
        (a.len() % 2 == 0 && b.len() % 2 == 0).then(|| a.cmp(b))
    }
}
impl KeyComparator<Key> for EvenLengths {
    fn compare(&self, a: &Key, b: &Key) -> Option<core::cmp::Ordering> {
        KeyComparator::<str>::compare(self, &a.0, &b.0)
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run(TreeHashMap::new(), &pool, ops)?;
    }

    // Every key collides and there is no key order: the creation-sequence
    // tie-break and subtree scans carry all the weight.
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let sut: TreeHashMap<Key, i32, ConstBuildHasher, Unordered> =
            TreeHashMap::with_hasher(ConstBuildHasher);
        run(sut, &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_with_collisions_natural((pool, ops) in arb_scenario()) {
        let sut = TreeHashMap::from_parts(Default::default(), ConstBuildHasher, Natural);
        run(sut, &pool, ops)?;
    }

    // Lookups and inserts must still find keys a non-transitive order has
    // rotated out of their comparator-predicted side.
    #[test]
    fn prop_state_machine_with_mixed_comparator((pool, ops) in arb_scenario()) {
        let sut = TreeHashMap::from_parts(Default::default(), ConstBuildHasher, EvenLengths);
        run(sut, &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_two_hash_classes((pool, ops) in arb_scenario()) {
        let sut: TreeHashMap<Key, i32, ParityBuildHasher, Unordered> =
            TreeHashMap::with_capacity_and_hasher(1, ParityBuildHasher);
        run(sut, &pool, ops)?;
    }
}
