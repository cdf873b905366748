use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rb_hashmap::{Natural, TreeHashMap};
use std::hash::{BuildHasher, Hasher};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

// Keeps only 6 bits of hash: 64 distinct hashes for the whole key set, so
// every bucket holds a deep tree.
#[derive(Clone, Default)]
struct NarrowBuildHasher;
#[derive(Default)]
struct NarrowHasher(u64);
impl BuildHasher for NarrowBuildHasher {
    type Hasher = NarrowHasher;
    fn build_hasher(&self) -> Self::Hasher {
        NarrowHasher::default()
    }
}
impl Hasher for NarrowHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.wrapping_mul(31).wrapping_add(u64::from(b));
        }
    }
    fn finish(&self) -> u64 {
        self.0 & 0x3f
    }
}

fn bench_insert_fresh_100k(c: &mut Criterion) {
    c.bench_function("tree::insert_fresh_100k", |b| {
        b.iter_batched(
            TreeHashMap::<String, u64>::new,
            |mut m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    m.insert(key(x), i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_presized_100k(c: &mut Criterion) {
    c.bench_function("tree::insert_presized_100k", |b| {
        b.iter_batched(
            || TreeHashMap::<String, u64>::with_capacity(1 << 18),
            |mut m| {
                for (i, x) in lcg(3).take(100_000).enumerate() {
                    m.insert(key(x), i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_colliding_10k(c: &mut Criterion) {
    c.bench_function("tree::insert_colliding_unordered_10k", |b| {
        b.iter_batched(
            || TreeHashMap::<String, u64, _>::with_hasher(NarrowBuildHasher),
            |mut m| {
                for (i, x) in lcg(4).take(10_000).enumerate() {
                    m.insert(key(x), i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("tree::insert_colliding_natural_10k", |b| {
        b.iter_batched(
            || {
                rb_hashmap::Builder::new()
                    .hasher(NarrowBuildHasher)
                    .comparator(Natural)
                    .build::<String, u64>()
                    .unwrap()
            },
            |mut m| {
                for (i, x) in lcg(4).take(10_000).enumerate() {
                    m.insert(key(x), i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_remove_random_10k(c: &mut Criterion) {
    c.bench_function("tree::remove_random_10k_of_110k", |b| {
        b.iter_batched(
            || {
                let mut m = TreeHashMap::new();
                let keys: Vec<String> = lcg(5).take(110_000).map(key).collect();
                for (i, k) in keys.iter().enumerate() {
                    m.insert(k.clone(), i as u64);
                }
                let mut s = 0x9e3779b97f4a7c15u64;
                let mut sel = std::collections::HashSet::with_capacity(10_000);
                while sel.len() < 10_000 {
                    s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
                    sel.insert((s as usize) % keys.len());
                }
                let victims: Vec<String> = sel.into_iter().map(|i| keys[i].clone()).collect();
                (m, victims)
            },
            |(mut m, victims)| {
                for k in &victims {
                    black_box(m.remove(k.as_str()));
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit_and_miss_10k(c: &mut Criterion) {
    let mut m = TreeHashMap::new();
    let keys: Vec<String> = lcg(7).take(100_000).map(key).collect();
    for (i, k) in keys.iter().enumerate() {
        m.insert(k.clone(), i as u64);
    }
    let hits: Vec<&str> = keys.iter().step_by(10).map(String::as_str).collect();
    let misses: Vec<String> = lcg(8).take(10_000).map(key).collect();

    c.bench_function("tree::get_hit_10k", |b| {
        b.iter(|| {
            for k in &hits {
                black_box(m.get(*k));
            }
        })
    });

    c.bench_function("tree::get_miss_10k", |b| {
        b.iter(|| {
            for k in &misses {
                black_box(m.get(k.as_str()));
            }
        })
    });
}

fn bench_iter_100k(c: &mut Criterion) {
    c.bench_function("tree::iter_all_100k", |b| {
        let mut m = TreeHashMap::new();
        for (i, x) in lcg(999).take(100_000).enumerate() {
            m.insert(key(x), i as u64);
        }
        b.iter(|| {
            let mut sum = 0u64;
            for (_k, v) in m.iter() {
                sum = sum.wrapping_add(*v);
            }
            black_box(sum)
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_insert;
    config = bench_config();
    targets = bench_insert_fresh_100k,
              bench_insert_presized_100k,
              bench_insert_colliding_10k
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_remove_random_10k,
              bench_get_hit_and_miss_10k,
              bench_iter_100k
}
criterion_main!(benches_insert, benches_ops);
