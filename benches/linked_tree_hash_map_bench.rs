use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rb_hashmap::{LinkedTreeHashMap, TreeHashMap};
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

// Insert cost of the ordered overlay next to the plain map.
fn bench_insert_100k(c: &mut Criterion) {
    c.bench_function("linked::insert_fresh_100k", |b| {
        b.iter_batched(
            LinkedTreeHashMap::<String, u64>::new,
            |mut m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    m.insert(key(x), i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("plain::insert_fresh_100k", |b| {
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

fn bench_remove_half_100k(c: &mut Criterion) {
    c.bench_function("linked::remove_every_other_of_100k", |b| {
        b.iter_batched(
            || {
                let keys: Vec<String> = lcg(2).take(100_000).map(key).collect();
                let mut m = LinkedTreeHashMap::new();
                for (i, k) in keys.iter().enumerate() {
                    m.insert(k.clone(), i as u64);
                }
                (m, keys)
            },
            |(mut m, keys)| {
                for k in keys.iter().step_by(2) {
                    black_box(m.remove(k.as_str()));
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_ordered_iter_100k(c: &mut Criterion) {
    c.bench_function("linked::iter_in_order_100k", |b| {
        let mut m = LinkedTreeHashMap::new();
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
    name = benches;
    config = bench_config();
    targets = bench_insert_100k,
              bench_remove_half_100k,
              bench_ordered_iter_100k
}
criterion_main!(benches);
