use bitcaskd::storage::bitcask::Config;
use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Bencher, Criterion, Throughput};
use rand::prelude::*;
use tempfile::TempDir;

const ITER: usize = 1000;
const KEY_SIZE: usize = 32;
const VAL_SIZE: usize = 256;

fn prebuilt_kv_pairs(n: usize, key_size: usize, val_size: usize) -> Vec<(Bytes, Bytes)> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| {
            let key: Vec<u8> = (0..key_size).map(|_| rng.gen()).collect();
            let val: Vec<u8> = (0..val_size).map(|_| rng.gen()).collect();
            (Bytes::from(key), Bytes::from(val))
        })
        .collect()
}

/// Call `set` for every benchmark iteration against a freshly opened engine.
pub fn bench_write(c: &mut Criterion) {
    let kv_pairs = prebuilt_kv_pairs(ITER, KEY_SIZE, VAL_SIZE);
    let nbytes: usize = kv_pairs.iter().map(|(k, v)| k.len() + v.len()).sum();

    let mut g = c.benchmark_group("bitcask_sequential_write");
    g.throughput(Throughput::Bytes(nbytes as u64));
    g.bench_function("set", |b: &mut Bencher| {
        b.iter_batched(
            || {
                let tmpdir = TempDir::new().unwrap();
                let db = Config::default().open(tmpdir.path()).unwrap();
                (db, kv_pairs.clone(), tmpdir)
            },
            |(db, kv_pairs, _tmpdir)| {
                for (k, v) in kv_pairs {
                    db.set(black_box(k), black_box(v)).unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
    g.finish();
}

/// Call `get` against a pre-populated engine for every benchmark iteration.
pub fn bench_read(c: &mut Criterion) {
    let kv_pairs = prebuilt_kv_pairs(ITER, KEY_SIZE, VAL_SIZE);
    let nbytes: usize = kv_pairs.iter().map(|(k, v)| k.len() + v.len()).sum();

    let tmpdir = TempDir::new().unwrap();
    let db = Config::default().open(tmpdir.path()).unwrap();
    for (k, v) in kv_pairs.iter().cloned() {
        db.set(k, v).unwrap();
    }

    let mut g = c.benchmark_group("bitcask_sequential_read");
    g.throughput(Throughput::Bytes(nbytes as u64));
    g.bench_function("get", |b: &mut Bencher| {
        b.iter_batched(
            || {
                let mut kv_pairs = kv_pairs.clone();
                kv_pairs.shuffle(&mut rand::thread_rng());
                kv_pairs
            },
            |kv_pairs| {
                for (k, _) in kv_pairs {
                    db.get(black_box(&k)).unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
    g.finish();
}

criterion_group!(benches, bench_write, bench_read);
criterion_main!(benches);
