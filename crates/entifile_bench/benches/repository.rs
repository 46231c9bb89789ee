//! Repository benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use entifile_bench::{generate_users, populated_repository};
use entifile_core::{EntityRepository, RepositoryConfig};
use entifile_testkit::{open_user_repository, COUNTRY_INDEX, USERNAME_INDEX};
use tempfile::TempDir;

/// Benchmark indexed lookups against a full scan.
fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    group.sample_size(20);

    for count in [100, 1000] {
        let (_dir, repo) = populated_repository(count);

        group.bench_with_input(BenchmarkId::new("unique_index", count), &count, |b, _| {
            b.iter(|| {
                let found = repo
                    .find_by_indexed_value(USERNAME_INDEX, black_box("user42"))
                    .unwrap();
                black_box(found);
            });
        });

        group.bench_with_input(BenchmarkId::new("non_unique_index", count), &count, |b, _| {
            b.iter(|| {
                let found = repo
                    .find_keys_by_indexed_value(COUNTRY_INDEX, black_box("Kenya"))
                    .unwrap();
                black_box(found);
            });
        });

        group.bench_with_input(BenchmarkId::new("scan", count), &count, |b, _| {
            b.iter(|| {
                let found = repo
                    .find_by_condition(|u| u.username == black_box("user42"))
                    .unwrap();
                black_box(found);
            });
        });
    }

    group.finish();
}

/// Benchmark saving users into an indexed repository.
fn bench_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("save");
    group.sample_size(10);

    for count in [10, 100] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("indexed", count), &count, |b, &count| {
            let users = generate_users(count);
            b.iter_with_setup(
                || {
                    let dir = TempDir::new().unwrap();
                    let repo = open_user_repository(dir.path(), RepositoryConfig::default())
                        .unwrap();
                    (dir, repo)
                },
                |(_dir, repo)| {
                    for user in &users {
                        repo.save(user).unwrap();
                    }
                },
            );
        });
    }

    group.finish();
}

/// Benchmark reloading indexes from their records.
fn bench_load_indexes(c: &mut Criterion) {
    let (_dir, repo) = populated_repository(1000);
    c.bench_function("load_indexes_1000", |b| {
        b.iter(|| repo.load_indexes().unwrap());
    });
}

criterion_group!(benches, bench_lookup, bench_save, bench_load_indexes);
criterion_main!(benches);
