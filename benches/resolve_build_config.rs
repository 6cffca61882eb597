use camino::Utf8Path;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use democov::models::DEFAULT_REQUIRED_SETTINGS;
use democov::services::BuildConfigResolver;
use std::hint::black_box;

/// A cache of `entries` filler lines with the required settings at the end, which is
/// where a real cache puts project options relative to the CMake internals.
fn synthetic_cache(entries: usize) -> String {
    let mut cache = String::from("# This is the CMakeCache file.\n");
    for i in 0..entries {
        cache.push_str(&format!("//Filler entry {i}\nCMAKE_FILLER_{i}:STRING=value{i}\n\n"));
    }
    cache.push_str("BUILD_PLATFORM:STRING=linux\nOPT_LEVEL:STRING=0\nUBSAN:BOOL=OFF\nLTO:BOOL=OFF\n");
    cache
}

// ============================================================================
// Benchmark: Cache Resolution
// ============================================================================

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_build_config");
    let resolver = BuildConfigResolver::new();
    let source = Utf8Path::new("CMakeCache.txt");

    for entries in [10, 500, 5_000] {
        let cache = synthetic_cache(entries);
        group.throughput(Throughput::Bytes(cache.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(entries), &cache, |b, cache| {
            b.iter(|| {
                black_box(
                    resolver
                        .resolve_str(cache, source, &DEFAULT_REQUIRED_SETTINGS)
                        .unwrap(),
                );
            });
        });
    }

    group.finish();
}

fn bench_parse_line(c: &mut Criterion) {
    let resolver = BuildConfigResolver::new();

    c.bench_function("parse_line", |b| {
        b.iter(|| black_box(resolver.parse_line(black_box("OPT_LEVEL:STRING=3"))));
    });
}

criterion_group!(benches, bench_resolve, bench_parse_line);
criterion_main!(benches);
