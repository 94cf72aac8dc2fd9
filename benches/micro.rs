//! Micro-benchmarks for carbonrec core operations.
//!
//! Uses Criterion for statistically rigorous measurement with regression
//! detection and HTML reports.
//!
//! # Running
//!
//! ```bash
//! cargo bench --bench micro              # run all micro-benchmarks
//! cargo bench --bench micro -- varuint   # filter by name
//! ```
//!
//! Reports are generated in `target/criterion/report/index.html`.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use carbonrec::archive::{Archive, ArchiveWriter};
use carbonrec::mem::{AccessMode, MemBlock, MemFile};
use carbonrec::pack::PackerKind;
use carbonrec::record::{CreateOptions, Record, RecordBuilder, RecordKey};
use carbonrec::strdict::StringDict;

// ------------------------------------------------------------------------------------------------
// Helpers
// ------------------------------------------------------------------------------------------------

/// Builds a unit-array record: one object with `n` string properties.
fn record_with_string_props(n: usize) -> Record {
    let keys: Vec<String> = (0..n).map(|i| format!("field-{i:06}")).collect();
    let mut builder = RecordBuilder::new(RecordKey::None, CreateOptions::keep()).unwrap();
    builder
        .insert_with(|ins| {
            ins.insert_object_with(0, |obj| {
                for key in &keys {
                    obj.prop_string(key, "some shared property value")?;
                }
                Ok(())
            })
        })
        .unwrap();
    builder.finish().unwrap()
}

// ------------------------------------------------------------------------------------------------
// Benchmarks
// ------------------------------------------------------------------------------------------------

fn bench_varuint(c: &mut Criterion) {
    let mut group = c.benchmark_group("varuint");
    for value in [0u64, 300, 1 << 30, u64::MAX] {
        group.bench_with_input(BenchmarkId::new("write_read", value), &value, |b, &v| {
            let mut block = MemBlock::with_capacity(16);
            b.iter(|| {
                let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);
                file.write_varuint(black_box(v)).unwrap();
                file.rewind();
                black_box(file.read_varuint().unwrap());
            });
        });
    }
    group.finish();
}

fn bench_dictionary(c: &mut Criterion) {
    let strings: Vec<String> = (0..1_000).map(|i| format!("dict-entry-{i}")).collect();
    let refs: Vec<&str> = strings.iter().map(String::as_str).collect();

    let mut group = c.benchmark_group("dictionary");
    group.throughput(Throughput::Elements(refs.len() as u64));

    group.bench_function("insert_1k_fresh", |b| {
        b.iter(|| {
            let dict = StringDict::with_capacity(1_024);
            black_box(dict.insert(&refs));
        });
    });

    let dict = StringDict::with_capacity(1_024);
    dict.insert(&refs);
    group.bench_function("locate_1k_hot", |b| {
        b.iter(|| black_box(dict.locate_fast(&refs)));
    });
    group.finish();
}

fn bench_record_build_and_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("record");
    for n in [100usize, 1_000] {
        group.bench_with_input(BenchmarkId::new("build_props", n), &n, |b, &n| {
            b.iter(|| black_box(record_with_string_props(n)));
        });

        let record = record_with_string_props(n);
        group.bench_with_input(BenchmarkId::new("iterate_props", n), &n, |b, _| {
            b.iter(|| {
                let mut it = record.iter().unwrap();
                assert!(it.next().unwrap());
                let mut obj = it.object_value().unwrap();
                let mut count = 0;
                while obj.next().unwrap() {
                    black_box(obj.string_value().unwrap());
                    count += 1;
                }
                assert_eq!(count, n);
            });
        });
    }
    group.finish();
}

fn bench_archive(c: &mut Criterion) {
    let record = record_with_string_props(1_000);

    let mut group = c.benchmark_group("archive");
    for kind in [PackerKind::Identity, PackerKind::Huffman] {
        group.bench_with_input(
            BenchmarkId::new("write_1k_props", format!("{kind:?}")),
            &kind,
            |b, &kind| {
                b.iter(|| black_box(ArchiveWriter::new(kind).write_record(&record).unwrap()));
            },
        );
    }

    let block = ArchiveWriter::new(PackerKind::Huffman)
        .write_record(&record)
        .unwrap();
    let bytes = block.move_contents_and_drop();
    group.bench_function("open_and_read_strings", |b| {
        b.iter(|| {
            let archive =
                Archive::from_block(carbonrec::mem::MemBlock::from_bytes(&bytes)).unwrap();
            let ids = archive.string_ids();
            black_box(archive.string(ids[0]).unwrap());
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_varuint,
    bench_dictionary,
    bench_record_build_and_iterate,
    bench_archive
);
criterion_main!(benches);
