#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sbml_tree::test_utils::{generated_model, ConventionTree};
use sbml_tree::{read_str, write_string, Document, MirrorSynchronizer, Reader};

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    for species in [10, 100, 1000] {
        let input = generated_model(species, species / 10);
        group.bench_with_input(BenchmarkId::from_parameter(species), &input, |b, input| {
            b.iter(|| read_str(black_box(input)).unwrap())
        });
    }
    group.finish();
}

fn bench_write(c: &mut Criterion) {
    let doc = read_str(&generated_model(1000, 100)).unwrap();

    c.bench_function("write_1000", |b| b.iter(|| write_string(black_box(&doc))));
}

fn bench_read_mirrored(c: &mut Criterion) {
    let input = generated_model(1000, 100);

    c.bench_function("read_mirrored_1000", |b| {
        b.iter(|| {
            let mut doc = Document::new();
            let (_, sync) = MirrorSynchronizer::attach(&mut doc, ConventionTree::new());
            Reader::new().read_into(&mut doc, black_box(&input)).unwrap();
            sync.borrow().linked_count()
        })
    });
}

criterion_group!(benches, bench_read, bench_write, bench_read_mirrored);
criterion_main!(benches);
