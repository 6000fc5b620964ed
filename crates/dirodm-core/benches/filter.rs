//! Filter building, parsing and evaluation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dirodm_core::catalog::{AttributeMetadata, ClassMetadata, Registry};
use dirodm_core::convert::ConverterSet;
use dirodm_core::filter::{Filter, FilterBuilder, FilterEvaluator};
use dirodm_proto::{DirectoryEntry, Dn, OBJECT_CLASS};
use std::sync::Arc;

fn registry() -> Arc<Registry> {
    let person = ClassMetadata::builder("Person")
        .object_class("person")
        .attribute(AttributeMetadata::string("name", "cn"))
        .attribute(AttributeMetadata::string("surname", "sn"))
        .attribute(AttributeMetadata::integer("age", "age"))
        .build()
        .unwrap();
    Arc::new(Registry::builder().with_metadata(person).build().unwrap())
}

fn entries(count: usize) -> Vec<DirectoryEntry> {
    (0..count)
        .map(|i| {
            let cn = format!("user{i}");
            DirectoryEntry::new(Dn::parse(&format!("cn={cn},ou=people,dc=example")).unwrap())
                .with_values(OBJECT_CLASS, ["top", "person"])
                .with_values("cn", [cn.as_str()])
                .with_values("sn", [if i % 2 == 0 { "Even" } else { "Odd" }])
                .with_values("age", [(20 + i % 50).to_string().as_str()])
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter/build");
    let registry = registry();
    let converters = Arc::new(ConverterSet::standard());

    group.bench_function("typed_or", |b| {
        b.iter(|| {
            let mut builder =
                FilterBuilder::new(Arc::clone(&registry), Arc::clone(&converters), "Person")
                    .unwrap();
            let name = builder.property("name").unwrap().equals_to("alex").unwrap();
            let age = builder.property("age").unwrap().greater_or_equals(30i64).unwrap();
            builder.or([name, age]);
            black_box(builder.build().encode());
        });
    });

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter/parse");
    let text = "(&(objectClass=top)(objectClass=person)(|(cn=al*x)(sn=Math\\2aieu))(!(age<=18)))";

    group.bench_function("nested", |b| {
        b.iter(|| black_box(Filter::parse(black_box(text)).unwrap()));
    });

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter/evaluate");
    let filter = Filter::and([
        Filter::equals(OBJECT_CLASS, "person"),
        Filter::equals("sn", "even"),
        Filter::greater_or_equal("age", "40"),
    ]);
    let wildcard = Filter::parse("(cn=user1*)").unwrap();

    for size in [100, 1000, 10000] {
        let entries = entries(size);
        group.bench_with_input(BenchmarkId::new("and", size), &entries, |b, entries| {
            b.iter(|| {
                black_box(
                    entries
                        .iter()
                        .filter(|e| FilterEvaluator::matches(&filter, e))
                        .count(),
                )
            });
        });
        group.bench_with_input(BenchmarkId::new("wildcard", size), &entries, |b, entries| {
            b.iter(|| {
                black_box(
                    entries
                        .iter()
                        .filter(|e| FilterEvaluator::matches(&wildcard, e))
                        .count(),
                )
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_parse, bench_evaluate);

criterion_main!(benches);
