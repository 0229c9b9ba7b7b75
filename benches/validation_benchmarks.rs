use criterion::{Criterion, criterion_group, criterion_main};
use rulecheck::*;
use std::collections::HashMap;
use std::hint::black_box;

fn book_validator() -> Validator {
    Validator::builder()
        .field(RuleSet::for_field("Title").not_empty().length_between(3, 100))
        .field(RuleSet::for_field("Description").max_length(500))
        .field(RuleSet::for_field("Email").not_empty().email())
        .field(RuleSet::for_field("Isbn").matches(r"^\d{3}-\d{10}$"))
        .build()
        .unwrap()
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    let validator = book_validator();

    let valid = Record::new()
        .with("Title", "The Rust Programming Language")
        .with("Description", "An introduction")
        .with("Email", "author@example.com")
        .with("Isbn", "978-1718503106");

    let invalid = Record::new()
        .with("Title", "")
        .with("Email", "nobody@")
        .with("Isbn", "unknown");

    group.bench_function("valid_record", |b| {
        b.iter(|| validator.validate(black_box(&valid)))
    });

    group.bench_function("invalid_record", |b| {
        b.iter(|| validator.validate(black_box(&invalid)))
    });

    group.bench_function("guarded_skip", |b| {
        let guarded = Validator::builder()
            .field(
                RuleSet::for_field("DateOfBirth")
                    .must_satisfy(|value: &FieldValue| value.as_date().is_some())
                    .when_present("DateOfBirth"),
            )
            .build()
            .unwrap();
        let record = Record::new();
        b.iter(|| guarded.validate(black_box(&record)))
    });

    group.finish();
}

fn bench_parallel(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_parallel");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let validator = book_validator();
    let record = Record::new().with("Title", "ab").with("Email", "x@y.z");

    group.bench_function("four_fields", |b| {
        b.to_async(&runtime)
            .iter(|| async { validator.validate_parallel(black_box(&record)).await })
    });

    group.finish();
}

fn bench_message_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_format");

    let context = HashMap::from([
        ("PropertyName".to_string(), "Title".to_string()),
        ("MinLength".to_string(), "3".to_string()),
        ("MaxLength".to_string(), "100".to_string()),
    ]);

    group.bench_function("three_tokens", |b| {
        b.iter(|| {
            message::format(
                black_box("{PropertyName} must be between {MinLength} and {MaxLength}"),
                &context,
            )
        })
    });

    group.bench_function("no_tokens", |b| {
        b.iter(|| message::format(black_box("plain message without placeholders"), &context))
    });

    group.finish();
}

criterion_group!(
    validation_benches,
    bench_validate,
    bench_parallel,
    bench_message_format,
);

criterion_main!(validation_benches);
