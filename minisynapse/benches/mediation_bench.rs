//! Benchmarks for predicate evaluation and sequence processing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use minisynapse::prelude::*;
use minisynapse::testing::MessageContextBuilder;
use std::sync::Arc;

fn predicate_benchmark(c: &mut Criterion) {
    let predicate = Predicate::parse(
        "ctx.method == 'POST' and 'x-tenant' in ctx.headers and not (ctx.path matches '^/internal/')",
    )
    .expect("valid predicate");
    let ctx = MessageContextBuilder::new()
        .method("POST")
        .path("/orders")
        .header("X-Tenant", "acme")
        .build();

    c.bench_function("predicate_parse", |b| {
        b.iter(|| Predicate::parse(black_box("ctx.properties['score'] >= 0.5 or ctx.status == 404")))
    });
    c.bench_function("predicate_evaluate", |b| {
        b.iter(|| predicate.evaluate(black_box(&ctx)))
    });
}

fn sequence_benchmark(c: &mut Criterion) {
    let sink: Arc<dyn LogSink> = Arc::new(NoOpLogSink);
    let log = |message: &str| -> Mediator {
        LogMediator::with_sink(LogLevel::Info, Some(message.to_string()), sink.clone()).into()
    };
    let sequence = Sequence::new(
        "bench",
        vec![
            log("received"),
            FilterMediator::new(
                Predicate::parse("ctx.method == 'GET'").expect("valid predicate"),
                vec![log("get"), log("routed")],
            )
            .into(),
            log("done"),
        ],
    );
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");

    c.bench_function("sequence_log_and_filter", |b| {
        b.iter(|| {
            let mut ctx = MessageContextBuilder::new().path("/orders").build();
            runtime.block_on(sequence.process(&mut ctx)).expect("no send mediators");
            black_box(ctx.into_response())
        })
    });
}

criterion_group!(benches, predicate_benchmark, sequence_benchmark);
criterion_main!(benches);
