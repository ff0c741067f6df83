use criterion::{Criterion, criterion_group, criterion_main};
use reward_relayer::domain::{QuoteCalculator, QuoteRequest};
use reward_relayer::infra::FixedRateQuoteCalculator;
use reward_relayer::infra::wallet::{encode_transfer, to_base_units};
use rust_decimal::Decimal;
use std::hint::black_box;
use validator::Validate;

const RECIPIENT: &str = "0x1111111111111111111111111111111111111111";

fn bench_calldata(c: &mut Criterion) {
    let amount = Decimal::new(1_234_567, 3);

    c.bench_function("to_base_units", |b| {
        b.iter(|| to_base_units(black_box(amount)))
    });

    c.bench_function("encode_transfer", |b| {
        b.iter(|| encode_transfer(black_box(RECIPIENT), black_box(amount)))
    });
}

fn bench_quotes(c: &mut Criterion) {
    let calculator = FixedRateQuoteCalculator::new(Decimal::new(2, 2), Decimal::new(5, 1))
        .expect("valid rates");
    let request = QuoteRequest {
        user_id: "bench-user".to_string(),
        g1_quantity: Decimal::from(1000),
        usd_quantity: Decimal::new(2550, 2),
    };

    c.bench_function("validate_quote_request", |b| {
        b.iter(|| {
            let _ = black_box(&request).validate();
        })
    });

    c.bench_function("compute_quote", |b| {
        b.iter(|| calculator.compute(black_box(&request)))
    });
}

criterion_group!(benches, bench_calldata, bench_quotes);
criterion_main!(benches);
