//! Performance benchmarks for trend-hedge-strategies
//!
//! Run with: `cargo bench`
//! View results: `open target/criterion/report/index.html`

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use trend_hedge_strategies::indicators::wilder_smoothing;
use trend_hedge_strategies::strategies::trend_channel::{EntrySignalEvaluator, OpeningMethod};
use trend_hedge_strategies::{Candle, ChannelEngine, Side};

fn wavy_candles(n: usize) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let mid = 1.1 + 0.01 * (i as f64 / 25.0).sin() + 0.00001 * i as f64;
            Candle::new_unchecked(
                start + Duration::hours(i as i64),
                mid,
                mid + 0.0008,
                mid - 0.0008,
                mid + 0.0002,
                100.0,
            )
        })
        .collect()
}

fn benchmark_indicators(c: &mut Criterion) {
    let lows: Vec<f64> = wavy_candles(10_000).iter().map(|c| c.low).collect();
    c.bench_function("wilder_smoothing_10k_144", |b| {
        b.iter(|| wilder_smoothing(black_box(&lows), 144))
    });
}

fn benchmark_channel_engine(c: &mut Criterion) {
    let candles = wavy_candles(10_000);

    c.bench_function("channel_engine_update_10k", |b| {
        b.iter(|| {
            let mut engine = ChannelEngine::new(33, 144).unwrap();
            for candle in &candles {
                engine.update(candle.clone()).unwrap();
            }
            black_box(engine.len())
        })
    });

    let mut engine = ChannelEngine::new(33, 144).unwrap();
    for candle in &candles {
        engine.update(candle.clone()).unwrap();
    }
    c.bench_function("entry_signals_scan_10k", |b| {
        b.iter(|| {
            let eval = EntrySignalEvaluator::new(&engine);
            (engine.min_history()..engine.len())
                .filter(|&i| {
                    eval.evaluate(OpeningMethod::BothChannel, Side::Buy, i)
                        || eval.evaluate(OpeningMethod::BothChannel, Side::Sell, i)
                })
                .count()
        })
    });
}

criterion_group!(benches, benchmark_indicators, benchmark_channel_engine);
criterion_main!(benches);
