//! Channels command implementation

use anyhow::{bail, Result};
use itertools::Itertools;
use tracing::{info, warn};
use trend_hedge_strategies::strategies::trend_channel::TrendChannelConfig;
use trend_hedge_strategies::{data, ChannelEngine, ChannelKind, Config, TrendState};

pub fn run(config_path: String, data_path: String, last: usize) -> Result<()> {
    let config = Config::from_file(&config_path)?;
    info!("Loaded configuration from: {}", config_path);

    let params: TrendChannelConfig = config.strategy_params()?;
    params.validate()?;

    let candles = data::load_csv(&data_path)?;
    info!("Loaded {} bars from {}", candles.len(), data_path);

    let validation = data::validate_candles(&candles);
    for warning in &validation.warnings {
        warn!("{}", warning);
    }
    if !validation.is_valid() {
        bail!(
            "Bar data failed validation:\n  {}",
            validation.errors.iter().join("\n  ")
        );
    }

    let mut engine = ChannelEngine::new(params.short_period, params.long_period)?;
    for candle in candles {
        engine.update(candle)?;
    }

    let fmt_band = |kind: ChannelKind, index: usize| match engine.bands_at(kind, index) {
        Ok(b) => format!("{:>12.5} {:>12.5}", b.low, b.high),
        Err(_) => format!("{:>12} {:>12}", "-", "-"),
    };

    println!(
        "{} / {} on {} ({} bars, signals from bar {})",
        params.short_period,
        params.long_period,
        config.instrument.symbol,
        engine.len(),
        engine.min_history()
    );
    println!(
        "{:<20} {:>10} {:>12} {:>12} {:>12} {:>12}  trend",
        "datetime", "close", "short_low", "short_high", "long_low", "long_high"
    );

    let start = engine.len().saturating_sub(last);
    for (index, bar) in engine.series().bars().iter().enumerate().skip(start) {
        println!(
            "{:<20} {:>10.5} {} {}  {}",
            bar.datetime.format("%Y-%m-%d %H:%M"),
            bar.close,
            fmt_band(ChannelKind::Short, index),
            fmt_band(ChannelKind::Long, index),
            TrendState::at(&engine, index)
        );
    }

    Ok(())
}
