//! Check command implementation

use anyhow::Result;
use itertools::Itertools;
use tracing::info;
use trend_hedge_strategies::{available_strategies, create_strategy, Config};

pub fn run(config_path: String) -> Result<()> {
    info!("Checking configuration: {}", config_path);

    let config = Config::from_file(&config_path)?;
    info!(
        label = %config.label,
        symbol = %config.instrument.symbol,
        pip_size = config.instrument.pip_size,
        strategy = %config.strategy_name,
        "Configuration loaded"
    );
    info!(
        "Available strategies: {}",
        available_strategies().iter().join(", ")
    );

    let strategy = create_strategy(&config)?;

    println!("Configuration OK");
    println!("  label:      {}", strategy.label());
    println!("  strategy:   {}", strategy.name());
    println!("  instrument: {}", strategy.instrument().symbol);
    println!(
        "  volume:     {} .. {} lots, step {}",
        config.instrument.min_volume, config.instrument.max_volume, config.instrument.volume_step
    );
    println!(
        "  parameters: {}",
        serde_json::to_string_pretty(&config.strategy)?
    );
    Ok(())
}
