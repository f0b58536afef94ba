use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{debug, error, info, warn, LevelFilter};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

use token_pulse::cli::Cli;
use token_pulse::config::Config;
use token_pulse::feed::PriceFeedSimulator;
use token_pulse::format::{format_currency, format_number, format_percentage, truncate_address};
use token_pulse::logging;
use token_pulse::metrics;
use token_pulse::models::{SortConfig, SortDirection};
use token_pulse::source::{load_with_retry, SimulatedTokenSource};
use token_pulse::store::{StoreHandle, StoreSnapshot, TokenStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.clone().unwrap_or_else(|| "config/config.toml".into());
    let mut config = if config_path.exists() {
        Config::load(&config_path)
            .with_context(|| format!("Failed to load configuration from {:?}", config_path))?
    } else if cli.config.is_some() {
        return Err(anyhow!("Configuration file {:?} does not exist", config_path));
    } else {
        Config::default()
    };
    apply_cli_overrides(&cli, &mut config)?;
    config.validate()?;

    let level = if cli.debug {
        LevelFilter::Debug
    } else {
        logging::parse_level(&config.logging.level)?
    };
    logging::init(level, config.logging.file.as_deref())?;
    metrics::init()?;
    info!("Starting token-pulse...");

    let store = StoreHandle::new(TokenStore::with_preferences(
        config.display.category,
        config.display.sort_config(),
    ));
    let source = SimulatedTokenSource::new(&config.source);

    if let Err(e) = load_with_retry(&source, &store, &config.source).await {
        error!("Initial token load failed: {}", e);
        return Err(anyhow!("Token load failed: {}", e));
    }

    let mut feed = PriceFeedSimulator::new(config.feed.clone(), store.clone());
    feed.start();

    let shutdown = async {
        match cli.duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for ctrl-c: {}", e);
                }
            }
        }
    };
    tokio::pin!(shutdown);

    let mut render_tick = interval(Duration::from_millis(config.display.refresh_ms));
    render_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let refresh = config.source.refresh_interval();
    let refresh_period = refresh.unwrap_or(Duration::from_secs(3600));
    let mut refresh_tick = interval_at(Instant::now() + refresh_period, refresh_period);
    let mut changes = store.subscribe();
    let mut dirty = true;

    info!("Watching listings...");
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = render_tick.tick() => {
                if dirty {
                    render(&store.snapshot().await, config.display.max_rows);
                    dirty = false;
                }
            }
            change = changes.recv() => match change {
                Ok(change) => {
                    debug!("Change {} received", change.revision);
                    dirty = true;
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Renderer lagged by {} changes", skipped);
                    dirty = true;
                }
                Err(RecvError::Closed) => break,
            },
            _ = refresh_tick.tick(), if refresh.is_some() => {
                info!("Refreshing token listings");
                if let Err(e) = load_with_retry(&source, &store, &config.source).await {
                    warn!("Listing refresh failed, keeping current tokens: {}", e);
                }
            }
        }
    }

    info!("Shutting down...");
    feed.stop().await?;
    match metrics::render() {
        Ok(text) => debug!("Final metrics:\n{}", text),
        Err(e) => warn!("Failed to render metrics: {}", e),
    }
    Ok(())
}

fn apply_cli_overrides(cli: &Cli, config: &mut Config) -> Result<()> {
    if let Some(category) = &cli.category {
        config.display.category = category.parse()?;
    }
    if let Some(direction) = &cli.direction {
        config.display.sort_direction = direction.parse::<SortDirection>()?;
    }
    if let Some(field) = &cli.sort {
        let sort = SortConfig::parse(Some(field), config.display.sort_direction);
        config.display.set_sort(sort.field, sort.direction);
    }
    if cli.debug {
        config.logging.level = "debug".to_string();
    }
    Ok(())
}

fn describe_sort(sort: &SortConfig) -> String {
    match sort.field {
        Some(field) => format!("{} {:?}", field, sort.direction).to_lowercase(),
        None => "none".to_string(),
    }
}

fn render(snapshot: &StoreSnapshot, max_rows: usize) {
    println!();
    println!(
        "[{}] {} of {} tokens | sort: {} | rev {}",
        snapshot.selected_category,
        snapshot.view.len(),
        snapshot.tokens.len(),
        describe_sort(&snapshot.sort_config),
        snapshot.revision
    );
    if let Some(err) = &snapshot.error {
        println!("  last load failed: {} (retrying on next refresh)", err);
    }
    println!(
        "{:<10} {:<13} {:>14} {:>9} {:>10} {:>10} {:>10} {:>6}",
        "SYMBOL", "ADDRESS", "PRICE", "24H", "VOLUME", "LIQ", "MCAP", "TXNS"
    );
    for token in snapshot.view.iter().take(max_rows) {
        println!(
            "{:<10} {:<13} {:>14} {:>9} {:>10} {:>10} {:>10} {:>6}",
            token.symbol,
            truncate_address(&token.address, 4, 4),
            format_currency(token.price),
            format_percentage(token.price_change_24h),
            format_number(token.volume_24h, 1, true),
            format_number(token.liquidity, 1, true),
            format_number(token.market_cap, 1, true),
            token.transactions
        );
    }
}
