use prometheus::{Counter, Encoder, Gauge, Registry, TextEncoder};
use lazy_static::lazy_static;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref PRICE_UPDATES_APPLIED: Counter = Counter::new(
        "price_updates_applied_total",
        "Price update events applied to the registry"
    ).unwrap();

    pub static ref PRICE_UPDATES_DISCARDED: Counter = Counter::new(
        "price_updates_discarded_total",
        "Price update events dropped because the token no longer exists"
    ).unwrap();

    pub static ref FEED_TICKS: Counter = Counter::new(
        "feed_ticks_total",
        "Feed simulator ticks that emitted events"
    ).unwrap();

    pub static ref FEED_TICKS_SKIPPED: Counter = Counter::new(
        "feed_ticks_skipped_total",
        "Feed simulator ticks skipped on an empty registry"
    ).unwrap();

    pub static ref REGISTRY_TOKENS: Gauge = Gauge::new(
        "registry_tokens",
        "Tokens currently held by the registry"
    ).unwrap();

    pub static ref VIEW_TOKENS: Gauge = Gauge::new(
        "view_tokens",
        "Tokens currently in the projected view"
    ).unwrap();
}

pub fn init() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(PRICE_UPDATES_APPLIED.clone()))?;
    REGISTRY.register(Box::new(PRICE_UPDATES_DISCARDED.clone()))?;
    REGISTRY.register(Box::new(FEED_TICKS.clone()))?;
    REGISTRY.register(Box::new(FEED_TICKS_SKIPPED.clone()))?;
    REGISTRY.register(Box::new(REGISTRY_TOKENS.clone()))?;
    REGISTRY.register(Box::new(VIEW_TOKENS.clone()))?;
    Ok(())
}

/// Text exposition of everything registered in [`REGISTRY`].
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
