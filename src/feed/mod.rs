use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use crate::config::FeedConfig;
use crate::error::Result;
use crate::metrics;
use crate::models::{clamp_percentage, PriceUpdate, Token};
use crate::store::StoreHandle;

/// Draws the wait before the next tick, in `[min_interval_ms, max_interval_ms)`.
pub fn next_delay<R: Rng + ?Sized>(config: &FeedConfig, rng: &mut R) -> Duration {
    let millis = if config.min_interval_ms < config.max_interval_ms {
        rng.gen_range(config.min_interval_ms..config.max_interval_ms)
    } else {
        config.min_interval_ms
    };
    Duration::from_millis(millis)
}

/// Builds one tick: picks `min_batch..=max_batch` tokens uniformly with replacement
/// and perturbs each. Every event is derived from the same snapshot, so repeated
/// picks of one token are independent moves and the last applied one wins.
pub fn generate_tick<R: Rng + ?Sized>(
    config: &FeedConfig,
    tokens: &[Token],
    rng: &mut R,
    now: DateTime<Utc>,
) -> Vec<PriceUpdate> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let count = rng.gen_range(config.min_batch..=config.max_batch.max(config.min_batch));
    (0..count)
        .map(|_| {
            let token = &tokens[rng.gen_range(0..tokens.len())];
            perturb(config, token, rng, now)
        })
        .collect()
}

fn perturb<R: Rng + ?Sized>(
    config: &FeedConfig,
    token: &Token,
    rng: &mut R,
    now: DateTime<Utc>,
) -> PriceUpdate {
    let price_move = symmetric(rng, config.max_price_move);
    let change_move = symmetric(rng, config.max_change_move);
    let change_1h_jitter = symmetric(rng, config.max_change_1h_move);
    PriceUpdate {
        token_id: token.id.clone(),
        price: (token.price * (1.0 + price_move)).max(config.price_floor),
        price_change_24h: clamp_percentage(token.price_change_24h + change_move),
        timestamp: now,
        change_1h_jitter,
    }
}

fn symmetric<R: Rng + ?Sized>(rng: &mut R, bound: f64) -> f64 {
    if bound > 0.0 {
        rng.gen_range(-bound..=bound)
    } else {
        0.0
    }
}

struct FeedTask {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Timer-driven price tick generator writing into a [`StoreHandle`].
///
/// Each tick takes the store's write lock, re-checks cancellation under it, then
/// applies its whole batch before releasing. `stop` signals cancellation and joins
/// the task, so nothing is applied once it returns.
pub struct PriceFeedSimulator {
    config: FeedConfig,
    store: StoreHandle,
    task: Option<FeedTask>,
}

impl PriceFeedSimulator {
    pub fn new(config: FeedConfig, store: StoreHandle) -> Self {
        Self {
            config,
            store,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |task| !task.handle.is_finished())
    }

    /// Spawns the feed loop. Returns `false` if it was already running.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            debug!("Price feed already running");
            return false;
        }
        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (cancel, cancelled) = watch::channel(false);
        let handle = tokio::spawn(run_feed(
            self.config.clone(),
            self.store.clone(),
            rng,
            cancelled,
        ));
        self.task = Some(FeedTask { cancel, handle });
        info!(
            "Price feed started ({}-{}ms, {}-{} tokens per tick)",
            self.config.min_interval_ms,
            self.config.max_interval_ms,
            self.config.min_batch,
            self.config.max_batch
        );
        true
    }

    /// Stops the feed and waits for the loop to exit. Stopping twice is a no-op.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        let _ = task.cancel.send(true);
        task.handle.await?;
        info!("Price feed stopped");
        Ok(())
    }
}

impl Drop for PriceFeedSimulator {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.cancel.send(true);
            task.handle.abort();
        }
    }
}

async fn run_feed(
    config: FeedConfig,
    store: StoreHandle,
    mut rng: StdRng,
    mut cancelled: watch::Receiver<bool>,
) {
    if config.emit_on_start && !tick(&config, &store, &mut rng, &cancelled).await {
        return;
    }
    loop {
        let delay = next_delay(&config, &mut rng);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancelled.changed() => break,
        }
        if !tick(&config, &store, &mut rng, &cancelled).await {
            break;
        }
    }
    debug!("Price feed loop exited");
}

/// Runs one tick under the store's write lock. Returns `false` once cancelled.
async fn tick(
    config: &FeedConfig,
    store: &StoreHandle,
    rng: &mut StdRng,
    cancelled: &watch::Receiver<bool>,
) -> bool {
    let mut guard = store.write().await;
    if *cancelled.borrow() {
        return false;
    }
    if guard.registry().is_empty() {
        debug!("Registry empty, skipping tick");
        metrics::FEED_TICKS_SKIPPED.inc();
        return true;
    }
    let updates = generate_tick(config, guard.registry().as_slice(), rng, Utc::now());
    let applied = store.apply_batch_locked(&mut guard, &updates);
    if applied < updates.len() {
        warn!("{} of {} tick events found no token", updates.len() - applied, updates.len());
    }
    metrics::FEED_TICKS.inc();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenCategory;
    use crate::store::TokenStore;
    use crate::tests::common::{create_test_token, create_test_tokens, ts};

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_delay_stays_in_window() {
        let config = FeedConfig::default();
        let mut rng = seeded();
        for _ in 0..500 {
            let delay = next_delay(&config, &mut rng);
            assert!(delay >= Duration::from_millis(500) && delay < Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_tick_respects_batch_and_jitter_bounds() {
        let config = FeedConfig::default();
        let tokens = create_test_tokens();
        let mut rng = seeded();
        for _ in 0..200 {
            let updates = generate_tick(&config, &tokens, &mut rng, ts(1000));
            assert!((2..=3).contains(&updates.len()));
            for update in &updates {
                let source = tokens.iter().find(|t| t.id == update.token_id).unwrap();
                let ratio = update.price / source.price;
                assert!(ratio >= 0.97 - 1e-9 && ratio <= 1.03 + 1e-9, "ratio {}", ratio);
                assert!((update.price_change_24h - source.price_change_24h).abs() <= 0.75 + 1e-9);
                assert!(update.change_1h_jitter.abs() <= 0.25 + 1e-9);
                assert_eq!(update.timestamp, ts(1000));
            }
        }
    }

    #[test]
    fn test_tick_clamps_and_floors() {
        let config = FeedConfig::default();
        let mut pinned = create_test_token("p", TokenCategory::NewPairs, 0.0);
        pinned.price_change_24h = 99.0;
        let mut rng = seeded();
        for _ in 0..100 {
            for update in generate_tick(&config, std::slice::from_ref(&pinned), &mut rng, ts(5)) {
                assert!(update.price >= config.price_floor);
                assert!(update.price_change_24h <= 99.0 && update.price_change_24h >= 98.25 - 1e-9);
            }
        }
    }

    #[test]
    fn test_empty_registry_yields_no_events() {
        let mut rng = seeded();
        assert!(generate_tick(&FeedConfig::default(), &[], &mut rng, ts(0)).is_empty());
    }

    #[test]
    fn test_duplicate_picks_resolve_to_last_event() {
        let config = FeedConfig {
            min_batch: 3,
            max_batch: 3,
            ..FeedConfig::default()
        };
        let mut store = TokenStore::new();
        store.load_tokens(vec![create_test_token("solo", TokenCategory::Migrated, 10.0)]);
        let mut rng = seeded();

        let updates = generate_tick(&config, store.registry().as_slice(), &mut rng, ts(4000));
        assert_eq!(updates.len(), 3);
        assert!(updates.iter().all(|u| u.token_id == "solo"));

        assert_eq!(store.apply_price_batch(&updates).len(), 3);
        let last = updates.last().unwrap();
        let token = store.registry().get("solo").unwrap();
        assert_eq!(token.price, last.price);
        assert_eq!(token.price_change_24h, last.price_change_24h);
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let config = FeedConfig::default();
        let tokens = create_test_tokens();
        let a = generate_tick(&config, &tokens, &mut StdRng::seed_from_u64(99), ts(1));
        let b = generate_tick(&config, &tokens, &mut StdRng::seed_from_u64(99), ts(1));
        assert_eq!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_updates_store_until_stopped() {
        let store = StoreHandle::new(TokenStore::new());
        store.load_tokens(create_test_tokens()).await;
        let config = FeedConfig {
            seed: Some(3),
            ..FeedConfig::default()
        };
        let mut feed = PriceFeedSimulator::new(config, store.clone());

        assert!(feed.start());
        assert!(!feed.start());
        tokio::time::sleep(Duration::from_secs(5)).await;
        feed.stop().await.unwrap();

        let revision = store.snapshot().await.revision;
        assert!(revision > 1, "feed should have ticked, revision {}", revision);

        let mut changes = store.subscribe();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(changes.try_recv().is_err());
        assert_eq!(store.snapshot().await.revision, revision);
        assert!(!feed.is_running());

        // idempotent
        feed.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_registry_ticks_are_skipped() {
        let store = StoreHandle::new(TokenStore::new());
        let config = FeedConfig {
            emit_on_start: true,
            ..FeedConfig::default()
        };
        let mut feed = PriceFeedSimulator::new(config, store.clone());
        feed.start();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(feed.is_running());
        feed.stop().await.unwrap();
        assert_eq!(store.snapshot().await.revision, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop() {
        let store = StoreHandle::new(TokenStore::new());
        store.load_tokens(create_test_tokens()).await;
        let mut feed = PriceFeedSimulator::new(FeedConfig::default(), store.clone());

        feed.start();
        feed.stop().await.unwrap();
        assert!(feed.start());
        tokio::time::sleep(Duration::from_secs(2)).await;
        feed.stop().await.unwrap();
        assert!(store.snapshot().await.revision > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_tick_waiting_on_the_lock() {
        let store = StoreHandle::new(TokenStore::new());
        store.load_tokens(create_test_tokens()).await;
        let mut feed = PriceFeedSimulator::new(FeedConfig::default(), store.clone());

        let reader = store.read().await;
        let revision = reader.revision();
        feed.start();
        // first tick is due within a second and now waits for the write lock
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let stopping = tokio::spawn(async move {
            let result = feed.stop().await;
            (feed, result)
        });
        // lets the stop task send cancellation and park on the join
        tokio::time::sleep(Duration::from_millis(1)).await;
        drop(reader);

        let (feed, result) = stopping.await.unwrap();
        result.unwrap();
        assert!(!feed.is_running());
        assert_eq!(store.snapshot().await.revision, revision);
        assert_eq!(store.tokens().await, create_test_tokens());
    }
}
