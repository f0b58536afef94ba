use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::Retry;
use crate::config::SourceConfig;
use crate::error::Result;
use crate::models::{clamp_percentage, Token, TokenCategory, TokenStatus, WalletStatus};
use crate::store::StoreHandle;

/// Producer of the initial token listings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Token>>;
}

const NAMED_LISTINGS: [(&str, &str, TokenCategory); 14] = [
    ("CRAFTIFY Minecraftification", "CRAFTIFY", TokenCategory::NewPairs),
    ("BTC Bear Tanking Coin", "BTCBEAR", TokenCategory::NewPairs),
    ("ALGD Aligned", "ALGD", TokenCategory::NewPairs),
    ("Rinsemas Rinsemas", "RINSEMAS", TokenCategory::NewPairs),
    ("Fakeout Jewish", "FAKEOUT", TokenCategory::NewPairs),
    ("SACHI Sachicoin", "SACHI", TokenCategory::FinalStretch),
    ("Goongrip iGrip", "GOONGRIP", TokenCategory::FinalStretch),
    ("89 The Official 89 Coin", "89", TokenCategory::FinalStretch),
    ("McDonalds McDonald's", "MCD", TokenCategory::FinalStretch),
    ("WW With What", "WW", TokenCategory::FinalStretch),
    ("Revive Revive Coin", "REVIVE", TokenCategory::Migrated),
    ("Yoda Yodacoin", "YODA", TokenCategory::Migrated),
    ("Maru Maru Chan", "MARU", TokenCategory::Migrated),
    ("SOL SOLANA", "SOL", TokenCategory::Migrated),
];

/// Listing ages to pick from: seconds, minutes, hours, days, months.
const AGE_WINDOWS_MS: [f64; 5] = [
    60_000.0,
    3_600_000.0,
    86_400_000.0,
    2_592_000_000.0,
    7_776_000_000.0,
];

/// Generates a randomized set of listings, at least `per_category` per category.
pub fn generate_listings<R: Rng + ?Sized>(
    rng: &mut R,
    per_category: usize,
    now: DateTime<Utc>,
) -> Vec<Token> {
    let mut tokens = Vec::new();
    for category in TokenCategory::ALL {
        let named: Vec<_> = NAMED_LISTINGS.iter().filter(|(_, _, c)| *c == category).collect();
        let count = named.len().max(per_category);
        for i in 0..count {
            let (name, symbol) = match named.get(i) {
                Some((name, symbol, _)) => (name.to_string(), symbol.to_string()),
                None => (format!("Token {}-{}", category, i), format!("TKN{}", i)),
            };
            let id = format!("{}-{}-{}", category, i, now.timestamp_millis());
            tokens.push(random_token(rng, id, name, symbol, category, now));
        }
    }
    tokens
}

fn random_token<R: Rng + ?Sized>(
    rng: &mut R,
    id: String,
    name: String,
    symbol: String,
    category: TokenCategory,
    now: DateTime<Utc>,
) -> Token {
    let price = rng.gen::<f64>() * 100.0 + 0.01;
    let mut token = Token::new(id, symbol, name, category, price);

    // skewed towards gains
    token.price_change_24h = clamp_percentage((rng.gen::<f64>() - 0.3) * 100.0);
    token.price_change_1h = Some(clamp_percentage((rng.gen::<f64>() - 0.4) * 20.0));
    token.price_change_1d = Some(clamp_percentage((rng.gen::<f64>() - 0.3) * 50.0));
    token.price_change_1w = Some(clamp_percentage((rng.gen::<f64>() - 0.2) * 80.0));
    token.price_change_1m = Some(clamp_percentage((rng.gen::<f64>() - 0.1) * 100.0));
    token.price_change_3m = Some(clamp_percentage((rng.gen::<f64>() - 0.1) * 100.0));

    token.market_cap = price * (rng.gen::<f64>() * 1_000_000.0 + 1000.0);
    token.volume_24h = token.market_cap * (rng.gen::<f64>() * 0.1 + 0.01);
    token.liquidity = token.market_cap * (rng.gen::<f64>() * 0.5 + 0.1);
    token.fee = rng.gen::<f64>() * 0.1;
    token.transactions = rng.gen_range(0..2000);

    let status_roll = rng.gen::<f64>();
    token.status = Some(if status_roll < 0.1 {
        TokenStatus::DeadStop
    } else if status_roll < 0.9 {
        TokenStatus::Active
    } else {
        TokenStatus::Migrated
    });

    let wallet_amount = if rng.gen_bool(0.3) { 0.0 } else { rng.gen_range(1..=10) as f64 };
    token.wallet_amount = Some(wallet_amount);
    token.wallet_status = Some(if wallet_amount == 0.0 {
        WalletStatus::Open
    } else {
        WalletStatus::Active
    });

    let digits: String = (0..43)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();
    token.address = format!("So{}", digits);

    let window = AGE_WINDOWS_MS[rng.gen_range(0..AGE_WINDOWS_MS.len())];
    let age = ChronoDuration::milliseconds((rng.gen::<f64>() * window) as i64);
    token.created_at = now - age;
    token.last_updated = now;
    token
}

/// Local stand-in for a listings API: waits `latency_ms`, then returns fresh
/// randomized listings.
pub struct SimulatedTokenSource {
    per_category: usize,
    latency: Duration,
    rng: Mutex<StdRng>,
}

impl SimulatedTokenSource {
    pub fn new(config: &SourceConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            per_category: config.tokens_per_category,
            latency: config.latency(),
            rng: Mutex::new(rng),
        }
    }
}

#[async_trait]
impl TokenSource for SimulatedTokenSource {
    async fn fetch(&self) -> Result<Vec<Token>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut rng = self.rng.lock().await;
        Ok(generate_listings(&mut *rng, self.per_category, Utc::now()))
    }
}

/// Fetches listings into the store, retrying with exponential backoff
/// (`retry_base_ms`, doubling, capped at `retry_max_ms`, `max_retries` retries).
///
/// The store's loading flag is raised for the duration; a final failure is
/// recorded as the store error so the presentation layer can offer a retry.
pub async fn load_with_retry(
    source: &dyn TokenSource,
    store: &StoreHandle,
    config: &SourceConfig,
) -> Result<usize> {
    store.set_loading(true).await;

    // 2^n * (base / 2) yields base, 2*base, 4*base, ...
    let strategy = ExponentialBackoff::from_millis(2)
        .factor((config.retry_base_ms / 2).max(1))
        .max_delay(Duration::from_millis(config.retry_max_ms))
        .take(config.max_retries);

    let mut attempt = 0usize;
    let result = Retry::spawn(strategy, || {
        attempt += 1;
        let current = attempt;
        async move {
            let fetched = source.fetch().await;
            if let Err(e) = &fetched {
                warn!("Token fetch attempt {} failed: {}", current, e);
            }
            fetched
        }
    })
    .await;

    let outcome = match result {
        Ok(tokens) => {
            let count = tokens.len();
            store.load_tokens(tokens).await;
            info!("Loaded {} tokens after {} attempt(s)", count, attempt);
            Ok(count)
        }
        Err(e) => {
            store.set_error(Some(e.to_string())).await;
            Err(e)
        }
    };
    store.set_loading(false).await;
    outcome
}
