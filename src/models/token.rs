use serde::{Deserialize, Serialize};
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use crate::error::{Error, Result};

pub const MIN_PERCENTAGE: f64 = -99.0;
pub const MAX_PERCENTAGE: f64 = 99.0;

static LAST_CREATED_MS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Clamps a percentage change into `[-99, 99]`. NaN collapses to zero.
pub fn clamp_percentage(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(MIN_PERCENTAGE, MAX_PERCENTAGE)
}

fn non_negative(value: f64) -> f64 {
    if value.is_nan() || value < 0.0 {
        0.0
    } else {
        value
    }
}

/// Hands out creation timestamps that never go backwards, even if the wall clock does.
fn next_creation_time() -> DateTime<Utc> {
    let now = Utc::now().timestamp_millis();
    let previous = LAST_CREATED_MS.fetch_max(now, Ordering::SeqCst);
    Utc.timestamp_millis_opt(previous.max(now))
        .single()
        .unwrap_or_else(Utc::now)
}

/// Unix milliseconds on the wire. Fractional input, as produced by
/// `Date.now() - Math.random() * window`, is truncated.
mod millis_timestamp {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(value.timestamp_millis())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = f64::deserialize(deserializer)?;
        if !millis.is_finite() {
            return Err(de::Error::custom("timestamp must be a finite number"));
        }
        Utc.timestamp_millis_opt(millis.trunc() as i64)
            .single()
            .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {}", millis)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenCategory {
    NewPairs,
    FinalStretch,
    Migrated,
}

impl TokenCategory {
    pub const ALL: [TokenCategory; 3] = [
        TokenCategory::NewPairs,
        TokenCategory::FinalStretch,
        TokenCategory::Migrated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenCategory::NewPairs => "new-pairs",
            TokenCategory::FinalStretch => "final-stretch",
            TokenCategory::Migrated => "migrated",
        }
    }
}

impl fmt::Display for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "new-pairs" => Ok(TokenCategory::NewPairs),
            "final-stretch" => Ok(TokenCategory::FinalStretch),
            "migrated" => Ok(TokenCategory::Migrated),
            other => Err(Error::InvalidInput(format!("unknown category: {}", other))),
        }
    }
}

/// Category selection for the projected view: every token, or one lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CategoryFilter {
    #[default]
    All,
    Only(TokenCategory),
}

impl CategoryFilter {
    pub fn matches(&self, token: &Token) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => token.category == *category,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Only(category) => category.fmt(f),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "all" {
            return Ok(CategoryFilter::All);
        }
        s.parse().map(CategoryFilter::Only)
    }
}

impl TryFrom<String> for CategoryFilter {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CategoryFilter> for String {
    fn from(filter: CategoryFilter) -> Self {
        filter.to_string()
    }
}

impl From<TokenCategory> for CategoryFilter {
    fn from(category: TokenCategory) -> Self {
        CategoryFilter::Only(category)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenStatus {
    Active,
    DeadStop,
    Migrated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WalletStatus {
    Active,
    Open,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub price_change_24h: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_change_1h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_change_1d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_change_1w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_change_1m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_change_3m: Option<f64>,
    pub volume_24h: f64,
    pub liquidity: f64,
    pub market_cap: f64,
    pub fee: f64,
    pub transactions: u64,
    pub category: TokenCategory,
    pub chain: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(with = "millis_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "millis_timestamp")]
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TokenStatus>,
    #[serde(default, rename = "solAmount", skip_serializing_if = "Option::is_none")]
    pub wallet_amount: Option<f64>,
    #[serde(default, rename = "solStatus", skip_serializing_if = "Option::is_none")]
    pub wallet_status: Option<WalletStatus>,
}

impl Token {
    /// Creates a token with zeroed market metrics and a fresh creation timestamp.
    pub fn new(
        id: impl Into<String>,
        symbol: impl Into<String>,
        name: impl Into<String>,
        category: TokenCategory,
        price: f64,
    ) -> Self {
        let created_at = next_creation_time();
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
            price: non_negative(price),
            price_change_24h: 0.0,
            price_change_1h: None,
            price_change_1d: None,
            price_change_1w: None,
            price_change_1m: None,
            price_change_3m: None,
            volume_24h: 0.0,
            liquidity: 0.0,
            market_cap: 0.0,
            fee: 0.0,
            transactions: 0,
            category,
            chain: "sol".to_string(),
            address: String::new(),
            image_url: None,
            created_at,
            last_updated: created_at,
            status: None,
            wallet_amount: None,
            wallet_status: None,
        }
    }

    /// Restores the model invariants: non-negative metrics, percentages inside
    /// `[-99, 99]` and `last_updated >= created_at`.
    pub fn normalize(&mut self) {
        self.price = non_negative(self.price);
        self.price_change_24h = clamp_percentage(self.price_change_24h);
        for change in [
            &mut self.price_change_1h,
            &mut self.price_change_1d,
            &mut self.price_change_1w,
            &mut self.price_change_1m,
            &mut self.price_change_3m,
        ] {
            if let Some(value) = change.as_mut() {
                *value = clamp_percentage(*value);
            }
        }
        self.volume_24h = non_negative(self.volume_24h);
        self.liquidity = non_negative(self.liquidity);
        self.market_cap = non_negative(self.market_cap);
        self.fee = non_negative(self.fee);
        self.wallet_amount = self.wallet_amount.map(non_negative);
        if self.last_updated < self.created_at {
            self.last_updated = self.created_at;
        }
    }

    /// Applies a price tick. The 1h change only moves when it is already tracked.
    pub fn apply_price_update(&mut self, update: &PriceUpdate) {
        self.price = non_negative(update.price);
        self.price_change_24h = clamp_percentage(update.price_change_24h);
        if let Some(change_1h) = self.price_change_1h.as_mut() {
            *change_1h = clamp_percentage(*change_1h + update.change_1h_jitter);
        }
        self.last_updated = update.timestamp.max(self.created_at);
    }
}

/// One simulated price tick for a single token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate {
    pub token_id: String,
    pub price: f64,
    pub price_change_24h: f64,
    #[serde(with = "millis_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Independent perturbation for the 1h change, drawn when the tick is generated.
    #[serde(default)]
    pub change_1h_jitter: f64,
}

impl PriceUpdate {
    pub fn new(
        token_id: impl Into<String>,
        price: f64,
        price_change_24h: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            token_id: token_id.into(),
            price,
            price_change_24h,
            timestamp,
            change_1h_jitter: 0.0,
        }
    }
}
