use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs;
use std::time::Duration;
use crate::error::{Error, Result};
use crate::models::{CategoryFilter, SortConfig, SortDirection, SortField};

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub source: SourceConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

/// Timing and jitter bounds of the simulated price feed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FeedConfig {
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    pub min_batch: usize,
    pub max_batch: usize,
    /// Largest relative price move per event (0.03 = ±3%).
    pub max_price_move: f64,
    /// Largest move of the 24h change per event, in percentage points.
    pub max_change_move: f64,
    pub max_change_1h_move: f64,
    pub price_floor: f64,
    pub seed: Option<u64>,
    pub emit_on_start: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 500,
            max_interval_ms: 1000,
            min_batch: 2,
            max_batch: 3,
            max_price_move: 0.03,
            max_change_move: 0.75,
            max_change_1h_move: 0.25,
            price_floor: 0.000001,
            seed: None,
            emit_on_start: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub tokens_per_category: usize,
    pub latency_ms: u64,
    pub max_retries: usize,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
    /// Reload the listings this often; 0 disables refreshing.
    pub refresh_interval_secs: u64,
    pub seed: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            tokens_per_category: 8,
            latency_ms: 1000,
            max_retries: 3,
            retry_base_ms: 1000,
            retry_max_ms: 30_000,
            refresh_interval_secs: 60,
            seed: None,
        }
    }
}

impl SourceConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub category: CategoryFilter,
    pub sort_field: Option<String>,
    pub sort_direction: SortDirection,
    pub refresh_ms: u64,
    pub max_rows: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            category: CategoryFilter::All,
            sort_field: None,
            sort_direction: SortDirection::Desc,
            refresh_ms: 1000,
            max_rows: 12,
        }
    }
}

impl DisplayConfig {
    /// Unknown field names degrade to an unsorted view.
    pub fn sort_config(&self) -> SortConfig {
        SortConfig::parse(self.sort_field.as_deref(), self.sort_direction)
    }

    pub fn set_sort(&mut self, field: Option<SortField>, direction: SortDirection) {
        self.sort_field = field.map(|f| f.to_string());
        self.sort_direction = direction;
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        fs::write(path, config_str)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let feed = &self.feed;
        if feed.min_interval_ms == 0 || feed.min_interval_ms > feed.max_interval_ms {
            return Err(Error::ConfigError(format!(
                "feed interval must satisfy 0 < min <= max, got {}..{}",
                feed.min_interval_ms, feed.max_interval_ms
            )));
        }
        if feed.min_batch == 0 || feed.min_batch > feed.max_batch {
            return Err(Error::ConfigError(format!(
                "feed batch must satisfy 0 < min <= max, got {}..={}",
                feed.min_batch, feed.max_batch
            )));
        }
        for (name, value) in [
            ("max_price_move", feed.max_price_move),
            ("max_change_move", feed.max_change_move),
            ("max_change_1h_move", feed.max_change_1h_move),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::ConfigError(format!("{} must be a non-negative number", name)));
            }
        }
        if feed.max_price_move >= 1.0 {
            return Err(Error::ConfigError("max_price_move must be below 1.0".to_string()));
        }
        if !(feed.price_floor.is_finite() && feed.price_floor > 0.0) {
            return Err(Error::ConfigError("price_floor must be positive".to_string()));
        }
        if self.source.retry_base_ms > self.source.retry_max_ms {
            return Err(Error::ConfigError("retry_base_ms cannot exceed retry_max_ms".to_string()));
        }
        if self.display.refresh_ms == 0 {
            return Err(Error::ConfigError("display refresh_ms must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenCategory;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.feed.min_interval_ms, 500);
        assert_eq!(config.feed.max_batch, 3);
        assert_eq!(config.display.sort_config(), SortConfig::unsorted());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [feed]
            seed = 7

            [display]
            category = "migrated"
            sort_field = "marketCap"
            sort_direction = "asc"
            "#,
        )
        .unwrap();
        assert_eq!(config.feed.seed, Some(7));
        assert_eq!(config.feed.max_interval_ms, 1000);
        assert_eq!(config.display.category, CategoryFilter::Only(TokenCategory::Migrated));
        assert_eq!(
            config.display.sort_config(),
            SortConfig::new(SortField::MarketCap, SortDirection::Asc)
        );
        assert_eq!(config.source, SourceConfig::default());
    }

    #[test]
    fn test_invalid_bounds_are_rejected() {
        let mut config = Config::default();
        config.feed.min_interval_ms = 2000;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        let mut config = Config::default();
        config.feed.min_batch = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.feed.price_floor = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.feed.max_change_move = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("token-pulse-config-{}.toml", std::process::id()));
        let mut config = Config::default();
        config.feed.seed = Some(42);
        config.display.set_sort(Some(SortField::Liquidity), SortDirection::Asc);

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_refresh_interval_zero_disables() {
        let mut source = SourceConfig::default();
        assert_eq!(source.refresh_interval(), Some(Duration::from_secs(60)));
        source.refresh_interval_secs = 0;
        assert_eq!(source.refresh_interval(), None);
    }
}
