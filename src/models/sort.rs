use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use log::warn;
use crate::error::{Error, Result};
use super::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Price,
    PriceChange24h,
    Volume24h,
    Liquidity,
    MarketCap,
    CreatedAt,
    Symbol,
    Name,
}

/// A comparable view of one token field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortValue<'a> {
    Number(f64),
    Text(&'a str),
}

impl SortValue<'_> {
    /// Numbers compare numerically and text lexicographically. Mixed kinds and
    /// NaN compare equal so the stable sort keeps their source order.
    pub fn compare(&self, other: &SortValue<'_>) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Price => "price",
            SortField::PriceChange24h => "priceChange24h",
            SortField::Volume24h => "volume24h",
            SortField::Liquidity => "liquidity",
            SortField::MarketCap => "marketCap",
            SortField::CreatedAt => "createdAt",
            SortField::Symbol => "symbol",
            SortField::Name => "name",
        }
    }

    pub fn value<'a>(&self, token: &'a Token) -> SortValue<'a> {
        match self {
            SortField::Price => SortValue::Number(token.price),
            SortField::PriceChange24h => SortValue::Number(token.price_change_24h),
            SortField::Volume24h => SortValue::Number(token.volume_24h),
            SortField::Liquidity => SortValue::Number(token.liquidity),
            SortField::MarketCap => SortValue::Number(token.market_cap),
            SortField::CreatedAt => SortValue::Number(token.created_at.timestamp_millis() as f64),
            SortField::Symbol => SortValue::Text(&token.symbol),
            SortField::Name => SortValue::Text(&token.name),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "price" => Ok(SortField::Price),
            "priceChange24h" | "price_change_24h" => Ok(SortField::PriceChange24h),
            "volume24h" | "volume_24h" => Ok(SortField::Volume24h),
            "liquidity" => Ok(SortField::Liquidity),
            "marketCap" | "market_cap" => Ok(SortField::MarketCap),
            "createdAt" | "created_at" => Ok(SortField::CreatedAt),
            "symbol" => Ok(SortField::Symbol),
            "name" => Ok(SortField::Name),
            other => Err(Error::InvalidInput(format!("unknown sort field: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc", alias = "ascending")]
    Asc,
    #[default]
    #[serde(rename = "desc", alias = "descending")]
    Desc,
}

impl SortDirection {
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(Error::InvalidInput(format!("unknown sort direction: {}", other))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSortConfig {
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    direction: SortDirection,
}

/// Sort field plus direction. `field: None` keeps the filtered order untouched.
///
/// Deserializing an unknown field name falls back to no sort instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawSortConfig")]
pub struct SortConfig {
    pub field: Option<SortField>,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field: Some(field), direction }
    }

    pub fn unsorted() -> Self {
        Self::default()
    }

    /// Builds a config from loosely typed input, e.g. CLI flags or a column header id.
    pub fn parse(field: Option<&str>, direction: SortDirection) -> Self {
        let field = match field {
            None | Some("") | Some("none") => None,
            Some(name) => match name.parse::<SortField>() {
                Ok(field) => Some(field),
                Err(e) => {
                    warn!("{}; falling back to unsorted view", e);
                    None
                }
            },
        };
        Self { field, direction }
    }
}

impl From<RawSortConfig> for SortConfig {
    fn from(raw: RawSortConfig) -> Self {
        SortConfig::parse(raw.field.as_deref(), raw.direction)
    }
}
