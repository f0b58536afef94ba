#![cfg(test)]
use chrono::{DateTime, TimeZone, Utc};
use crate::models::{Token, TokenCategory};

/// Millisecond timestamp helper.
pub fn ts(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

// Helper to create a token created at the epoch, with symbol = uppercased id
pub fn create_test_token(id: &str, category: TokenCategory, price: f64) -> Token {
    let mut token = Token::new(id, id.to_uppercase(), format!("{} Token", id), category, price);
    token.created_at = ts(0);
    token.last_updated = ts(0);
    token.market_cap = price * 1_000.0;
    token.address = format!("So{:0>43}", id.len());
    token
}

// Two tokens per category with distinct prices, volumes and liquidity
pub fn create_test_tokens() -> Vec<Token> {
    let specs = [
        ("np-1", TokenCategory::NewPairs, 1.5, 300.0, 12.0),
        ("np-2", TokenCategory::NewPairs, 0.25, 900.0, -4.0),
        ("fs-1", TokenCategory::FinalStretch, 42.0, 150.0, 33.0),
        ("fs-2", TokenCategory::FinalStretch, 7.0, 600.0, -15.5),
        ("mg-1", TokenCategory::Migrated, 120.0, 50.0, 2.5),
        ("mg-2", TokenCategory::Migrated, 3.0, 1200.0, 0.0),
    ];
    specs
        .iter()
        .map(|&(id, category, price, volume, change)| {
            let mut token = create_test_token(id, category, price);
            token.volume_24h = volume;
            token.liquidity = volume * 2.0;
            token.price_change_24h = change;
            token
        })
        .collect()
}
