#![allow(dead_code)]
use chrono::{DateTime, TimeZone, Utc};
use token_pulse::models::{Token, TokenCategory};

pub fn ts(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

// Helper to create a token created at the epoch
pub fn create_test_token(id: &str, category: TokenCategory, price: f64) -> Token {
    let mut token = Token::new(id, id.to_uppercase(), format!("{} Token", id), category, price);
    token.created_at = ts(0);
    token.last_updated = ts(0);
    token
}

// Helper to create a small listing: `per_category` tokens in each category with
// prices descending by insertion order
pub fn create_test_listing(per_category: usize) -> Vec<Token> {
    let mut tokens = Vec::new();
    for (c, category) in TokenCategory::ALL.into_iter().enumerate() {
        for i in 0..per_category {
            let price = 100.0 - (c * per_category + i) as f64;
            let mut token = create_test_token(&format!("{}-{}", category, i), category, price);
            token.volume_24h = ((i * 37 + c * 11) % 17) as f64 * 10.0;
            token.price_change_24h = (i as f64 * 7.5) - 20.0;
            token.price_change_1h = Some(0.0);
            tokens.push(token);
        }
    }
    tokens
}
