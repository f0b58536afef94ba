pub mod token;
pub mod sort;

pub use token::{
    clamp_percentage, CategoryFilter, PriceUpdate, Token, TokenCategory, TokenStatus, WalletStatus,
    MAX_PERCENTAGE, MIN_PERCENTAGE,
};
pub use sort::{SortConfig, SortDirection, SortField, SortValue};
