pub mod cli;
pub mod config;
pub mod error;
pub mod feed;
pub mod format;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod projector;
pub mod registry;
pub mod source;
pub mod store;

pub use error::{Error, Result};
pub use feed::PriceFeedSimulator;
pub use store::{StoreAction, StoreHandle, TokenStore};

// Declare tests module only when testing
#[cfg(test)]
pub mod tests;
