use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long)] // defaults are applied in main.rs when the file is missing
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Stop after this many seconds instead of waiting for ctrl-c
    #[arg(long)]
    pub duration: Option<u64>,

    /// Category to show: all, new-pairs, final-stretch or migrated
    #[arg(long)]
    pub category: Option<String>,

    /// Sort field, e.g. price, priceChange24h, volume24h, liquidity, marketCap, createdAt
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort direction: asc or desc
    #[arg(long)]
    pub direction: Option<String>,
}
