pub mod config;
pub mod error;
pub mod news;
pub mod provider;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use news::{NewsItem, NewsSentiment, SentimentLabel};
pub use provider::{MarketDataProvider, ReferenceIndexProvider, SentimentProvider};
pub use types::*;
