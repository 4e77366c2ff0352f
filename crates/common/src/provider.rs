use async_trait::async_trait;

use crate::{NewsSentiment, PriceSeries, Result, Timeframe};

/// Source of candle history for the traded symbol.
///
/// `BybitClient` implements this against the public kline endpoint; tests
/// substitute in-memory fakes. The analysis core never calls a provider: the
/// engine resolves every fetch into a `PriceSeries` snapshot first, turning
/// failures into an empty series.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch up to `limit` of the most recent candles, oldest first.
    async fn fetch(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<PriceSeries>;
}

/// Source of the reference index (a currency-strength index such as DXY)
/// used by the cross-asset correlation check.
#[async_trait]
pub trait ReferenceIndexProvider: Send + Sync {
    /// Ticker the provider resolves, used as the cache key.
    fn ticker(&self) -> &str;

    /// Fetch recent daily history of the reference index, oldest first.
    async fn fetch(&self) -> Result<PriceSeries>;
}

/// Source of scored news headlines for the dashboard.
#[async_trait]
pub trait SentimentProvider: Send + Sync {
    async fn fetch(&self) -> Result<NewsSentiment>;
}
