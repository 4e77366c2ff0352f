use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use common::{
    MarketDataProvider, NewsSentiment, PriceSeries, ReferenceIndexProvider, Result,
    SentimentProvider, Timeframe,
};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Key/value store whose entries expire a fixed `ttl` after insertion.
///
/// The clock is always passed in by the caller, never read here.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, CacheEntry<V>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: HashMap::new() }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached value, unless it has expired at `now`.
    pub fn get(&self, key: &K, now: Instant) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    pub fn insert(&mut self, key: K, value: V, now: Instant) {
        let expires_at = now + self.ttl;
        self.entries.insert(key, CacheEntry { value, expires_at });
    }

    /// Drop every entry expired at `now`; returns how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type MarketKey = (String, Timeframe, usize);

/// `MarketDataProvider` decorator caching successful fetches per
/// `(symbol, timeframe, limit)`. Failures are never cached.
pub struct CachedMarketData {
    inner: Arc<dyn MarketDataProvider>,
    cache: Mutex<TtlCache<MarketKey, PriceSeries>>,
}

impl CachedMarketData {
    pub fn new(inner: Arc<dyn MarketDataProvider>, ttl: Duration) -> Self {
        Self { inner, cache: Mutex::new(TtlCache::new(ttl)) }
    }
}

#[async_trait]
impl MarketDataProvider for CachedMarketData {
    async fn fetch(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<PriceSeries> {
        let key = (symbol.to_string(), timeframe, limit);
        {
            let mut cache = self.cache.lock().await;
            let now = Instant::now();
            cache.purge_expired(now);
            if let Some(series) = cache.get(&key, now) {
                debug!(symbol, timeframe = %timeframe, "Market data cache hit");
                return Ok(series);
            }
        }

        let series = self.inner.fetch(symbol, timeframe, limit).await?;
        self.cache.lock().await.insert(key, series.clone(), Instant::now());
        Ok(series)
    }
}

/// `ReferenceIndexProvider` decorator caching the latest successful fetch.
pub struct CachedReference {
    inner: Arc<dyn ReferenceIndexProvider>,
    cache: Mutex<TtlCache<String, PriceSeries>>,
}

impl CachedReference {
    pub fn new(inner: Arc<dyn ReferenceIndexProvider>, ttl: Duration) -> Self {
        Self { inner, cache: Mutex::new(TtlCache::new(ttl)) }
    }
}

#[async_trait]
impl ReferenceIndexProvider for CachedReference {
    fn ticker(&self) -> &str {
        self.inner.ticker()
    }

    async fn fetch(&self) -> Result<PriceSeries> {
        let key = self.inner.ticker().to_string();
        if let Some(series) = self.cache.lock().await.get(&key, Instant::now()) {
            debug!(ticker = %key, "Reference cache hit");
            return Ok(series);
        }

        let series = self.inner.fetch().await?;
        self.cache.lock().await.insert(key, series.clone(), Instant::now());
        Ok(series)
    }
}

/// `SentimentProvider` decorator holding the last successful feed.
pub struct CachedSentiment {
    inner: Arc<dyn SentimentProvider>,
    cache: Mutex<TtlCache<(), NewsSentiment>>,
}

impl CachedSentiment {
    pub fn new(inner: Arc<dyn SentimentProvider>, ttl: Duration) -> Self {
        Self { inner, cache: Mutex::new(TtlCache::new(ttl)) }
    }
}

#[async_trait]
impl SentimentProvider for CachedSentiment {
    async fn fetch(&self) -> Result<NewsSentiment> {
        if let Some(news) = self.cache.lock().await.get(&(), Instant::now()) {
            debug!("News cache hit");
            return Ok(news);
        }

        let news = self.inner.fetch().await?;
        self.cache.lock().await.insert((), news.clone(), Instant::now());
        Ok(news)
    }
}
