use std::time::Duration;

/// All configuration loaded from environment variables at startup.
/// Every variable has a default; malformed values cause an immediate panic
/// with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Market
    pub symbol: String,
    pub bybit_category: String,

    // Reference index
    pub reference_ticker: String,
    pub reference_fallback_ticker: String,

    // Dashboard
    /// When `None`, mutating and streaming routes are open.
    pub dashboard_token: Option<String>,
    pub dashboard_port: u16,

    // News feed
    pub news_feed_url: String,

    // Refresh & caching
    pub refresh_interval: Duration,
    pub market_cache_ttl: Duration,
    pub reference_cache_ttl: Duration,
    pub news_cache_ttl: Duration,

    // Analysis thresholds file path
    pub analysis_config_path: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        Config {
            symbol: optional_env("SYMBOL").unwrap_or_else(|| "BTCUSDT".to_string()),
            bybit_category: optional_env("BYBIT_CATEGORY").unwrap_or_else(|| "spot".to_string()),
            reference_ticker: optional_env("REFERENCE_TICKER")
                .unwrap_or_else(|| "DX-Y.NYB".to_string()),
            reference_fallback_ticker: optional_env("REFERENCE_FALLBACK_TICKER")
                .unwrap_or_else(|| "DX=F".to_string()),
            dashboard_token: optional_env("DASHBOARD_TOKEN").filter(|t| !t.trim().is_empty()),
            dashboard_port: parsed_env("DASHBOARD_PORT").unwrap_or(8080),
            news_feed_url: optional_env("NEWS_FEED_URL")
                .unwrap_or_else(|| "https://finance.yahoo.com/rss/headline?s=BTC-USD".to_string()),
            refresh_interval: positive_secs("REFRESH_INTERVAL_SECS", 60),
            market_cache_ttl: Duration::from_secs(
                parsed_env("MARKET_CACHE_TTL_SECS").unwrap_or(60),
            ),
            reference_cache_ttl: Duration::from_secs(
                parsed_env("REFERENCE_CACHE_TTL_SECS").unwrap_or(300),
            ),
            news_cache_ttl: Duration::from_secs(parsed_env("NEWS_CACHE_TTL_SECS").unwrap_or(600)),
            analysis_config_path: optional_env("ANALYSIS_CONFIG_PATH")
                .unwrap_or_else(|| "config/analysis.toml".to_string()),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parsed_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    optional_env(key).map(|raw| {
        raw.trim().parse().unwrap_or_else(|_| {
            panic!("Environment variable '{key}' has an invalid value: '{raw}'")
        })
    })
}

/// A duration in whole seconds that must be at least one.
fn positive_secs(key: &str, default: u64) -> Duration {
    match parsed_env::<u64>(key).unwrap_or(default) {
        0 => panic!("Environment variable '{key}' must be at least 1 second"),
        secs => Duration::from_secs(secs),
    }
}
