use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use common::{Error, PriceBar, PriceSeries, ReferenceIndexProvider, Result, Timeframe};

const BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Daily history of a reference index from Yahoo's chart API.
///
/// When the primary ticker returns no usable rows (or fails) the fallback
/// ticker is tried; DX-Y.NYB falls back to the DX=F future.
pub struct YahooClient {
    ticker: String,
    fallback_ticker: Option<String>,
    base_url: String,
    http: Client,
}

impl YahooClient {
    pub fn new(ticker: impl Into<String>, fallback_ticker: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .user_agent(concat!("signaldesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            ticker: ticker.into(),
            fallback_ticker,
            base_url: BASE_URL.to_string(),
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_ticker(&self, ticker: &str) -> Result<PriceSeries> {
        let url = format!("{}/v8/finance/chart/{ticker}?range=1mo&interval=1d", self.base_url);
        debug!(ticker, "Fetching reference index history");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Exchange(format!("HTTP {status}: {body}")));
        }
        parse_chart(ticker, &body)
    }
}

#[async_trait]
impl ReferenceIndexProvider for YahooClient {
    fn ticker(&self) -> &str {
        &self.ticker
    }

    async fn fetch(&self) -> Result<PriceSeries> {
        let primary = self.fetch_ticker(&self.ticker).await;
        let Some(fallback) = self.fallback_ticker.as_deref() else {
            return primary;
        };

        match primary {
            Ok(series) if !series.is_empty() => Ok(series),
            Ok(_) => {
                warn!(
                    ticker = %self.ticker,
                    fallback,
                    "Reference index returned no rows, trying fallback"
                );
                self.fetch_ticker(fallback).await
            }
            Err(e) => {
                warn!(
                    ticker = %self.ticker,
                    fallback,
                    error = %e,
                    "Reference index fetch failed, trying fallback"
                );
                self.fetch_ticker(fallback).await
            }
        }
    }
}

/// Parse a chart response into a daily series, skipping rows with any
/// missing price. Missing volume counts as zero. A row repeating the previous
/// timestamp replaces it; an older row is dropped.
pub fn parse_chart(ticker: &str, body: &str) -> Result<PriceSeries> {
    let resp: ChartResponse = serde_json::from_str(body)?;
    if let Some(err) = resp.chart.error {
        return Err(Error::Exchange(format!("Yahoo chart error: {err}")));
    }

    let Some(result) = resp.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(PriceSeries::empty(ticker, Timeframe::D1));
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(PriceSeries::empty(ticker, Timeframe::D1));
    };

    let mut bars: Vec<PriceBar> = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let field = |col: &[Option<f64>]| col.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
        ) else {
            continue;
        };
        let Some(timestamp) = Utc.timestamp_opt(ts, 0).single() else {
            continue;
        };
        let bar = PriceBar {
            timestamp,
            open,
            high,
            low,
            close,
            volume: field(&quote.volume).unwrap_or(0.0),
        };
        match bars.last().map(|b| b.timestamp) {
            Some(last) if last > timestamp => continue,
            // intraday updates repeat the live session's timestamp; keep the newest
            Some(last) if last == timestamp => {
                bars.pop();
            }
            _ => {}
        }
        bars.push(bar);
    }

    Ok(PriceSeries::new(ticker, Timeframe::D1, bars))
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}
