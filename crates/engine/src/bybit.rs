use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use common::{Error, MarketDataProvider, PriceBar, PriceSeries, Result, Timeframe};

const BASE_URL: &str = "https://api.bybit.com";

/// Bybit caps one kline page at 1000 rows.
pub const MAX_KLINE_LIMIT: usize = 1000;

/// Public market-data client for Bybit's v5 kline endpoint. No credentials
/// are needed; only candle history is read.
pub struct BybitClient {
    category: String,
    base_url: String,
    http: Client,
}

impl BybitClient {
    pub fn new(category: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            category: category.into(),
            base_url: BASE_URL.to_string(),
            http,
        })
    }

    /// Point the client at another host (testnet, a local mock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get(&self, path: &str, query: &str) -> Result<String> {
        let url = format!("{}{path}?{query}", self.base_url);
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
        Ok(body)
    }
}

/// Bybit's name for a candle interval.
pub fn interval(timeframe: Timeframe) -> &'static str {
    match timeframe {
        Timeframe::M1 => "1",
        Timeframe::M5 => "5",
        Timeframe::M15 => "15",
        Timeframe::M30 => "30",
        Timeframe::H1 => "60",
        Timeframe::H4 => "240",
        Timeframe::D1 => "D",
        Timeframe::W1 => "W",
    }
}

#[async_trait]
impl MarketDataProvider for BybitClient {
    async fn fetch(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<PriceSeries> {
        let limit = limit.clamp(1, MAX_KLINE_LIMIT);
        let query = format!(
            "category={}&symbol={}&interval={}&limit={}",
            self.category,
            symbol,
            interval(timeframe),
            limit
        );

        debug!(symbol, timeframe = %timeframe, limit, "Fetching klines from Bybit");
        let body = self.get("/v5/market/kline", &query).await?;
        parse_klines(symbol, timeframe, &body)
    }
}

/// Parse a kline response into an oldest-first series.
pub fn parse_klines(symbol: &str, timeframe: Timeframe, body: &str) -> Result<PriceSeries> {
    let resp: KlineResponse = serde_json::from_str(body)?;
    if resp.ret_code != 0 {
        return Err(Error::Exchange(format!(
            "Bybit retCode {}: {}",
            resp.ret_code, resp.ret_msg
        )));
    }

    let mut bars = resp
        .result
        .map(|r| r.list)
        .unwrap_or_default()
        .iter()
        .map(|row| parse_row(row))
        .collect::<Result<Vec<_>>>()?;
    // Bybit lists newest first
    bars.reverse();

    Ok(PriceSeries::new(symbol, timeframe, bars))
}

fn parse_row(row: &[String]) -> Result<PriceBar> {
    let [start, open, high, low, close, volume, ..] = row else {
        return Err(Error::Exchange(format!("short kline row: {row:?}")));
    };
    let start_ms: i64 = parse_field(start)?;
    let timestamp = Utc
        .timestamp_millis_opt(start_ms)
        .single()
        .ok_or_else(|| Error::Exchange(format!("kline start out of range: {start_ms}")))?;

    Ok(PriceBar {
        timestamp,
        open: parse_field(open)?,
        high: parse_field(high)?,
        low: parse_field(low)?,
        close: parse_field(close)?,
        volume: parse_field(volume)?,
    })
}

fn parse_field<T: std::str::FromStr>(raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::Exchange(format!("unparseable kline field '{raw}'")))
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KlineResponse {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    result: Option<KlineResult>,
}

#[derive(Deserialize)]
struct KlineResult {
    #[serde(default)]
    list: Vec<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "retCode": 0,
        "retMsg": "OK",
        "result": {
            "category": "spot",
            "symbol": "BTCUSDT",
            "list": [
                ["1700007200000", "102", "104", "101", "103", "12.5", "1287.5"],
                ["1700003600000", "101", "103", "100", "102", "10", "1020"],
                ["1700000000000", "100", "102", "99", "101", "8", "808"]
            ]
        },
        "time": 1700007260000
    }"#;

    #[test]
    fn rows_are_reversed_to_oldest_first() {
        let series = parse_klines("BTCUSDT", Timeframe::H1, BODY).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![101.0, 102.0, 103.0]);
        assert_eq!(series.bars()[0].timestamp.timestamp(), 1_700_000_000);
        assert_eq!(series.last().unwrap().volume, 12.5);
        assert_eq!(series.timeframe(), Timeframe::H1);
    }

    #[test]
    fn error_code_maps_to_exchange_error() {
        let body = r#"{"retCode": 10001, "retMsg": "params error: symbol invalid", "result": {}}"#;
        let err = parse_klines("NOPE", Timeframe::H1, body).unwrap_err();
        assert!(matches!(err, Error::Exchange(msg) if msg.contains("10001")));
    }

    #[test]
    fn malformed_rows_are_rejected() {
        let body = r#"{"retCode": 0, "retMsg": "OK", "result": {"list": [
            ["1700000000000", "abc", "1", "1", "1", "1", "1"]
        ]}}"#;
        assert!(parse_klines("BTCUSDT", Timeframe::H1, body).is_err());

        let short =
            r#"{"retCode": 0, "retMsg": "OK", "result": {"list": [["1700000000000", "1"]]}}"#;
        assert!(parse_klines("BTCUSDT", Timeframe::H1, short).is_err());
    }

    #[test]
    fn empty_list_is_an_empty_series() {
        let body = r#"{"retCode": 0, "retMsg": "OK", "result": {"list": []}}"#;
        assert!(parse_klines("BTCUSDT", Timeframe::D1, body).unwrap().is_empty());
    }

    #[test]
    fn interval_mapping() {
        assert_eq!(interval(Timeframe::M15), "15");
        assert_eq!(interval(Timeframe::H1), "60");
        assert_eq!(interval(Timeframe::H4), "240");
        assert_eq!(interval(Timeframe::D1), "D");
    }
}
