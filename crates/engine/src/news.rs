use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use vader_sentiment::SentimentIntensityAnalyzer;

use common::{Error, NewsItem, NewsSentiment, Result, SentimentLabel, SentimentProvider};

/// Headlines scored per fetch.
pub const DEFAULT_MAX_ITEMS: usize = 10;

/// BTC headlines from an RSS 2.0 feed, each title scored with VADER.
pub struct YahooNewsClient {
    feed_url: String,
    max_items: usize,
    http: Client,
}

impl YahooNewsClient {
    pub fn new(feed_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .user_agent(concat!("signaldesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            feed_url: feed_url.into(),
            max_items: DEFAULT_MAX_ITEMS,
            http,
        })
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }
}

#[async_trait]
impl SentimentProvider for YahooNewsClient {
    async fn fetch(&self) -> Result<NewsSentiment> {
        debug!(url = %self.feed_url, "Fetching news feed");
        let resp = self
            .http
            .get(&self.feed_url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Exchange(format!("HTTP {status}: {body}")));
        }
        parse_feed(&body, self.max_items)
    }
}

/// Parse an RSS document and score its first `max_items` headlines.
pub fn parse_feed(body: &str, max_items: usize) -> Result<NewsSentiment> {
    let rss: Rss = quick_xml::de::from_str(body)
        .map_err(|e| Error::Exchange(format!("unparseable news feed: {e}")))?;

    let analyzer = SentimentIntensityAnalyzer::new();
    let items = rss
        .channel
        .items
        .into_iter()
        .take(max_items)
        .map(|item| {
            let score = analyzer
                .polarity_scores(&item.title)
                .get("compound")
                .copied()
                .unwrap_or(0.0);
            NewsItem {
                published_at: item.pub_date.as_deref().and_then(parse_pub_date),
                sentiment: SentimentLabel::from_score(score),
                score,
                title: item.title,
                link: item.link,
            }
        })
        .collect();

    Ok(NewsSentiment::from_items(items))
}

fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ─── Feed types ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Deserialize)]
struct RssItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}
