use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Polarity above this is positive, below its negation negative.
pub const SENTIMENT_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Classify a polarity score in `[-1, 1]`. `NaN` is neutral.
    pub fn from_score(score: f64) -> Self {
        if score > SENTIMENT_THRESHOLD {
            SentimentLabel::Positive
        } else if score < -SENTIMENT_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Negative => "Negative",
        };
        f.write_str(s)
    }
}

/// One scored headline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    /// `None` when the feed date is missing or unparseable.
    pub published_at: Option<DateTime<Utc>>,
    pub score: f64,
    pub sentiment: SentimentLabel,
}

/// Headline feed with its overall mood. Shown next to the signal, never
/// fed into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSentiment {
    pub label: SentimentLabel,
    /// Mean of the item scores, 0 with no items.
    pub score: f64,
    pub items: Vec<NewsItem>,
}

impl NewsSentiment {
    /// Empty feed, used when news could not be fetched.
    pub fn neutral() -> Self {
        Self { label: SentimentLabel::Neutral, score: 0.0, items: Vec::new() }
    }

    pub fn from_items(items: Vec<NewsItem>) -> Self {
        if items.is_empty() {
            return Self::neutral();
        }
        let score = items.iter().map(|i| i.score).sum::<f64>() / items.len() as f64;
        Self { label: SentimentLabel::from_score(score), score, items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(score: f64) -> NewsItem {
        NewsItem {
            title: format!("headline {score}"),
            link: "https://example.com".into(),
            published_at: None,
            score,
            sentiment: SentimentLabel::from_score(score),
        }
    }

    #[test]
    fn label_thresholds_are_strict() {
        assert_eq!(SentimentLabel::from_score(0.5), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(0.1), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(-0.1), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(-0.3), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_score(f64::NAN), SentimentLabel::Neutral);
    }

    #[test]
    fn overall_score_is_the_mean() {
        let news = NewsSentiment::from_items(vec![item(0.6), item(0.2), item(-0.2)]);
        assert!((news.score - 0.2).abs() < 1e-12);
        assert_eq!(news.label, SentimentLabel::Positive);
        assert_eq!(news.items.len(), 3);

        let mixed = NewsSentiment::from_items(vec![item(0.6), item(-0.6)]);
        assert_eq!(mixed.label, SentimentLabel::Neutral);
    }

    #[test]
    fn no_items_is_neutral() {
        assert_eq!(NewsSentiment::from_items(Vec::new()), NewsSentiment::neutral());
    }
}
