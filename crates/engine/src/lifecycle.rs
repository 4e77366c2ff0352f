use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use common::{
    MarketDataProvider, NewsSentiment, PriceSeries, ReferenceIndexProvider, SentimentProvider,
    Timeframe, TimeframeSet,
};
use strategy::AnalysisConfig;

use crate::snapshot::{build_snapshot, DashboardSnapshot, SnapshotInputs};

/// Shortest refresh period; `tokio::time::interval` panics on zero.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Commands accepted by the running engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    /// Refresh now instead of waiting for the next tick.
    Refresh,
}

/// The newest snapshot, `None` until the first refresh completes.
pub type SnapshotCell = Option<Arc<DashboardSnapshot>>;

/// Cloneable handle passed to the API.
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    snapshot_rx: watch::Receiver<SnapshotCell>,
}

impl EngineHandle {
    pub async fn send(&self, cmd: EngineCommand) {
        if self.command_tx.send(cmd).await.is_err() {
            warn!(?cmd, "Engine is not running, command dropped");
        }
    }

    pub fn latest(&self) -> SnapshotCell {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that wakes on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SnapshotCell> {
        self.snapshot_rx.clone()
    }
}

/// Fetches every configured timeframe plus the reference index, builds a
/// `DashboardSnapshot`, and publishes it. Fetch failures degrade to empty
/// series; a refresh itself never fails.
pub struct Engine {
    symbol: String,
    market: Arc<dyn MarketDataProvider>,
    reference: Arc<dyn ReferenceIndexProvider>,
    news: Arc<dyn SentimentProvider>,
    analysis: AnalysisConfig,
    refresh_interval: Duration,
    snapshot_tx: watch::Sender<SnapshotCell>,
    command_rx: mpsc::Receiver<EngineCommand>,
}

impl Engine {
    pub fn new(
        symbol: impl Into<String>,
        market: Arc<dyn MarketDataProvider>,
        reference: Arc<dyn ReferenceIndexProvider>,
        news: Arc<dyn SentimentProvider>,
        analysis: AnalysisConfig,
        refresh_interval: Duration,
    ) -> (Self, EngineHandle) {
        if refresh_interval < MIN_REFRESH_INTERVAL {
            warn!(
                requested = ?refresh_interval,
                using = ?MIN_REFRESH_INTERVAL,
                "Refresh interval too short, clamping"
            );
        }
        let refresh_interval = refresh_interval.max(MIN_REFRESH_INTERVAL);
        let (command_tx, command_rx) = mpsc::channel(32);
        let (snapshot_tx, snapshot_rx) = watch::channel(None);

        let handle = EngineHandle { command_tx, snapshot_rx };
        let engine = Engine {
            symbol: symbol.into(),
            market,
            reference,
            news,
            analysis,
            refresh_interval,
            snapshot_tx,
            command_rx,
        };
        (engine, handle)
    }

    /// Fetch everything and compose one snapshot. Does not publish it.
    pub async fn refresh(&self) -> DashboardSnapshot {
        let tf_cfg = &self.analysis.timeframes;

        let mut timeframes = TimeframeSet::new();
        for fetch in std::iter::once(&tf_cfg.primary).chain(&tf_cfg.secondary) {
            let series = self.fetch_series(fetch.timeframe, fetch.limit).await;
            timeframes.insert(fetch.timeframe, series);
        }
        let history = self.fetch_series(tf_cfg.history.timeframe, tf_cfg.history.limit).await;

        let reference = match self.reference.fetch().await {
            Ok(series) => series,
            Err(e) => {
                warn!(
                    ticker = %self.reference.ticker(),
                    error = %e,
                    "Reference index fetch failed"
                );
                PriceSeries::empty(self.reference.ticker(), Timeframe::D1)
            }
        };

        let news = match self.news.fetch().await {
            Ok(news) => news,
            Err(e) => {
                warn!(error = %e, "News feed fetch failed");
                NewsSentiment::neutral()
            }
        };

        build_snapshot(
            SnapshotInputs {
                symbol: &self.symbol,
                timeframes,
                history: &history,
                reference_ticker: self.reference.ticker(),
                reference: &reference,
                news,
            },
            tf_cfg.primary.timeframe,
            &self.analysis,
            Utc::now(),
        )
    }

    async fn fetch_series(&self, timeframe: Timeframe, limit: usize) -> PriceSeries {
        match self.market.fetch(&self.symbol, timeframe, limit).await {
            Ok(series) => series,
            Err(e) => {
                warn!(
                    symbol = %self.symbol,
                    timeframe = %timeframe,
                    error = %e,
                    "Market data fetch failed"
                );
                PriceSeries::empty(&self.symbol, timeframe)
            }
        }
    }

    async fn publish(&self) {
        let snapshot = self.refresh().await;
        info!(
            symbol = %snapshot.symbol,
            price = ?snapshot.price,
            signal = %snapshot.signal.label,
            "Dashboard refreshed"
        );
        self.snapshot_tx.send_replace(Some(Arc::new(snapshot)));
    }

    /// Refresh on every interval tick and on `EngineCommand::Refresh`.
    /// Returns once every `EngineHandle` is dropped. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!(symbol = %self.symbol, interval = ?self.refresh_interval, "Engine started");

        let mut ticker = tokio::time::interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.publish().await,
                cmd = self.command_rx.recv() => match cmd {
                    Some(EngineCommand::Refresh) => {
                        info!("Manual refresh requested");
                        self.publish().await;
                        ticker.reset();
                    }
                    None => {
                        warn!("Engine command channel closed, shutting down");
                        break;
                    }
                },
            }
        }
    }
}
