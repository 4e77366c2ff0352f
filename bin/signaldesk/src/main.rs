use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use common::{Config, MarketDataProvider, ReferenceIndexProvider, SentimentProvider};
use engine::{
    BybitClient, CachedMarketData, CachedReference, CachedSentiment, Engine, YahooClient,
    YahooNewsClient,
};
use strategy::AnalysisConfig;

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(symbol = %cfg.symbol, reference = %cfg.reference_ticker, "SignalDesk starting");

    let analysis = AnalysisConfig::load_or_default(&cfg.analysis_config_path)
        .unwrap_or_else(|e| panic!("Invalid analysis config '{}': {e}", cfg.analysis_config_path));

    // ── Data providers ────────────────────────────────────────────────────────
    let bybit = BybitClient::new(&cfg.bybit_category)
        .unwrap_or_else(|e| panic!("Failed to create Bybit client: {e}"));
    let market: Arc<dyn MarketDataProvider> =
        Arc::new(CachedMarketData::new(Arc::new(bybit), cfg.market_cache_ttl));

    let fallback = Some(cfg.reference_fallback_ticker.clone()).filter(|t| !t.is_empty());
    let yahoo = YahooClient::new(&cfg.reference_ticker, fallback)
        .unwrap_or_else(|e| panic!("Failed to create Yahoo client: {e}"));
    let reference: Arc<dyn ReferenceIndexProvider> =
        Arc::new(CachedReference::new(Arc::new(yahoo), cfg.reference_cache_ttl));

    let feed = YahooNewsClient::new(&cfg.news_feed_url)
        .unwrap_or_else(|e| panic!("Failed to create news client: {e}"));
    let news: Arc<dyn SentimentProvider> =
        Arc::new(CachedSentiment::new(Arc::new(feed), cfg.news_cache_ttl));

    // ── Engine ────────────────────────────────────────────────────────────────
    let (engine, engine_handle) =
        Engine::new(&cfg.symbol, market, reference, news, analysis, cfg.refresh_interval);

    // ── Dashboard API ─────────────────────────────────────────────────────────
    if cfg.dashboard_token.is_none() {
        info!("DASHBOARD_TOKEN not set, refresh and stream routes are open");
    }
    let api_state = api::AppState {
        engine: engine_handle,
        dashboard_token: cfg.dashboard_token.clone(),
    };

    // ── Spawn all tasks ───────────────────────────────────────────────────────
    let port = cfg.dashboard_port;
    tokio::spawn(engine.run());
    tokio::spawn(async move {
        if let Err(e) = api::serve(api_state, port).await {
            error!(error = %e, "Dashboard API stopped");
        }
    });

    info!("All subsystems started. Waiting for shutdown signal.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received. Exiting.");
}
