pub mod bybit;
pub mod cache;
pub mod lifecycle;
pub mod news;
pub mod snapshot;
pub mod yahoo;

pub use bybit::BybitClient;
pub use cache::{CachedMarketData, CachedReference, CachedSentiment, TtlCache};
pub use lifecycle::{Engine, EngineCommand, EngineHandle, SnapshotCell};
pub use news::YahooNewsClient;
pub use snapshot::{build_snapshot, DashboardSnapshot, KeyLevels, SnapshotInputs};
pub use yahoo::YahooClient;
