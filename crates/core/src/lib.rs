//! Stockdash Core - dashboard state, persistence and sync orchestration.
//!
//! This crate sits between the market data providers and whatever renders
//! the dashboard. It owns the watchlist and theme preferences, the watchlist
//! quote cache, and the [`SyncOrchestrator`] that keeps every stream fresh.
//! Fetching itself lives in `stockdash-market-data`.

pub mod config;
pub mod constants;
pub mod errors;
pub mod quotes;
pub mod storage;
pub mod sync;
pub mod theme;
pub mod watchlist;

pub use config::AppConfig;
pub use quotes::{MergeReport, QuoteCache, RefreshToken};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use sync::{DashboardState, StreamStatus, SyncOrchestrator};
pub use theme::{Theme, ThemeStore};
pub use watchlist::{ToggleOutcome, WatchlistStore};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
