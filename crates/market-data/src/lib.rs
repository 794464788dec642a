//! Stockdash Market Data Crate
//!
//! Provider-agnostic market data fetching for the stockdash dashboard.
//!
//! # Overview
//!
//! The crate covers four read operations against public REST APIs:
//! - Latest quote for a symbol
//! - Company profile
//! - Candle history for a chart range
//! - Symbol search
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |  Sync / caller   |   (stockdash-core orchestrator)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! | ProviderRegistry |   (fallback chain + validity rules)
//! +------------------+
//!          |
//!          v
//! +------------------+------------------+------------------+
//! |     Finnhub      |  Alpha Vantage   |    Synthetic     |
//! |    (primary)     |   (secondary)    |  (last resort)   |
//! +------------------+------------------+------------------+
//!          |
//!          v
//! +------------------+
//! | Canonical models |   (Quote, CompanyProfile, CandleSeries, SearchResult)
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Symbol`] - Normalized (trimmed, uppercase) ticker
//! - [`Quote`] - Point-in-time price snapshot
//! - [`CompanyProfile`] - Descriptive company data, every field optional
//! - [`CandleSeries`] - Column-aligned OHLCV history
//! - [`ChartRange`] - One of the four supported chart windows
//! - [`SearchResult`] - Symbol search hit

pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use errors::MarketDataError;

pub use models::{
    Candle, CandleSeries, CandleStatus, ChartPoint, ChartRange, CompanyProfile, ParseRangeError,
    ProviderId, Quote, SearchResult, Symbol, TimeWindow, DAY_SECONDS, MAX_SEARCH_RESULTS,
};

pub use provider::alpha_vantage::AlphaVantageProvider;
pub use provider::finnhub::FinnhubProvider;
pub use provider::synthetic::SyntheticProvider;
pub use provider::MarketDataProvider;

pub use registry::{Operation, ProviderRegistry, Resolved};
