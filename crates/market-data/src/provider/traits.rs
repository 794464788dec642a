//! The seam every data source plugs into.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{Candle, ChartRange, CompanyProfile, Quote, SearchResult, Symbol, TimeWindow};

/// One upstream source of market data.
///
/// Each method issues exactly one request and maps the response into the
/// canonical shape, or fails with a [`MarketDataError`]. Implementations
/// never retry and never fall back on their own; the
/// [`ProviderRegistry`](crate::registry::ProviderRegistry) walks the chain.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Stable tag such as `"FINNHUB"`, used in logs and on resolved results.
    fn id(&self) -> &'static str;

    /// Position in the fallback chain; lower runs first.
    fn priority(&self) -> u8 {
        10
    }

    /// Whether results from this provider are fabricated rather than fetched.
    fn is_synthetic(&self) -> bool {
        false
    }

    /// Fetch the latest quote for a symbol.
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, MarketDataError>;

    /// Fetch the company profile for a symbol.
    ///
    /// A provider that knows nothing about the symbol returns an empty
    /// profile, not an error.
    async fn fetch_profile(&self, symbol: &Symbol) -> Result<CompanyProfile, MarketDataError>;

    /// Fetch candle history for a chart range.
    ///
    /// `window` is the requested time window; providers use it to shape the
    /// request where their API allows it. The returned rows may still fall
    /// partly or entirely outside the window; the registry trims them.
    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        range: ChartRange,
        window: TimeWindow,
    ) -> Result<Vec<Candle>, MarketDataError>;

    /// Symbols matching a free-text query.
    ///
    /// No match is an empty vector, not an error.
    async fn search_symbols(&self, query: &str) -> Result<Vec<SearchResult>, MarketDataError>;
}
