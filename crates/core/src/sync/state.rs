use stockdash_market_data::{
    CandleSeries, ChartPoint, ChartRange, CompanyProfile, Quote, SearchResult, Symbol,
};

use crate::quotes::QuoteCache;

/// Lifecycle of one refresh stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Errored,
}

/// Everything a dashboard view renders, published as one value.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardState {
    /// Active symbol
    pub symbol: Symbol,
    /// Active chart range
    pub range: ChartRange,
    /// Raw search box text
    pub query: String,
    pub search_results: Vec<SearchResult>,
    pub search_loading: bool,

    /// Profile of the active symbol; kept when a refresh fails
    pub profile: Option<CompanyProfile>,
    /// Quote of the active symbol; kept when a refresh fails
    pub quote: Option<Quote>,
    /// Candles for the active symbol and range; cleared while loading and on failure
    pub candles: Option<CandleSeries>,

    pub watchlist: Vec<Symbol>,
    pub watchlist_quotes: QuoteCache,

    pub primary_status: StreamStatus,
    pub candle_status: StreamStatus,

    /// Last user-visible error, if any
    pub error: Option<String>,
}

impl DashboardState {
    pub fn new(symbol: Symbol, range: ChartRange, watchlist: Vec<Symbol>) -> Self {
        Self {
            symbol,
            range,
            query: String::new(),
            search_results: Vec::new(),
            search_loading: false,
            profile: None,
            quote: None,
            candles: None,
            watchlist,
            watchlist_quotes: QuoteCache::new(),
            primary_status: StreamStatus::Idle,
            candle_status: StreamStatus::Idle,
            error: None,
        }
    }

    /// True while the active symbol's data or chart is being fetched.
    pub fn is_loading(&self) -> bool {
        self.primary_status == StreamStatus::Loading || self.candle_status == StreamStatus::Loading
    }

    /// Close-price points for the chart, ascending by timestamp (milliseconds).
    pub fn chart_points(&self) -> Vec<ChartPoint> {
        self.candles
            .as_ref()
            .map(CandleSeries::chart_points)
            .unwrap_or_default()
    }

    pub fn is_watched(&self, symbol: &Symbol) -> bool {
        self.watchlist.contains(symbol)
    }
}
