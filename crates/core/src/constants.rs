/// Storage key holding the JSON-encoded watchlist
pub const WATCHLIST_STORAGE_KEY: &str = "stock-app-watchlist";

/// Storage key holding the theme preference ("light" or "dark")
pub const THEME_STORAGE_KEY: &str = "stock-app-theme";

/// Watchlist used when storage is empty or unreadable, in display order
pub const DEFAULT_WATCHLIST: [&str; 8] = [
    "AAPL", "MSFT", "NVDA", "TSLA", "AMZN", "META", "GOOGL", "AMD",
];

/// Ceiling for explicitly toggled watchlist entries
pub const WATCHLIST_MAX_SIZE: usize = 300;

/// Ceiling applied when a selection adds a symbol implicitly
pub const RECENT_SELECTION_MAX_SIZE: usize = 8;

/// Symbol shown at startup
pub const DEFAULT_SYMBOL: &str = "AAPL";

/// User-visible error messages
pub const MARKET_DATA_ERROR: &str = "Unable to fetch market data right now.";
pub const CANDLES_ERROR: &str = "Unable to fetch historical close prices right now.";
pub const QUOTE_REFRESH_ERROR: &str = "Quote refresh failed.";
pub const WATCHLIST_REFRESH_ERROR: &str = "Some watchlist quotes could not be refreshed.";
pub const WATCHLIST_QUOTE_ERROR: &str = "Unable to refresh watchlist quote.";
