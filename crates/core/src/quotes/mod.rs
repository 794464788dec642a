//! Quote cache for the active symbol and every watchlist entry.

mod quote_cache;

pub use quote_cache::{MergeReport, QuoteCache, RefreshToken};
