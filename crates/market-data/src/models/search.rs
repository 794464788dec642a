//! Search result models for symbol lookup.

use serde::{Deserialize, Serialize};

/// Maximum number of results handed to the UI.
pub const MAX_SEARCH_RESULTS: usize = 8;

/// Result from a ticker/symbol search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Symbol/ticker (e.g., "AAPL")
    pub symbol: String,

    /// Display description (e.g., "Apple Inc")
    pub description: String,
}

impl SearchResult {
    /// Create a new search result.
    pub fn new(symbol: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            description: description.into(),
        }
    }
}
