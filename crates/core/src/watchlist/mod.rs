//! Persisted, ordered watchlist.

mod watchlist_store;

pub use watchlist_store::{default_symbols, load_symbols, ToggleOutcome, WatchlistStore};
