use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};
use stockdash_market_data::Symbol;

use crate::constants::{
    DEFAULT_WATCHLIST, RECENT_SELECTION_MAX_SIZE, WATCHLIST_MAX_SIZE, WATCHLIST_STORAGE_KEY,
};
use crate::errors::Result;
use crate::storage::KeyValueStore;

/// Which branch a toggle took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub added: bool,
}

/// The default watchlist, in display order.
pub fn default_symbols() -> Vec<Symbol> {
    DEFAULT_WATCHLIST.into_iter().map(Symbol::from_static).collect()
}

/// Reads the persisted watchlist.
///
/// A missing key, unreadable storage, anything other than a JSON array, or an
/// array with no usable entries all yield the default list. Entries are
/// normalized and de-duplicated, keeping the first occurrence, and the list
/// is cut to 300 entries.
pub fn load_symbols(storage: &dyn KeyValueStore) -> Vec<Symbol> {
    let raw = match storage.get(WATCHLIST_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return default_symbols(),
        Err(e) => {
            warn!("Failed to read watchlist from storage: {}", e);
            return default_symbols();
        }
    };

    let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Ignoring malformed stored watchlist: {}", e);
            return default_symbols();
        }
    };

    let mut seen = HashSet::new();
    let mut symbols: Vec<Symbol> = entries
        .iter()
        .filter_map(|v| v.as_str())
        .filter_map(Symbol::parse)
        .filter(|s| seen.insert(s.clone()))
        .collect();

    if symbols.is_empty() {
        return default_symbols();
    }
    if symbols.len() > WATCHLIST_MAX_SIZE {
        warn!(
            "Stored watchlist has {} symbols; keeping the first {}",
            symbols.len(),
            WATCHLIST_MAX_SIZE
        );
        symbols.truncate(WATCHLIST_MAX_SIZE);
    }
    symbols
}

/// Ordered set of watched symbols mirrored to durable storage.
///
/// Every mutation writes the whole list back before returning. A failed
/// write is logged and the in-memory list stays authoritative; the next
/// successful write brings storage back in line.
pub struct WatchlistStore {
    storage: Arc<dyn KeyValueStore>,
    symbols: Vec<Symbol>,
}

impl WatchlistStore {
    /// Loads the list from `storage`.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let symbols = load_symbols(storage.as_ref());
        debug!("Loaded watchlist with {} symbols", symbols.len());
        Self { storage, symbols }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Prepends `symbol`, keeping at most 300 entries. Returns `false` when
    /// it was already present.
    pub fn add(&mut self, symbol: Symbol) -> bool {
        self.insert_front(symbol, WATCHLIST_MAX_SIZE)
    }

    /// Prepends a symbol reached through selection, keeping at most 8 entries.
    pub fn add_recent(&mut self, symbol: Symbol) -> bool {
        self.insert_front(symbol, RECENT_SELECTION_MAX_SIZE)
    }

    /// Removes `symbol`. Returns `false` when it was not present.
    pub fn remove(&mut self, symbol: &Symbol) -> bool {
        let before = self.symbols.len();
        self.symbols.retain(|s| s != symbol);
        if self.symbols.len() == before {
            return false;
        }
        self.persist_logged();
        true
    }

    pub fn toggle(&mut self, symbol: Symbol) -> ToggleOutcome {
        if self.contains(&symbol) {
            self.remove(&symbol);
            ToggleOutcome { added: false }
        } else {
            self.add(symbol);
            ToggleOutcome { added: true }
        }
    }

    /// Writes the full ordered list to storage.
    pub fn persist(&self) -> Result<()> {
        let json = serde_json::to_string(&self.symbols)?;
        self.storage.set(WATCHLIST_STORAGE_KEY, &json)
    }

    fn insert_front(&mut self, symbol: Symbol, cap: usize) -> bool {
        if self.contains(&symbol) {
            return false;
        }
        self.symbols.insert(0, symbol);
        self.symbols.truncate(cap);
        self.persist_logged();
        true
    }

    fn persist_logged(&self) {
        if let Err(e) = self.persist() {
            warn!("Failed to persist watchlist: {}", e);
        }
    }
}
