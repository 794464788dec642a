//! Sync orchestrator.
//!
//! Owns every refresh stream of the dashboard and publishes the combined
//! result as a [`DashboardState`] through a `watch` channel.
//!
//! ```text
//!  select_symbol ──► primary stream (profile + quote) ─┐
//!        │       └─► candle stream ◄── set_range       │
//!        │                                             ├─► watch::Sender<DashboardState>
//!  set_query ──► search worker (debounce) ─► search ───┤
//!  quote poller (15s) ─────────────────────────────────┤
//!  watchlist poller (30s) ─► bulk merge ───────────────┘
//! ```
//!
//! Each user-triggered stream carries a [`StreamGeneration`]. A result is
//! committed only if its generation is still current, and the check happens
//! inside the state update so nothing can slip in between.
//!
//! Lock order: the watchlist store mutex is taken before the state channel.
//! No lock is held across an await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use stockdash_market_data::{ChartRange, ProviderRegistry, Quote, Symbol};

use super::generation::StreamGeneration;
use super::search_worker::{search_worker, SearchCommand};
use super::state::{DashboardState, StreamStatus};
use crate::config::AppConfig;
use crate::constants::{
    CANDLES_ERROR, MARKET_DATA_ERROR, QUOTE_REFRESH_ERROR, WATCHLIST_QUOTE_ERROR,
    WATCHLIST_REFRESH_ERROR,
};
use crate::errors::Result;
use crate::storage::KeyValueStore;
use crate::watchlist::{ToggleOutcome, WatchlistStore};

/// Shared by the orchestrator handle and every task it spawns.
pub(crate) struct Inner {
    registry: Arc<ProviderRegistry>,
    watchlist: Mutex<WatchlistStore>,
    state: watch::Sender<DashboardState>,
    primary_generation: StreamGeneration,
    candle_generation: StreamGeneration,
    search_generation: StreamGeneration,
}

pub struct SyncOrchestrator {
    inner: Arc<Inner>,
    config: AppConfig,
    search_tx: mpsc::UnboundedSender<SearchCommand>,
    search_rx: Mutex<Option<mpsc::UnboundedReceiver<SearchCommand>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Guarded data stays consistent on panic: every mutation is a single call.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SyncOrchestrator {
    /// Builds the orchestrator. The watchlist is loaded from `storage` here;
    /// nothing is fetched until [`SyncOrchestrator::start`].
    pub fn new(
        config: AppConfig,
        registry: Arc<ProviderRegistry>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        config.validate()?;

        let watchlist = WatchlistStore::load(storage);
        let initial = DashboardState::new(
            config.default_symbol.clone(),
            config.default_range,
            watchlist.symbols().to_vec(),
        );
        let (state, _) = watch::channel(initial);
        let (search_tx, search_rx) = mpsc::unbounded_channel();

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                watchlist: Mutex::new(watchlist),
                state,
                primary_generation: StreamGeneration::new(),
                candle_generation: StreamGeneration::new(),
                search_generation: StreamGeneration::new(),
            }),
            config,
            search_tx,
            search_rx: Mutex::new(Some(search_rx)),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Runs the initial primary, candle and watchlist refresh, then spawns
    /// the quote poller, the watchlist poller and the search worker.
    ///
    /// Calling it a second time does nothing.
    pub async fn start(&self) {
        let Some(search_rx) = lock(&self.search_rx).take() else {
            warn!("Sync orchestrator already started");
            return;
        };

        let (symbol, range) = self.inner.target();
        info!("Starting sync for {} ({})", symbol, range);

        tokio::join!(
            self.inner.refresh_primary(symbol.clone()),
            self.inner.refresh_candles(symbol, range),
            self.inner.refresh_watchlist(),
        );

        let mut tasks = lock(&self.tasks);
        tasks.push(tokio::spawn(search_worker(
            search_rx,
            self.inner.clone(),
            self.config.search_debounce,
        )));
        tasks.push(spawn_poller(
            "quote",
            self.config.quote_poll_interval,
            self.inner.clone(),
            |inner| async move { inner.refresh_quote().await },
        ));
        tasks.push(spawn_poller(
            "watchlist",
            self.config.watchlist_poll_interval,
            self.inner.clone(),
            |inner| async move { inner.refresh_watchlist().await },
        ));
    }

    /// Stops every poller and the search worker, and discards the results of
    /// requests still in flight.
    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = lock(&self.tasks).drain(..).collect();
        self.inner.invalidate_all();

        for handle in &handles {
            handle.abort();
        }
        for handle in handles {
            // Cancelled tasks report a JoinError, which is expected here.
            let _ = handle.await;
        }
        info!("Sync orchestrator stopped");
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> DashboardState {
        self.inner.state.borrow().clone()
    }

    /// Makes `raw` the active symbol.
    ///
    /// Clears the search box, adds the symbol to the watchlist under the
    /// recent-selection cap, and refreshes profile, quote and candles. A blank
    /// input is ignored.
    pub async fn select_symbol(&self, raw: &str) {
        let Some(symbol) = Symbol::parse(raw) else {
            return;
        };

        self.inner.search_generation.invalidate();
        let _ = self.search_tx.send(SearchCommand::Cancel);

        let (changed, range) = {
            let mut watchlist = lock(&self.inner.watchlist);
            watchlist.add_recent(symbol.clone());
            let members = watchlist.symbols().to_vec();

            let mut changed = false;
            let mut range = ChartRange::default();
            self.inner.state.send_modify(|s| {
                changed = s.symbol != symbol;
                range = s.range;
                s.symbol = symbol.clone();
                s.query.clear();
                s.search_results.clear();
                s.search_loading = false;
                s.watchlist_quotes.retain_members(&members);
                s.watchlist = members;
            });
            (changed, range)
        };

        if changed {
            info!("Selected {}", symbol);
            tokio::join!(
                self.inner.refresh_primary(symbol.clone()),
                self.inner.refresh_candles(symbol, range),
            );
        }
    }

    /// Changes the chart range and refreshes the candles.
    pub async fn set_range(&self, range: ChartRange) {
        let mut changed = false;
        let mut symbol = None;
        self.inner.state.send_if_modified(|s| {
            changed = s.range != range;
            s.range = range;
            symbol = Some(s.symbol.clone());
            changed
        });

        if let (true, Some(symbol)) = (changed, symbol) {
            self.inner.refresh_candles(symbol, range).await;
        }
    }

    /// Updates the search box text.
    ///
    /// Blank text clears the results at once and supersedes any search in
    /// flight. Anything else is handed to the debounced search worker.
    pub fn set_query(&self, text: &str) {
        let blank = text.trim().is_empty();
        if blank {
            self.inner.search_generation.invalidate();
        }

        self.inner.state.send_modify(|s| {
            s.query = text.to_string();
            if blank {
                s.search_results.clear();
                s.search_loading = false;
            }
        });

        let command = if blank {
            SearchCommand::Cancel
        } else {
            SearchCommand::Query(text.to_string())
        };
        if self.search_tx.send(command).is_err() {
            debug!("Search worker is gone; dropping query");
        }
    }

    /// Adds `raw` to the watchlist if absent, removes it otherwise.
    ///
    /// An added symbol gets a quote right away: the active quote when it is
    /// the active symbol, otherwise one extra fetch. Returns `None` for a
    /// blank input.
    pub async fn toggle_watchlist(&self, raw: &str) -> Option<ToggleOutcome> {
        let symbol = Symbol::parse(raw)?;

        let (outcome, hydrated) = {
            let mut watchlist = lock(&self.inner.watchlist);
            let outcome = watchlist.toggle(symbol.clone());
            let members = watchlist.symbols().to_vec();

            let mut hydrated = false;
            self.inner.state.send_modify(|s| {
                s.watchlist = members;
                if !outcome.added {
                    s.watchlist_quotes.remove(&symbol);
                    return;
                }
                if s.symbol == symbol {
                    if let Some(quote) = s.quote.clone() {
                        s.watchlist_quotes.upsert(symbol.clone(), quote);
                        hydrated = true;
                    }
                }
            });
            (outcome, hydrated)
        };

        info!(
            "{} {} watchlist",
            symbol,
            if outcome.added { "added to" } else { "removed from" }
        );

        if outcome.added && !hydrated {
            self.inner.hydrate_watchlist_quote(symbol).await;
        }
        Some(outcome)
    }

    /// Re-fetches profile and quote for the active symbol.
    pub async fn refresh_primary(&self) {
        let (symbol, _) = self.inner.target();
        self.inner.refresh_primary(symbol).await;
    }

    /// Re-fetches candles for the active symbol and range.
    pub async fn refresh_candles(&self) {
        let (symbol, range) = self.inner.target();
        self.inner.refresh_candles(symbol, range).await;
    }

    /// One quote-poll cycle for the active symbol.
    pub async fn refresh_quote(&self) {
        self.inner.refresh_quote().await;
    }

    /// One bulk refresh of every watchlist quote.
    pub async fn refresh_watchlist(&self) {
        self.inner.refresh_watchlist().await;
    }
}

impl Drop for SyncOrchestrator {
    fn drop(&mut self) {
        self.inner.invalidate_all();
        for handle in lock(&self.tasks).drain(..) {
            handle.abort();
        }
    }
}

/// Spawns a task running `tick` every `period`, starting one period from now.
fn spawn_poller<F, Fut>(
    name: &'static str,
    period: Duration,
    inner: Arc<Inner>,
    tick: F,
) -> JoinHandle<()>
where
    F: Fn(Arc<Inner>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        info!("{} poller started ({:?} interval)", name, period);

        // The initial refresh already ran in start(); skip the immediate tick.
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            debug!("{} poll tick", name);
            tick(inner.clone()).await;
        }
    })
}

impl Inner {
    /// Active symbol and range.
    fn target(&self) -> (Symbol, ChartRange) {
        let state = self.state.borrow();
        (state.symbol.clone(), state.range)
    }

    fn invalidate_all(&self) {
        self.primary_generation.invalidate();
        self.candle_generation.invalidate();
        self.search_generation.invalidate();
    }

    /// Profile and quote for `symbol`. On failure the previous values stay.
    async fn refresh_primary(&self, symbol: Symbol) {
        let generation = self.primary_generation.next();
        self.state.send_modify(|s| {
            s.primary_status = StreamStatus::Loading;
            s.error = None;
        });

        let (profile, quote) = tokio::join!(
            self.registry.fetch_profile(&symbol),
            self.registry.fetch_quote(&symbol),
        );

        let committed = self.state.send_if_modified(|s| {
            if !self.primary_generation.is_current(generation) {
                return false;
            }
            match (profile, quote) {
                (Ok(profile), Ok(quote)) => {
                    let quote = quote.into_data();
                    if s.is_watched(&symbol) {
                        s.watchlist_quotes.upsert(symbol.clone(), quote.clone());
                    }
                    s.profile = Some(profile.into_data());
                    s.quote = Some(quote);
                    s.primary_status = StreamStatus::Ready;
                }
                (profile, quote) => {
                    for e in [profile.err(), quote.err()].into_iter().flatten() {
                        warn!("Primary refresh for {} failed: {}", symbol, e);
                    }
                    s.primary_status = StreamStatus::Errored;
                    s.error = Some(MARKET_DATA_ERROR.to_string());
                }
            }
            true
        });

        if !committed {
            debug!("Discarded superseded primary result for {}", symbol);
        }
    }

    /// Candles for `symbol` over `range`. The series is cleared while loading
    /// and on failure.
    async fn refresh_candles(&self, symbol: Symbol, range: ChartRange) {
        let generation = self.candle_generation.next();
        self.state.send_modify(|s| {
            s.candle_status = StreamStatus::Loading;
            s.candles = None;
        });

        let result = self.registry.fetch_candles(&symbol, range).await;

        let committed = self.state.send_if_modified(|s| {
            if !self.candle_generation.is_current(generation) {
                return false;
            }
            match result {
                Ok(resolved) => {
                    debug!(
                        "Loaded {} {} candles for {} from {}",
                        resolved.data.len(),
                        range,
                        symbol,
                        resolved.source
                    );
                    s.candles = Some(resolved.into_data());
                    s.candle_status = StreamStatus::Ready;
                }
                Err(e) => {
                    warn!("Candle refresh for {} ({}) failed: {}", symbol, range, e);
                    s.candles = None;
                    s.candle_status = StreamStatus::Errored;
                    s.error = Some(CANDLES_ERROR.to_string());
                }
            }
            true
        });

        if !committed {
            debug!("Discarded superseded {} candles for {}", range, symbol);
        }
    }

    /// Quote-only refresh for the active symbol.
    ///
    /// The result is dropped if the active symbol changed meanwhile.
    async fn refresh_quote(&self) {
        let (symbol, _) = self.target();
        let result = self.registry.fetch_quote(&symbol).await;

        self.state.send_if_modified(|s| {
            if s.symbol != symbol {
                debug!("Dropping polled quote for inactive symbol {}", symbol);
                return false;
            }
            match result {
                Ok(resolved) => {
                    let quote = resolved.into_data();
                    if s.is_watched(&symbol) {
                        s.watchlist_quotes.upsert(symbol.clone(), quote.clone());
                    }
                    s.quote = Some(quote);
                }
                Err(e) => {
                    warn!("Quote refresh for {} failed: {}", symbol, e);
                    s.error = Some(QUOTE_REFRESH_ERROR.to_string());
                }
            }
            true
        });
    }

    /// Fetches every watchlist quote concurrently and merges the successes.
    async fn refresh_watchlist(&self) {
        let (symbols, token) = {
            let state = self.state.borrow();
            (state.watchlist.clone(), state.watchlist_quotes.begin_refresh())
        };
        if symbols.is_empty() {
            return;
        }

        let results: Vec<(Symbol, std::result::Result<Quote, _>)> =
            join_all(symbols.into_iter().map(|symbol| async move {
                let result = self
                    .registry
                    .fetch_quote(&symbol)
                    .await
                    .map(|resolved| resolved.into_data());
                (symbol, result)
            }))
            .await;

        self.state.send_modify(|s| {
            let members = s.watchlist.clone();
            let report = s.watchlist_quotes.merge_settled(token, results, &members);
            if report.has_failures() {
                warn!(
                    "Watchlist refresh: {} updated, {} failed ({:?})",
                    report.updated,
                    report.failed.len(),
                    report.failed
                );
                s.error = Some(WATCHLIST_REFRESH_ERROR.to_string());
            } else {
                debug!("Watchlist refresh: {} updated", report.updated);
            }
        });
    }

    /// Single-symbol fetch for a freshly added watchlist entry.
    async fn hydrate_watchlist_quote(&self, symbol: Symbol) {
        let result = self.registry.fetch_quote(&symbol).await;

        self.state.send_modify(|s| match result {
            Ok(resolved) => {
                if s.is_watched(&symbol) {
                    s.watchlist_quotes.upsert(symbol.clone(), resolved.into_data());
                }
            }
            Err(e) => {
                warn!("Quote for new watchlist entry {} failed: {}", symbol, e);
                s.error = Some(WATCHLIST_QUOTE_ERROR.to_string());
            }
        });
    }

    /// Runs one search and commits it if no newer search or clear happened.
    pub(crate) fn dispatch_search(self: &Arc<Self>, query: String) {
        let generation = self.search_generation.next();
        self.state.send_modify(|s| s.search_loading = true);
        debug!("Dispatching search for '{}'", query);

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let results = match inner.registry.search(&query).await {
                Ok(resolved) => resolved.into_data(),
                Err(e) => {
                    warn!("Search for '{}' failed: {}", query, e);
                    Vec::new()
                }
            };

            let committed = inner.state.send_if_modified(|s| {
                if !inner.search_generation.is_current(generation) {
                    return false;
                }
                s.search_results = results;
                s.search_loading = false;
                true
            });

            if !committed {
                debug!("Discarded superseded search results for '{}'", query);
            }
        });
    }
}
