//! Per-symbol quote cache shared by every refresh path.

use std::collections::HashMap;

use log::debug;
use stockdash_market_data::{Quote, Symbol};

/// Quote plus the cache revision at which it was written.
#[derive(Clone, Debug, PartialEq, Eq)]
struct CachedQuote {
    quote: Quote,
    revision: u64,
}

/// Opaque marker taken when a bulk refresh is dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshToken(u64);

/// Outcome of merging one bulk refresh.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Entries written by this merge
    pub updated: usize,
    /// Symbols whose fetch failed
    pub failed: Vec<Symbol>,
    /// Successful fetches skipped because a newer write already landed
    pub superseded: usize,
    /// Results for symbols no longer on the watchlist
    pub dropped: usize,
}

impl MergeReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Mapping of symbol to its latest quote.
///
/// Writers only ever touch individual keys. Each write bumps a revision
/// counter so a bulk refresh can tell which entries changed after it was
/// dispatched and leave those alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuoteCache {
    entries: HashMap<Symbol, CachedQuote>,
    revision: u64,
}

impl QuoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Quote> {
        self.entries.get(symbol).map(|c| &c.quote)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.entries.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Quote)> + '_ {
        self.entries.iter().map(|(s, c)| (s, &c.quote))
    }

    /// Last-writer-wins write for one symbol.
    pub fn upsert(&mut self, symbol: Symbol, quote: Quote) {
        self.revision += 1;
        self.entries.insert(
            symbol,
            CachedQuote {
                quote,
                revision: self.revision,
            },
        );
    }

    pub fn remove(&mut self, symbol: &Symbol) -> Option<Quote> {
        self.entries.remove(symbol).map(|c| c.quote)
    }

    /// Drops every entry whose symbol is not in `members`.
    pub fn retain_members(&mut self, members: &[Symbol]) {
        self.entries.retain(|symbol, _| members.contains(symbol));
    }

    /// Marker for a bulk refresh dispatched now.
    pub fn begin_refresh(&self) -> RefreshToken {
        RefreshToken(self.revision)
    }

    /// Merges the settled results of a bulk refresh.
    ///
    /// `members` is the watchlist at merge time: entries for symbols that
    /// left it are removed, and results for them are discarded. A success
    /// for a symbol written after `token` was taken is skipped, so a fresher
    /// single-symbol update survives.
    pub fn merge_settled<E>(
        &mut self,
        token: RefreshToken,
        results: Vec<(Symbol, Result<Quote, E>)>,
        members: &[Symbol],
    ) -> MergeReport {
        self.retain_members(members);

        let mut report = MergeReport::default();
        for (symbol, result) in results {
            if !members.contains(&symbol) {
                report.dropped += 1;
                continue;
            }

            let quote = match result {
                Ok(quote) => quote,
                Err(_) => {
                    report.failed.push(symbol);
                    continue;
                }
            };

            if self
                .entries
                .get(&symbol)
                .is_some_and(|c| c.revision > token.0)
            {
                debug!("Keeping newer quote for {} over bulk refresh result", symbol);
                report.superseded += 1;
                continue;
            }

            self.upsert(symbol, quote);
            report.updated += 1;
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn quote(current: Decimal) -> Quote {
        Quote {
            current,
            open: current,
            high: current,
            low: current,
            previous_close: current,
            as_of: 0,
        }
    }

    #[test]
    fn test_upsert_is_last_writer_wins() {
        let mut cache = QuoteCache::new();
        cache.upsert(sym("AAPL"), quote(dec!(1)));
        cache.upsert(sym("AAPL"), quote(dec!(2)));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&sym("AAPL")).map(|q| q.current), Some(dec!(2)));
    }

    #[test]
    fn test_merge_keeps_successes_and_reports_failures() {
        let mut cache = QuoteCache::new();
        cache.upsert(sym("MSFT"), quote(dec!(9)));
        let members = vec![sym("AAPL"), sym("MSFT"), sym("IBM")];

        let token = cache.begin_refresh();
        let report = cache.merge_settled(
            token,
            vec![
                (sym("AAPL"), Ok(quote(dec!(1)))),
                (sym("MSFT"), Err("HTTP 500")),
                (sym("IBM"), Ok(quote(dec!(3)))),
            ],
            &members,
        );

        assert_eq!(report.updated, 2);
        assert_eq!(report.failed, vec![sym("MSFT")]);
        assert!(report.has_failures());
        // Failed symbol keeps its previous quote
        assert_eq!(cache.get(&sym("MSFT")).map(|q| q.current), Some(dec!(9)));
        assert_eq!(cache.get(&sym("IBM")).map(|q| q.current), Some(dec!(3)));
    }

    #[test]
    fn test_merge_drops_symbols_removed_mid_flight() {
        let mut cache = QuoteCache::new();
        cache.upsert(sym("TSLA"), quote(dec!(5)));
        let token = cache.begin_refresh();

        // TSLA was removed from the watchlist while the refresh was running
        let members = vec![sym("AAPL")];
        let report = cache.merge_settled::<()>(
            token,
            vec![
                (sym("AAPL"), Ok(quote(dec!(1)))),
                (sym("TSLA"), Ok(quote(dec!(6)))),
            ],
            &members,
        );

        assert_eq!(report.dropped, 1);
        assert!(!cache.contains(&sym("TSLA")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_merge_ignores_failures_for_removed_symbols() {
        let mut cache = QuoteCache::new();
        let token = cache.begin_refresh();

        let members = vec![sym("AAPL")];
        let report = cache.merge_settled(
            token,
            vec![
                (sym("AAPL"), Ok(quote(dec!(1)))),
                (sym("TSLA"), Err("HTTP 500")),
            ],
            &members,
        );

        assert!(!report.has_failures());
        assert_eq!(report.dropped, 1);
        assert_eq!(report.updated, 1);
    }

    #[test]
    fn test_merge_does_not_clobber_newer_single_update() {
        let mut cache = QuoteCache::new();
        let members = vec![sym("AAPL"), sym("MSFT")];

        let token = cache.begin_refresh();
        // A single-symbol refresh lands while the bulk refresh is in flight
        cache.upsert(sym("AAPL"), quote(dec!(200)));

        let report = cache.merge_settled::<()>(
            token,
            vec![
                (sym("AAPL"), Ok(quote(dec!(150)))),
                (sym("MSFT"), Ok(quote(dec!(300)))),
            ],
            &members,
        );

        assert_eq!(report.superseded, 1);
        assert_eq!(cache.get(&sym("AAPL")).map(|q| q.current), Some(dec!(200)));
        assert_eq!(cache.get(&sym("MSFT")).map(|q| q.current), Some(dec!(300)));
    }

    #[test]
    fn test_retain_members() {
        let mut cache = QuoteCache::new();
        cache.upsert(sym("A"), quote(dec!(1)));
        cache.upsert(sym("B"), quote(dec!(1)));
        cache.retain_members(&[sym("B")]);
        assert!(!cache.contains(&sym("A")));
        assert!(cache.contains(&sym("B")));
    }
}
