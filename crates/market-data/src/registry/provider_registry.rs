//! Provider registry for orchestrating market data providers.
//!
//! The registry holds the fallback chain and resolves each operation by
//! trying providers in priority order:
//! - Provider errors (missing key, HTTP, decoding) move on to the next provider
//! - Results that fail the validity rules also move on
//! - The first accepted result is returned together with the provider id
//! - Exhausting the chain yields [`MarketDataError::AllProvidersFailed`]

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};

use super::validator::{select_candles, validate_quote};
use crate::errors::MarketDataError;
use crate::models::{
    CandleSeries, ChartRange, CompanyProfile, ProviderId, Quote, SearchResult, Symbol,
    MAX_SEARCH_RESULTS,
};
use crate::provider::alpha_vantage::AlphaVantageProvider;
use crate::provider::finnhub::FinnhubProvider;
use crate::provider::synthetic::SyntheticProvider;
use crate::provider::MarketDataProvider;

/// Source reported for a search that never reached a provider.
const NO_PROVIDER: &str = "NONE";

type ProviderCall<'a, R> = Pin<Box<dyn Future<Output = Result<R, MarketDataError>> + Send + 'a>>;

/// The four operations the registry resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Quote,
    Profile,
    Candles,
    Search,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Quote => "quote",
            Operation::Profile => "profile",
            Operation::Candles => "candles",
            Operation::Search => "search",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted result and the provider that produced it.
///
/// `synthetic` is set when the data was fabricated by the last-resort
/// provider. Consumers that only need the canonical value take `data`.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolved<T> {
    pub data: T,
    pub source: ProviderId,
    pub synthetic: bool,
}

impl<T> Resolved<T> {
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

/// Provider registry for orchestrating market data fetching.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn MarketDataProvider>>,
}

impl ProviderRegistry {
    /// Create a new provider registry.
    ///
    /// Providers are ordered by [`MarketDataProvider::priority`], lowest first.
    /// Providers with equal priority keep the order they were given in.
    pub fn new(mut providers: Vec<Arc<dyn MarketDataProvider>>) -> Self {
        providers.sort_by_key(|p| p.priority());
        Self { providers }
    }

    /// The standard chain: Finnhub, then Alpha Vantage, then synthetic data.
    ///
    /// Missing keys are accepted here; the affected provider fails every
    /// request with a configuration error and the chain moves past it.
    pub fn standard(
        finnhub_api_key: Option<String>,
        alpha_vantage_api_key: Option<String>,
        request_timeout: Duration,
    ) -> Self {
        Self::new(vec![
            Arc::new(FinnhubProvider::with_timeout(finnhub_api_key, request_timeout)),
            Arc::new(AlphaVantageProvider::with_timeout(
                alpha_vantage_api_key,
                request_timeout,
            )),
            Arc::new(SyntheticProvider::new()),
        ])
    }

    /// Get list of providers in priority order.
    pub fn providers(&self) -> &[Arc<dyn MarketDataProvider>] {
        &self.providers
    }

    /// Latest quote for `symbol`. Only fails if the chain has no synthetic
    /// provider and every real provider failed.
    pub async fn fetch_quote(&self, symbol: &Symbol) -> Result<Resolved<Quote>, MarketDataError> {
        self.resolve(
            Operation::Quote,
            symbol.as_str(),
            |p| p.fetch_quote(symbol),
            validate_quote,
        )
        .await
    }

    /// Company profile for `symbol`. An empty profile is a valid answer.
    pub async fn fetch_profile(
        &self,
        symbol: &Symbol,
    ) -> Result<Resolved<CompanyProfile>, MarketDataError> {
        self.resolve(
            Operation::Profile,
            symbol.as_str(),
            |p| p.fetch_profile(symbol),
            Ok,
        )
        .await
    }

    /// Candle history for `symbol` over `range`, ending now.
    pub async fn fetch_candles(
        &self,
        symbol: &Symbol,
        range: ChartRange,
    ) -> Result<Resolved<CandleSeries>, MarketDataError> {
        self.fetch_candles_at(symbol, range, Utc::now().timestamp())
            .await
    }

    /// Candle history for `symbol` over `range`, ending at `now` (Unix seconds).
    pub async fn fetch_candles_at(
        &self,
        symbol: &Symbol,
        range: ChartRange,
        now: i64,
    ) -> Result<Resolved<CandleSeries>, MarketDataError> {
        let window = range.window_ending(now);
        self.resolve(
            Operation::Candles,
            symbol.as_str(),
            |p| p.fetch_candles(symbol, range, window),
            |rows| select_candles(rows, range, window),
        )
        .await
    }

    /// Symbol search. A blank query resolves to no results without touching
    /// any provider. Results are capped at [`MAX_SEARCH_RESULTS`].
    pub async fn search(
        &self,
        query: &str,
    ) -> Result<Resolved<Vec<SearchResult>>, MarketDataError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Resolved {
                data: Vec::new(),
                source: Cow::Borrowed(NO_PROVIDER),
                synthetic: false,
            });
        }

        self.resolve(
            Operation::Search,
            query,
            |p| p.search_symbols(query),
            |mut results: Vec<SearchResult>| {
                results.truncate(MAX_SEARCH_RESULTS);
                Ok(results)
            },
        )
        .await
    }

    /// Walks the chain until one provider yields a result that passes `validate`.
    async fn resolve<'a, R, T, F, V>(
        &'a self,
        operation: Operation,
        subject: &str,
        call: F,
        validate: V,
    ) -> Result<Resolved<T>, MarketDataError>
    where
        F: Fn(&'a dyn MarketDataProvider) -> ProviderCall<'a, R>,
        V: Fn(R) -> Result<T, MarketDataError>,
    {
        let mut failed: Vec<&'static str> = Vec::new();

        for provider in &self.providers {
            let provider_id = provider.id();
            debug!(
                "Trying provider '{}' for {} of '{}'",
                provider_id, operation, subject
            );

            let outcome = call(provider.as_ref()).await.and_then(&validate);

            match outcome {
                Ok(data) => {
                    if provider.is_synthetic() {
                        warn!(
                            "All real providers failed for {} of '{}'; serving synthetic data",
                            operation, subject
                        );
                    } else if !failed.is_empty() {
                        info!(
                            "Provider '{}' answered {} of '{}' after fallback from {:?}",
                            provider_id, operation, subject, failed
                        );
                    }
                    return Ok(Resolved {
                        data,
                        source: Cow::Borrowed(provider_id),
                        synthetic: provider.is_synthetic(),
                    });
                }
                Err(e) if e.is_configuration() => {
                    debug!("Provider '{}' skipped: {}", provider_id, e);
                    failed.push(provider_id);
                }
                Err(e) => {
                    warn!(
                        "Provider '{}' failed {} of '{}': {}",
                        provider_id, operation, subject, e
                    );
                    failed.push(provider_id);
                }
            }
        }

        warn!(
            "All providers failed for {} of '{}' (tried {:?})",
            operation, subject, failed
        );
        Err(MarketDataError::AllProvidersFailed {
            operation: operation.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candle, TimeWindow, DAY_SECONDS};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NOW: i64 = 1_704_067_200;

    /// Scripted provider: each operation either fails with a provider error
    /// or answers with the configured value.
    struct MockProvider {
        id: &'static str,
        priority: u8,
        call_count: AtomicUsize,
        quote: Option<Quote>,
        candles: Option<Vec<Candle>>,
        search: Option<Vec<SearchResult>>,
        missing_key: bool,
    }

    impl MockProvider {
        fn new(id: &'static str, priority: u8) -> Self {
            Self {
                id,
                priority,
                call_count: AtomicUsize::new(0),
                quote: None,
                candles: None,
                search: None,
                missing_key: false,
            }
        }

        fn with_quote(mut self, current: Decimal) -> Self {
            self.quote = Some(quote(current));
            self
        }

        fn with_candles(mut self, rows: Vec<Candle>) -> Self {
            self.candles = Some(rows);
            self
        }

        fn with_search(mut self, results: Vec<SearchResult>) -> Self {
            self.search = Some(results);
            self
        }

        fn without_key(mut self) -> Self {
            self.missing_key = true;
            self
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn answer<T: Clone>(&self, value: &Option<T>) -> Result<T, MarketDataError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.missing_key {
                return Err(MarketDataError::missing_key(self.id, "TEST_API_KEY"));
            }
            value
                .clone()
                .ok_or_else(|| MarketDataError::http(self.id, 500, "HTTP 500"))
        }
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for MockProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        fn priority(&self) -> u8 {
            self.priority
        }

        async fn fetch_quote(&self, _symbol: &Symbol) -> Result<Quote, MarketDataError> {
            self.answer(&self.quote)
        }

        async fn fetch_profile(
            &self,
            _symbol: &Symbol,
        ) -> Result<CompanyProfile, MarketDataError> {
            self.answer(&Some(CompanyProfile::default()))
        }

        async fn fetch_candles(
            &self,
            _symbol: &Symbol,
            _range: ChartRange,
            _window: TimeWindow,
        ) -> Result<Vec<Candle>, MarketDataError> {
            self.answer(&self.candles)
        }

        async fn search_symbols(
            &self,
            _query: &str,
        ) -> Result<Vec<SearchResult>, MarketDataError> {
            self.answer(&self.search)
        }
    }

    fn quote(current: Decimal) -> Quote {
        Quote {
            current,
            open: current,
            high: current,
            low: current,
            previous_close: current,
            as_of: NOW,
        }
    }

    fn candle(timestamp: i64, close: Decimal) -> Candle {
        Candle {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(100),
        }
    }

    fn symbol(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn registry(providers: Vec<Arc<MockProvider>>) -> ProviderRegistry {
        ProviderRegistry::new(
            providers
                .into_iter()
                .map(|p| p as Arc<dyn MarketDataProvider>)
                .collect(),
        )
    }

    #[test]
    fn test_provider_ordering_by_priority() {
        let registry = registry(vec![
            Arc::new(MockProvider::new("LOW", 20)),
            Arc::new(MockProvider::new("HIGH", 1)),
            Arc::new(MockProvider::new("MID", 10)),
        ]);

        let ids: Vec<&str> = registry.providers().iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["HIGH", "MID", "LOW"]);
    }

    #[test]
    fn test_standard_chain_order() {
        let registry = ProviderRegistry::standard(None, None, Duration::from_secs(5));
        let ids: Vec<&str> = registry.providers().iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["FINNHUB", "ALPHA_VANTAGE", "SYNTHETIC"]);
    }

    #[tokio::test]
    async fn test_primary_answer_wins() {
        let primary = Arc::new(MockProvider::new("PRIMARY", 1).with_quote(dec!(150)));
        let secondary = Arc::new(MockProvider::new("SECONDARY", 2).with_quote(dec!(99)));
        let registry = registry(vec![primary.clone(), secondary.clone()]);

        let resolved = registry.fetch_quote(&symbol("AAPL")).await.unwrap();
        assert_eq!(resolved.data.current, dec!(150));
        assert_eq!(resolved.source, "PRIMARY");
        assert!(!resolved.is_synthetic());
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_http_500_falls_back_to_secondary() {
        let primary = Arc::new(MockProvider::new("PRIMARY", 1));
        let secondary = Arc::new(MockProvider::new("SECONDARY", 2).with_quote(dec!(187.76)));
        let registry = registry(vec![primary.clone(), secondary.clone()]);

        let resolved = registry.fetch_quote(&symbol("IBM")).await.unwrap();
        assert_eq!(resolved.data, quote(dec!(187.76)));
        assert_eq!(resolved.source, "SECONDARY");
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_quote_triggers_fallback() {
        let primary = Arc::new(MockProvider::new("PRIMARY", 1).with_quote(dec!(0)));
        let secondary = Arc::new(MockProvider::new("SECONDARY", 2).with_quote(dec!(12.5)));
        let registry = registry(vec![primary, secondary]);

        let resolved = registry.fetch_quote(&symbol("IBM")).await.unwrap();
        assert_eq!(resolved.data.current, dec!(12.5));
    }

    #[tokio::test]
    async fn test_missing_key_degrades_into_fallback() {
        let primary = Arc::new(MockProvider::new("PRIMARY", 1).without_key());
        let secondary = Arc::new(MockProvider::new("SECONDARY", 2).with_quote(dec!(5)));
        let registry = registry(vec![primary, secondary]);

        let resolved = registry.fetch_quote(&symbol("IBM")).await.unwrap();
        assert_eq!(resolved.source, "SECONDARY");
    }

    #[tokio::test]
    async fn test_synthetic_quote_when_everything_fails() {
        let registry = ProviderRegistry::new(vec![
            Arc::new(MockProvider::new("PRIMARY", 1)),
            Arc::new(MockProvider::new("SECONDARY", 2)),
            Arc::new(SyntheticProvider::new()),
        ]);

        let first = registry.fetch_quote(&symbol("ZZZZ")).await.unwrap();
        let second = registry.fetch_quote(&symbol("ZZZZ")).await.unwrap();
        assert!(first.is_synthetic());
        assert_eq!(first.source, "SYNTHETIC");
        assert!(first.data.is_valid());
        assert_eq!(first.data.current, second.data.current);
        assert_eq!(first.data.previous_close, second.data.previous_close);
        assert_eq!(first.data.high, second.data.high);
        assert_eq!(first.data.low, second.data.low);
    }

    #[tokio::test]
    async fn test_all_providers_failed() {
        let registry = registry(vec![
            Arc::new(MockProvider::new("PRIMARY", 1)),
            Arc::new(MockProvider::new("SECONDARY", 2)),
        ]);

        let err = registry.fetch_quote(&symbol("ZZZZ")).await.unwrap_err();
        assert!(matches!(
            err,
            MarketDataError::AllProvidersFailed { ref operation } if operation == "quote"
        ));
    }

    #[tokio::test]
    async fn test_candles_filtered_to_window() {
        let rows = vec![
            candle(NOW - DAY_SECONDS, dec!(3)),
            candle(NOW - 90 * DAY_SECONDS, dec!(1)),
            candle(NOW - 10 * DAY_SECONDS, dec!(2)),
        ];
        let primary = Arc::new(MockProvider::new("PRIMARY", 1).with_candles(rows));
        let registry = registry(vec![primary]);

        let resolved = registry
            .fetch_candles_at(&symbol("AAPL"), ChartRange::OneMonth, NOW)
            .await
            .unwrap();
        assert_eq!(
            resolved.data.timestamps(),
            &[NOW - 10 * DAY_SECONDS, NOW - DAY_SECONDS]
        );
    }

    #[tokio::test]
    async fn test_candles_fall_back_to_last_points() {
        let rows: Vec<Candle> = (0..30)
            .map(|i| candle(NOW - (400 - i) * DAY_SECONDS, Decimal::from(i)))
            .collect();
        let primary = Arc::new(MockProvider::new("PRIMARY", 1).with_candles(rows));
        let registry = registry(vec![primary]);

        let resolved = registry
            .fetch_candles_at(&symbol("AAPL"), ChartRange::OneMonth, NOW)
            .await
            .unwrap();
        assert_eq!(resolved.data.len(), ChartRange::OneMonth.fallback_points());
        assert_eq!(resolved.data.last_close(), Some(dec!(29)));
    }

    #[tokio::test]
    async fn test_empty_candles_move_to_next_provider() {
        let primary = Arc::new(MockProvider::new("PRIMARY", 1).with_candles(Vec::new()));
        let secondary = Arc::new(
            MockProvider::new("SECONDARY", 2).with_candles(vec![candle(NOW - 60, dec!(4))]),
        );
        let registry = registry(vec![primary, secondary]);

        let resolved = registry
            .fetch_candles_at(&symbol("AAPL"), ChartRange::OneDay, NOW)
            .await
            .unwrap();
        assert_eq!(resolved.source, "SECONDARY");
        assert_eq!(resolved.data.len(), 1);
    }

    #[tokio::test]
    async fn test_candles_never_synthetic() {
        let registry = ProviderRegistry::new(vec![
            Arc::new(MockProvider::new("PRIMARY", 1)),
            Arc::new(SyntheticProvider::new()),
        ]);

        let err = registry
            .fetch_candles_at(&symbol("AAPL"), ChartRange::OneYear, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::AllProvidersFailed { .. }));
    }

    #[tokio::test]
    async fn test_empty_search_result_is_valid() {
        let primary = Arc::new(MockProvider::new("PRIMARY", 1).with_search(Vec::new()));
        let secondary = Arc::new(
            MockProvider::new("SECONDARY", 2).with_search(vec![SearchResult::new("X", "X")]),
        );
        let registry = registry(vec![primary, secondary.clone()]);

        let resolved = registry.search("nothing").await.unwrap();
        assert!(resolved.data.is_empty());
        assert_eq!(resolved.source, "PRIMARY");
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_search_skips_providers() {
        let primary = Arc::new(MockProvider::new("PRIMARY", 1).with_search(Vec::new()));
        let registry = registry(vec![primary.clone()]);

        let resolved = registry.search("   ").await.unwrap();
        assert!(resolved.data.is_empty());
        assert_eq!(primary.calls(), 0);
    }

    #[tokio::test]
    async fn test_search_truncated() {
        let many: Vec<SearchResult> = (0..20)
            .map(|i| SearchResult::new(format!("S{i}"), "desc"))
            .collect();
        let primary = Arc::new(MockProvider::new("PRIMARY", 1).with_search(many));
        let registry = registry(vec![primary]);

        let resolved = registry.search("s").await.unwrap();
        assert_eq!(resolved.data.len(), MAX_SEARCH_RESULTS);
        assert_eq!(resolved.data[0].symbol, "S0");
    }

    #[tokio::test]
    async fn test_profile_falls_back_to_placeholder() {
        let registry = ProviderRegistry::new(vec![
            Arc::new(MockProvider::new("PRIMARY", 1).without_key()),
            Arc::new(SyntheticProvider::new()),
        ]);

        let resolved = registry.fetch_profile(&symbol("MSFT")).await.unwrap();
        assert!(resolved.is_synthetic());
        assert_eq!(resolved.data.ticker.as_deref(), Some("MSFT"));
    }
}
