//! Deterministic last-resort provider.
//!
//! Derives a plausible quote from a hash of the symbol so the read path always
//! has something to show, even with no working upstream. Results from this
//! provider are tagged through [`MarketDataProvider::is_synthetic`] and never
//! reach the canonical models themselves.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::errors::MarketDataError;
use crate::models::{Candle, ChartRange, CompanyProfile, Quote, SearchResult, Symbol, TimeWindow};
use crate::provider::MarketDataProvider;

const PROVIDER_ID: &str = "SYNTHETIC";

/// Name shown on the placeholder profile.
pub const PLACEHOLDER_COMPANY_NAME: &str = "Company data unavailable";

/// Last link of the fallback chain. Never fails for quotes or profiles.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntheticProvider;

impl SyntheticProvider {
    pub fn new() -> Self {
        Self
    }

    /// Builds the synthetic quote for `symbol` stamped with `now`.
    ///
    /// Same symbol, same prices: only `as_of` depends on the clock.
    pub fn quote_at(symbol: &Symbol, now: i64) -> Quote {
        let seed = Decimal::from(seed(symbol.as_str()));
        let rem = |m: i64| seed % Decimal::from(m);

        let base = Decimal::from(80) + rem(420);
        let offset = (rem(11) - Decimal::from(5)) * Decimal::new(37, 2);
        let current = (base + offset).round_dp(2);
        let previous = (current - (rem(7) - Decimal::from(3)) * Decimal::new(28, 2)).round_dp(2);
        let spread = Decimal::new(12, 1);

        Quote {
            current,
            open: previous,
            high: (current.max(previous) + spread).round_dp(2),
            low: (current.min(previous) - spread).round_dp(2),
            previous_close: previous,
            as_of: now,
        }
    }

    /// Placeholder profile carrying the requested ticker.
    pub fn placeholder_profile(symbol: &Symbol) -> CompanyProfile {
        CompanyProfile {
            name: Some(PLACEHOLDER_COMPANY_NAME.to_string()),
            ticker: Some(symbol.to_string()),
            ..CompanyProfile::default()
        }
    }
}

/// 32-bit string hash (`h = h * 31 + unit`, wrapping) over UTF-16 code units.
fn string_hash(value: &str) -> i32 {
    value
        .encode_utf16()
        .fold(0i32, |hash, unit| {
            hash.wrapping_shl(5)
                .wrapping_sub(hash)
                .wrapping_add(i32::from(unit))
        })
}

fn seed(value: &str) -> i64 {
    i64::from(string_hash(value)).abs()
}

#[async_trait]
impl MarketDataProvider for SyntheticProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        u8::MAX
    }

    fn is_synthetic(&self) -> bool {
        true
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, MarketDataError> {
        Ok(Self::quote_at(symbol, Utc::now().timestamp()))
    }

    async fn fetch_profile(&self, symbol: &Symbol) -> Result<CompanyProfile, MarketDataError> {
        Ok(Self::placeholder_profile(symbol))
    }

    async fn fetch_candles(
        &self,
        _symbol: &Symbol,
        _range: ChartRange,
        _window: TimeWindow,
    ) -> Result<Vec<Candle>, MarketDataError> {
        // A fabricated chart would be indistinguishable from a real one.
        Err(MarketDataError::NoDataForRange)
    }

    async fn search_symbols(&self, _query: &str) -> Result<Vec<SearchResult>, MarketDataError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn symbol(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    #[test]
    fn test_string_hash() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("A"), 65);
        assert_eq!(string_hash("AB"), 65 * 31 + 66);
        // Long inputs wrap instead of overflowing.
        let _ = string_hash(&"Z".repeat(64));
    }

    #[test]
    fn test_known_quote_for_aapl() {
        assert_eq!(seed("AAPL"), 2_001_436);
        let q = SyntheticProvider::quote_at(&symbol("AAPL"), 42);

        // base 216, offset (8 - 5) * 0.37, previous shift (3 - 3) * 0.28
        assert_eq!(q.current, dec!(217.11));
        assert_eq!(q.previous_close, dec!(217.11));
        assert_eq!(q.open, dec!(217.11));
        assert_eq!(q.high, dec!(218.31));
        assert_eq!(q.low, dec!(215.91));
        assert_eq!(q.as_of, 42);
    }

    #[test]
    fn test_quote_is_deterministic_and_valid() {
        let a = SyntheticProvider::quote_at(&symbol("ZZZZ"), 100);
        let b = SyntheticProvider::quote_at(&symbol("ZZZZ"), 100);
        assert_eq!(a, b);
        assert!(a.is_valid());

        let other = SyntheticProvider::quote_at(&symbol("MSFT"), 100);
        assert_ne!(a.current, other.current);
    }

    #[test]
    fn test_quote_always_positive() {
        for s in ["A", "ZZZZZZZZZZZZ", "BRK.B", "X", "QQQQQQQQQQQQQQQQQQQQ"] {
            assert!(SyntheticProvider::quote_at(&symbol(s), 0).is_valid(), "{s}");
        }
    }

    #[tokio::test]
    async fn test_provider_contract() {
        let provider = SyntheticProvider::new();
        assert!(provider.is_synthetic());
        assert_eq!(provider.priority(), u8::MAX);

        let sym = symbol("ZZZZ");
        let profile = provider.fetch_profile(&sym).await.unwrap();
        assert_eq!(profile.ticker.as_deref(), Some("ZZZZ"));
        assert_eq!(profile.name.as_deref(), Some(PLACEHOLDER_COMPANY_NAME));

        let window = ChartRange::OneMonth.window_ending(1_704_067_200);
        let err = provider
            .fetch_candles(&sym, ChartRange::OneMonth, window)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::NoDataForRange));

        assert!(provider.search_symbols("zz").await.unwrap().is_empty());
    }
}
