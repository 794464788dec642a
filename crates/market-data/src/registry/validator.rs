//! Validity rules applied to provider results before the registry accepts them.
//!
//! A result that fails these rules counts as a provider failure and moves the
//! request on to the next provider:
//! - Quotes need a current price strictly above zero
//! - Candles need at least one row, trimmed to the requested window
//! - Profiles and search results are always valid, even when empty

use log::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{Candle, CandleSeries, ChartRange, Quote, TimeWindow};

/// Accepts a quote whose current price is usable.
///
/// Non-finite prices never get this far: they fail `Decimal` conversion
/// while the provider payload is decoded.
pub fn validate_quote(quote: Quote) -> Result<Quote, MarketDataError> {
    if !quote.is_valid() {
        return Err(MarketDataError::ValidationFailed {
            message: format!("Quote price must be positive, got {}", quote.current),
        });
    }

    if quote.high < quote.low {
        // Soft issue only; the dashboard still shows the price.
        warn!("Quote has high ({}) below low ({})", quote.high, quote.low);
    }

    Ok(quote)
}

/// Trims raw provider rows to `window`.
///
/// When nothing falls inside the window but the provider did return history,
/// the most recent [`ChartRange::fallback_points`] rows are used instead.
/// No rows at all is [`MarketDataError::NoDataForRange`].
pub fn select_candles(
    rows: Vec<Candle>,
    range: ChartRange,
    window: TimeWindow,
) -> Result<CandleSeries, MarketDataError> {
    if rows.is_empty() {
        return Err(MarketDataError::NoDataForRange);
    }

    // Sorted and de-duplicated once, so both branches see the same ordering.
    let history: Vec<Candle> = CandleSeries::from_candles(rows).candles().collect();

    let in_window: Vec<Candle> = history
        .iter()
        .filter(|c| window.contains(c.timestamp))
        .cloned()
        .collect();

    if !in_window.is_empty() {
        return Ok(CandleSeries::from_candles(in_window));
    }

    let keep = range.fallback_points();
    debug!(
        "No rows inside the {} window; using the last {} of {} rows",
        range,
        keep.min(history.len()),
        history.len()
    );
    let tail = history[history.len().saturating_sub(keep)..].to_vec();
    Ok(CandleSeries::from_candles(tail))
}
