use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Point-in-time price snapshot for one symbol.
///
/// The provider that produced the quote is not part of the canonical shape;
/// the registry reports it separately through [`crate::Resolved`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Current/last price
    pub current: Decimal,

    /// Opening price of the session
    pub open: Decimal,

    /// Session high
    pub high: Decimal,

    /// Session low
    pub low: Decimal,

    /// Previous session close
    pub previous_close: Decimal,

    /// Unix timestamp (seconds) the quote refers to
    pub as_of: i64,
}

impl Quote {
    /// A quote is usable only when its current price is strictly positive.
    ///
    /// Non-finite prices cannot be represented as `Decimal`, so they are
    /// rejected earlier while decoding the provider payload.
    pub fn is_valid(&self) -> bool {
        self.current > Decimal::ZERO
    }

    /// Absolute change against the previous close.
    pub fn change(&self) -> Decimal {
        self.current - self.previous_close
    }

    /// Percent change against the previous close, `None` when there is no
    /// usable previous close.
    pub fn change_percent(&self) -> Option<Decimal> {
        if self.previous_close <= Decimal::ZERO {
            return None;
        }
        Some((self.change() / self.previous_close) * Decimal::ONE_HUNDRED)
    }
}
