//! Market data models
//!
//! This module contains the canonical data shapes every provider maps into:
//! - `types` - Type aliases for common identifiers (ProviderId)
//! - `symbol` - Normalized ticker symbol (Symbol)
//! - `quote` - Point-in-time price snapshot (Quote)
//! - `profile` - Company profile data (CompanyProfile)
//! - `candles` - Candle history and chart points (Candle, CandleSeries, ChartPoint)
//! - `range` - Chart ranges and their request windows (ChartRange, TimeWindow)
//! - `search` - Search result data (SearchResult)

mod candles;
mod profile;
mod quote;
mod range;
mod search;
mod symbol;
mod types;

pub use candles::{Candle, CandleSeries, CandleStatus, ChartPoint};
pub use profile::CompanyProfile;
pub use quote::Quote;
pub use range::{ChartRange, ParseRangeError, TimeWindow, DAY_SECONDS};
pub use search::{SearchResult, MAX_SEARCH_RESULTS};
pub use symbol::Symbol;
pub use types::ProviderId;
