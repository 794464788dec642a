//! Provider registry module.
//!
//! This module provides orchestration for market data providers, including:
//! - Provider registration and priority ordering
//! - Fallback through the chain on provider failure
//! - Result validation (quote price, candle window trimming)

mod provider_registry;
mod validator;

pub use provider_registry::{Operation, ProviderRegistry, Resolved};
pub use validator::{select_candles, validate_quote};
