//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - Concrete provider implementations (Finnhub, Alpha Vantage, Synthetic)
//!
//! # Architecture
//!
//! Each provider owns its request-parameter encoding and its response
//! decoding. Every provider response shape has its own private serde type and
//! an explicit mapping function into the canonical models; nothing downstream
//! inspects provider JSON.
//!
//! Providers never swallow errors. Deciding whether a failure moves on to the
//! next provider is the registry's job.

mod traits;

pub mod alpha_vantage;
pub mod finnhub;
pub mod synthetic;

pub use traits::MarketDataProvider;
