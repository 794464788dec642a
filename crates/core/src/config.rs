//! Application configuration.
//!
//! [`AppConfig`] is built once at startup and handed to the orchestrator; no
//! module reads the environment on its own.

use std::path::PathBuf;
use std::time::Duration;

use log::warn;
use stockdash_market_data::provider::{alpha_vantage, finnhub};
use stockdash_market_data::{ChartRange, ProviderRegistry, Symbol};

use crate::constants::DEFAULT_SYMBOL;
use crate::errors::{Error, Result};

pub const QUOTE_POLL_SECS_ENV: &str = "STOCKDASH_QUOTE_POLL_SECS";
pub const WATCHLIST_POLL_SECS_ENV: &str = "STOCKDASH_WATCHLIST_POLL_SECS";
pub const SEARCH_DEBOUNCE_MS_ENV: &str = "STOCKDASH_SEARCH_DEBOUNCE_MS";
pub const REQUEST_TIMEOUT_SECS_ENV: &str = "STOCKDASH_REQUEST_TIMEOUT_SECS";
pub const STORAGE_PATH_ENV: &str = "STOCKDASH_STORAGE_PATH";

const DEFAULT_QUOTE_POLL_SECS: u64 = 15;
const DEFAULT_WATCHLIST_POLL_SECS: u64 = 30;
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STORAGE_PATH: &str = "./stockdash-storage.json";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub finnhub_api_key: Option<String>,
    pub alpha_vantage_api_key: Option<String>,
    pub quote_poll_interval: Duration,
    pub watchlist_poll_interval: Duration,
    pub search_debounce: Duration,
    pub request_timeout: Duration,
    pub storage_path: PathBuf,
    pub default_symbol: Symbol,
    pub default_range: ChartRange,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            finnhub_api_key: None,
            alpha_vantage_api_key: None,
            quote_poll_interval: Duration::from_secs(DEFAULT_QUOTE_POLL_SECS),
            watchlist_poll_interval: Duration::from_secs(DEFAULT_WATCHLIST_POLL_SECS),
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            default_symbol: Symbol::from_static(DEFAULT_SYMBOL),
            default_range: ChartRange::default(),
        }
    }
}

impl AppConfig {
    /// Reads the configuration from the process environment, loading `.env`
    /// first when one exists.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any name → value lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let number = |name: &str, default: u64| -> u64 {
            match key(name) {
                None => default,
                Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                    warn!("Ignoring invalid {}={:?}, using {}", name, raw, default);
                    default
                }),
            }
        };

        let defaults = Self::default();
        Self {
            finnhub_api_key: key(finnhub::API_KEY_ENV).map(|v| v.trim().to_string()),
            alpha_vantage_api_key: key(alpha_vantage::API_KEY_ENV).map(|v| v.trim().to_string()),
            quote_poll_interval: Duration::from_secs(number(
                QUOTE_POLL_SECS_ENV,
                DEFAULT_QUOTE_POLL_SECS,
            )),
            watchlist_poll_interval: Duration::from_secs(number(
                WATCHLIST_POLL_SECS_ENV,
                DEFAULT_WATCHLIST_POLL_SECS,
            )),
            search_debounce: Duration::from_millis(number(
                SEARCH_DEBOUNCE_MS_ENV,
                DEFAULT_SEARCH_DEBOUNCE_MS,
            )),
            request_timeout: Duration::from_secs(number(
                REQUEST_TIMEOUT_SECS_ENV,
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            storage_path: key(STORAGE_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_path),
            ..defaults
        }
    }

    /// Rejects settings the schedulers cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.quote_poll_interval.is_zero() {
            return Err(Error::InvalidConfigValue(format!(
                "{} must be greater than zero",
                QUOTE_POLL_SECS_ENV
            )));
        }
        if self.watchlist_poll_interval.is_zero() {
            return Err(Error::InvalidConfigValue(format!(
                "{} must be greater than zero",
                WATCHLIST_POLL_SECS_ENV
            )));
        }
        Ok(())
    }

    /// The standard provider chain built from the configured keys.
    pub fn build_registry(&self) -> ProviderRegistry {
        ProviderRegistry::standard(
            self.finnhub_api_key.clone(),
            self.alpha_vantage_api_key.clone(),
            self.request_timeout,
        )
    }
}
