//! Alpha Vantage market data provider implementation.
//!
//! This module provides market data from Alpha Vantage API:
//! - Latest quotes via GLOBAL_QUOTE
//! - Candles via TIME_SERIES_DAILY (TIME_SERIES_WEEKLY for the one-year range)
//! - Company profiles via OVERVIEW
//! - Symbol search via SYMBOL_SEARCH
//!
//! Note: Alpha Vantage free tier is limited to 5 API calls per minute, and it
//! reports throttling inside a 200 response rather than with HTTP 429.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::MarketDataError;
use crate::models::{Candle, ChartRange, CompanyProfile, Quote, SearchResult, Symbol, TimeWindow};
use crate::provider::MarketDataProvider;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";

/// Environment variable that carries the API key.
pub const API_KEY_ENV: &str = "ALPHA_VANTAGE_API_KEY";

/// Match type kept by symbol search.
const SEARCH_SECURITY_TYPE: &str = "Equity";

/// Alpha Vantage market data provider, the secondary source.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: Option<String>,
}

// ============================================================================
// Response structures for Alpha Vantage API
// ============================================================================

/// API-level error fields shared by every response.
#[derive(Debug, Default, Deserialize)]
struct ApiNotice {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

/// GLOBAL_QUOTE response
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(flatten)]
    notice: ApiNotice,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "02. open")]
    open: Option<String>,
    #[serde(rename = "03. high")]
    high: Option<String>,
    #[serde(rename = "04. low")]
    low: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "08. previous close")]
    previous_close: Option<String>,
}

/// TIME_SERIES_DAILY / TIME_SERIES_WEEKLY response. The series lives under a
/// different key for each function; both are mapped here.
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    daily: Option<HashMap<String, SeriesBar>>,
    #[serde(rename = "Weekly Time Series")]
    weekly: Option<HashMap<String, SeriesBar>>,
    #[serde(flatten)]
    notice: ApiNotice,
}

#[derive(Debug, Deserialize)]
struct SeriesBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume", default)]
    volume: Option<String>,
}

/// OVERVIEW response for company fundamentals.
/// Only includes fields that map to CompanyProfile; the API returns many more.
#[derive(Debug, Deserialize)]
struct CompanyOverviewResponse {
    #[serde(rename = "Symbol")]
    symbol: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Exchange")]
    exchange: Option<String>,
    #[serde(rename = "Country")]
    country: Option<String>,
    #[serde(rename = "Industry")]
    industry: Option<String>,
    #[serde(rename = "MarketCapitalization")]
    market_capitalization: Option<String>,
    #[serde(rename = "OfficialSite")]
    official_site: Option<String>,
    #[serde(flatten)]
    notice: ApiNotice,
}

/// SYMBOL_SEARCH response
#[derive(Debug, Deserialize)]
struct SymbolSearchResponse {
    #[serde(rename = "bestMatches", default)]
    best_matches: Vec<SymbolMatch>,
    #[serde(flatten)]
    notice: ApiNotice,
}

#[derive(Debug, Deserialize)]
struct SymbolMatch {
    #[serde(rename = "1. symbol")]
    symbol: String,
    #[serde(rename = "2. name", default)]
    name: String,
    #[serde(rename = "3. type", default)]
    match_type: String,
}

impl ApiNotice {
    /// Check for API-level errors in the response.
    fn check(&self) -> Result<(), MarketDataError> {
        if let Some(ref msg) = self.error_message {
            if msg.contains("Invalid API call") || msg.contains("not found") {
                return Err(MarketDataError::SymbolNotFound(msg.clone()));
            }
            return Err(MarketDataError::provider(PROVIDER_ID, msg.clone()));
        }

        // "Note" and "Information" usually indicate rate limiting
        for msg in [&self.note, &self.information].into_iter().flatten() {
            if msg.contains("API call frequency")
                || msg.contains("rate limit")
                || msg.contains("requests per day")
            {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                });
            }
            warn!("Alpha Vantage notice: {}", msg);
        }

        Ok(())
    }
}

impl CompanyOverviewResponse {
    /// Parse a string field as f64, handling "None" and "-" values
    fn parse_f64(s: &Option<String>) -> Option<f64> {
        s.as_ref()
            .filter(|v| !v.is_empty() && *v != "None" && *v != "-")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    fn text(s: Option<String>) -> Option<String> {
        s.filter(|v| !v.is_empty() && v != "None" && v != "-")
    }

    fn into_profile(self) -> CompanyProfile {
        CompanyProfile {
            market_capitalization: Self::parse_f64(&self.market_capitalization)
                .map(|cap| cap / 1_000_000.0), // absolute value, profile carries millions
            name: Self::text(self.name),
            ticker: Self::text(self.symbol),
            exchange: Self::text(self.exchange),
            country: Self::text(self.country),
            industry: Self::text(self.industry),
            ipo_date: None,
            website: Self::text(self.official_site),
        }
    }
}

// ============================================================================
// AlphaVantageProvider implementation
// ============================================================================

impl AlphaVantageProvider {
    /// Create a new Alpha Vantage provider.
    ///
    /// A missing or blank key is accepted; every request then fails with
    /// [`MarketDataError::Configuration`].
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_timeout(api_key, Duration::from_secs(30))
    }

    pub fn with_timeout(api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Make a request to the Alpha Vantage API.
    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| MarketDataError::missing_key(PROVIDER_ID, API_KEY_ENV))?;

        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", api_key));

        let url = reqwest::Url::parse_with_params(BASE_URL, &all_params).map_err(|e| {
            MarketDataError::provider(PROVIDER_ID, format!("Failed to build URL: {}", e))
        })?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(api_key, "***")
        );

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::provider(PROVIDER_ID, e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            return Err(MarketDataError::http(
                PROVIDER_ID,
                status.as_u16(),
                format!("Alpha Vantage request failed with status {}", status),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| MarketDataError::provider(PROVIDER_ID, e.to_string()))
    }
}

// ============================================================================
// MarketDataProvider trait implementation
// ============================================================================

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        2
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, MarketDataError> {
        debug!("Fetching latest quote for {} from Alpha Vantage", symbol);
        let params = [("function", "GLOBAL_QUOTE"), ("symbol", symbol.as_str())];
        let text = self.fetch(&params).await?;
        parse_global_quote(&text, Utc::now().timestamp())
    }

    async fn fetch_profile(&self, symbol: &Symbol) -> Result<CompanyProfile, MarketDataError> {
        debug!("Fetching company overview for {} from Alpha Vantage", symbol);
        let params = [("function", "OVERVIEW"), ("symbol", symbol.as_str())];
        let text = self.fetch(&params).await?;
        parse_overview(&text)
    }

    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        range: ChartRange,
        _window: TimeWindow,
    ) -> Result<Vec<Candle>, MarketDataError> {
        // No window parameters on these endpoints; the registry trims the rows.
        let text = if range == ChartRange::OneYear {
            let params = [("function", "TIME_SERIES_WEEKLY"), ("symbol", symbol.as_str())];
            self.fetch(&params).await?
        } else {
            let params = [
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol.as_str()),
                ("outputsize", "compact"), // 'full' is premium-only
            ];
            self.fetch(&params).await?
        };

        let candles = parse_time_series(&text)?;

        debug!(
            "Alpha Vantage: fetched {} {} rows for {}",
            candles.len(),
            range,
            symbol
        );

        Ok(candles)
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SearchResult>, MarketDataError> {
        debug!("Searching Alpha Vantage for '{}'", query);
        let params = [("function", "SYMBOL_SEARCH"), ("keywords", query)];
        let text = self.fetch(&params).await?;
        parse_symbol_search(&text)
    }
}

// ============================================================================
// Response mapping
// ============================================================================

fn parse_error(what: &str, e: serde_json::Error) -> MarketDataError {
    MarketDataError::provider(PROVIDER_ID, format!("Failed to parse {} response: {}", what, e))
}

/// Parse a decimal value from a string.
fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s.trim()).ok()
}

/// Parse a row label: `YYYY-MM-DD` (midnight UTC) or `YYYY-MM-DD HH:MM:SS` (UTC).
fn parse_timestamp(label: &str) -> Option<i64> {
    let label = label.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(label, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp());
    }
    NaiveDate::parse_from_str(label, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

fn parse_global_quote(text: &str, now: i64) -> Result<Quote, MarketDataError> {
    let response: GlobalQuoteResponse =
        serde_json::from_str(text).map_err(|e| parse_error("quote", e))?;
    response.notice.check()?;

    let quote = response.global_quote.ok_or_else(|| {
        MarketDataError::provider(PROVIDER_ID, "Missing Alpha Vantage quote payload")
    })?;

    let positive = |value: &Option<String>| {
        value
            .as_deref()
            .and_then(parse_decimal)
            .filter(|d| *d > Decimal::ZERO)
    };

    let current = positive(&quote.price).ok_or_else(|| MarketDataError::ValidationFailed {
        message: format!("Invalid Alpha Vantage quote price: {:?}", quote.price),
    })?;

    Ok(Quote {
        current,
        open: positive(&quote.open).unwrap_or(current),
        high: positive(&quote.high).unwrap_or(current),
        low: positive(&quote.low).unwrap_or(current),
        previous_close: positive(&quote.previous_close).unwrap_or(current),
        as_of: now,
    })
}

fn parse_time_series(text: &str) -> Result<Vec<Candle>, MarketDataError> {
    let response: TimeSeriesResponse =
        serde_json::from_str(text).map_err(|e| parse_error("time series", e))?;
    response.notice.check()?;

    let series = response.daily.or(response.weekly).ok_or_else(|| {
        MarketDataError::provider(PROVIDER_ID, "Alpha Vantage returned no usable historical series")
    })?;

    let mut candles: Vec<Candle> = series
        .into_iter()
        .filter_map(|(label, bar)| {
            Some(Candle {
                timestamp: parse_timestamp(&label)?,
                open: parse_decimal(&bar.open)?,
                high: parse_decimal(&bar.high)?,
                low: parse_decimal(&bar.low)?,
                close: parse_decimal(&bar.close)?,
                volume: bar
                    .volume
                    .as_deref()
                    .and_then(parse_decimal)
                    .unwrap_or(Decimal::ZERO),
            })
        })
        .collect();

    // Sort by timestamp ascending
    candles.sort_by_key(|c| c.timestamp);

    Ok(candles)
}

fn parse_overview(text: &str) -> Result<CompanyProfile, MarketDataError> {
    let response: CompanyOverviewResponse =
        serde_json::from_str(text).map_err(|e| parse_error("company overview", e))?;
    response.notice.check()?;

    // Unknown symbols come back as `{}`, which maps to an empty profile.
    Ok(response.into_profile())
}

fn parse_symbol_search(text: &str) -> Result<Vec<SearchResult>, MarketDataError> {
    let response: SymbolSearchResponse =
        serde_json::from_str(text).map_err(|e| parse_error("symbol search", e))?;
    response.notice.check()?;

    Ok(response
        .best_matches
        .into_iter()
        .filter(|m| m.match_type == SEARCH_SECURITY_TYPE)
        .map(|m| SearchResult::new(m.symbol, m.name))
        .collect())
}
