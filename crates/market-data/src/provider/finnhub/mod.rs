//! Finnhub client, the primary provider.
//!
//! | Operation | Endpoint |
//! |---|---|
//! | quote | `/quote` |
//! | profile | `/stock/profile2` |
//! | candles | `/stock/candle` (resolution per [`ChartRange::resolution`]) |
//! | search | `/search`, common stock only |
//!
//! The free tier allows 60 calls per minute.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{Candle, ChartRange, CompanyProfile, Quote, SearchResult, Symbol, TimeWindow};
use crate::provider::MarketDataProvider;

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER_ID: &str = "FINNHUB";

/// Environment variable that carries the API key.
pub const API_KEY_ENV: &str = "FINNHUB_API_KEY";

/// Security type kept by symbol search.
const SEARCH_SECURITY_TYPE: &str = "Common Stock";

// ============================================================================
// Wire shapes
// ============================================================================

/// `/quote` body. Unknown symbols come back with every price at zero.
#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    #[serde(rename = "c")]
    current: Option<f64>,
    #[serde(rename = "o")]
    open: Option<f64>,
    #[serde(rename = "h")]
    high: Option<f64>,
    #[serde(rename = "l")]
    low: Option<f64>,
    #[serde(rename = "pc")]
    previous_close: Option<f64>,
    #[serde(rename = "t")]
    timestamp: Option<i64>,
}

/// `/stock/candle` body: parallel arrays plus a status flag (`ok` / `no_data`).
#[derive(Debug, Deserialize)]
struct FinnhubCandles {
    #[serde(rename = "s")]
    status: String,
    #[serde(rename = "t", default)]
    timestamps: Vec<i64>,
    #[serde(rename = "o", default)]
    opens: Vec<f64>,
    #[serde(rename = "h", default)]
    highs: Vec<f64>,
    #[serde(rename = "l", default)]
    lows: Vec<f64>,
    #[serde(rename = "c", default)]
    closes: Vec<f64>,
    #[serde(rename = "v", default)]
    volumes: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct FinnhubSearch {
    #[serde(rename = "result", default)]
    hits: Vec<FinnhubSearchHit>,
}

#[derive(Debug, Deserialize)]
struct FinnhubSearchHit {
    symbol: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type", default)]
    kind: String,
}

/// `/stock/profile2` body; `{}` for symbols Finnhub does not cover.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinnhubProfile {
    name: Option<String>,
    ticker: Option<String>,
    exchange: Option<String>,
    country: Option<String>,
    /// Millions of USD
    market_capitalization: Option<f64>,
    finnhub_industry: Option<String>,
    ipo: Option<String>,
    weburl: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FinnhubErrorBody {
    error: String,
}

// ============================================================================
// FinnhubProvider
// ============================================================================

/// Finnhub market data provider, the primary source.
pub struct FinnhubProvider {
    client: Client,
    api_key: Option<String>,
}

impl FinnhubProvider {
    /// Create a new Finnhub provider.
    ///
    /// A missing or blank key is accepted; every request then fails with
    /// [`MarketDataError::Configuration`] so the registry can fall back.
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

    /// GET `endpoint` and return the raw body of a successful response.
    async fn fetch(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, MarketDataError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(MarketDataError::missing_key(PROVIDER_ID, API_KEY_ENV));
        };

        debug!("Finnhub GET {} ({} params)", endpoint, params.len());

        // The key travels as a header, never in the query string
        let response = self
            .client
            .get(format!("{}{}", BASE_URL, endpoint))
            .header("X-Finnhub-Token", api_key)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MarketDataError::Timeout {
                        provider: PROVIDER_ID.to_string(),
                    }
                } else {
                    MarketDataError::provider(PROVIDER_ID, format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        match status {
            StatusCode::TOO_MANY_REQUESTS => Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(MarketDataError::http(
                PROVIDER_ID,
                status.as_u16(),
                "API key rejected",
            )),
            s if s.is_success() => response.text().await.map_err(|e| {
                MarketDataError::provider(PROVIDER_ID, format!("Unreadable body: {}", e))
            }),
            _ => {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<FinnhubErrorBody>(&body)
                    .map(|b| b.error)
                    .unwrap_or_else(|_| format!("HTTP {}", status));
                Err(MarketDataError::http(PROVIDER_ID, status.as_u16(), message))
            }
        }
    }
}

// ============================================================================
// MarketDataProvider Implementation
// ============================================================================

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        1
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, MarketDataError> {
        debug!("Finnhub quote for {}", symbol);
        let text = self.fetch("/quote", &[("symbol", symbol.as_str())]).await?;
        parse_quote(&text, Utc::now().timestamp())
    }

    async fn fetch_profile(&self, symbol: &Symbol) -> Result<CompanyProfile, MarketDataError> {
        debug!("Finnhub profile for {}", symbol);
        let text = self
            .fetch("/stock/profile2", &[("symbol", symbol.as_str())])
            .await?;
        parse_profile(&text)
    }

    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        range: ChartRange,
        window: TimeWindow,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let from = window.from.to_string();
        let to = window.to.to_string();
        let params = [
            ("symbol", symbol.as_str()),
            ("resolution", range.resolution()),
            ("from", from.as_str()),
            ("to", to.as_str()),
        ];

        debug!(
            "Fetching {} candles for {} from Finnhub (resolution {})",
            range,
            symbol,
            range.resolution()
        );

        let text = self.fetch("/stock/candle", &params).await?;
        parse_candles(&text)
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SearchResult>, MarketDataError> {
        let text = self.fetch("/search", &[("q", query)]).await?;
        let results = parse_search(&text)?;
        debug!("Finnhub search '{}' -> {} common stock hits", query, results.len());
        Ok(results)
    }
}

// ============================================================================
// Response mapping
// ============================================================================

fn parse_error(what: &str, e: serde_json::Error) -> MarketDataError {
    MarketDataError::provider(PROVIDER_ID, format!("Failed to parse {} response: {}", what, e))
}

/// Finite f64 to Decimal; NaN and infinities have no Decimal form.
fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::try_from(value).ok()
}

/// Secondary fields fall back to the current price when missing or not positive.
fn positive_or(value: Option<f64>, fallback: Decimal) -> Decimal {
    value
        .and_then(to_decimal)
        .filter(|d| *d > Decimal::ZERO)
        .unwrap_or(fallback)
}

fn parse_quote(text: &str, now: i64) -> Result<Quote, MarketDataError> {
    let raw: FinnhubQuote = serde_json::from_str(text).map_err(|e| parse_error("quote", e))?;

    let Some(current) = raw.current.and_then(to_decimal) else {
        return Err(MarketDataError::ValidationFailed {
            message: format!("Finnhub quote has no finite current price: {:?}", raw.current),
        });
    };

    Ok(Quote {
        current,
        open: positive_or(raw.open, current),
        high: positive_or(raw.high, current),
        low: positive_or(raw.low, current),
        previous_close: positive_or(raw.previous_close, current),
        as_of: raw.timestamp.filter(|t| *t > 0).unwrap_or(now),
    })
}

fn parse_candles(text: &str) -> Result<Vec<Candle>, MarketDataError> {
    let raw: FinnhubCandles = serde_json::from_str(text).map_err(|e| parse_error("candle", e))?;

    match raw.status.as_str() {
        "ok" => {}
        "no_data" => return Err(MarketDataError::NoDataForRange),
        other => {
            return Err(MarketDataError::provider(
                PROVIDER_ID,
                format!("Unexpected candle status: {}", other),
            ))
        }
    }

    let rows = raw.timestamps.len();
    let aligned = [raw.opens.len(), raw.highs.len(), raw.lows.len(), raw.closes.len()]
        .iter()
        .all(|&n| n == rows);
    // Volume is optional, but when present it must line up too
    if !aligned || !(raw.volumes.is_empty() || raw.volumes.len() == rows) {
        return Err(MarketDataError::ValidationFailed {
            message: format!("Finnhub candle arrays are misaligned ({} timestamps)", rows),
        });
    }

    let candles = raw
        .timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &timestamp)| {
            let prices = (
                to_decimal(raw.opens[i]),
                to_decimal(raw.highs[i]),
                to_decimal(raw.lows[i]),
                to_decimal(raw.closes[i]),
            );
            let (Some(open), Some(high), Some(low), Some(close)) = prices else {
                warn!("Skipping non-finite Finnhub candle at {}", timestamp);
                return None;
            };
            Some(Candle {
                timestamp,
                open,
                high,
                low,
                close,
                volume: raw
                    .volumes
                    .get(i)
                    .copied()
                    .and_then(to_decimal)
                    .unwrap_or(Decimal::ZERO),
            })
        })
        .collect();

    Ok(candles)
}

fn parse_profile(text: &str) -> Result<CompanyProfile, MarketDataError> {
    let raw: FinnhubProfile = serde_json::from_str(text).map_err(|e| parse_error("profile", e))?;

    Ok(CompanyProfile {
        name: raw.name,
        ticker: raw.ticker,
        exchange: raw.exchange,
        country: raw.country,
        market_capitalization: raw.market_capitalization.filter(|v| v.is_finite()),
        industry: raw.finnhub_industry,
        ipo_date: raw.ipo,
        website: raw.weburl,
    })
}

fn parse_search(text: &str) -> Result<Vec<SearchResult>, MarketDataError> {
    let raw: FinnhubSearch = serde_json::from_str(text).map_err(|e| parse_error("search", e))?;

    Ok(raw
        .hits
        .into_iter()
        .filter(|hit| hit.kind == SEARCH_SECURITY_TYPE)
        .map(|hit| SearchResult::new(hit.symbol, hit.description))
        .collect())
}

// ============================================================================
// Tests
// ============================================================================
