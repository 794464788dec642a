use serde::{Deserialize, Serialize};

/// Company profile data from market data providers.
///
/// Every field is optional; an all-`None` profile is a valid answer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    /// Company name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Ticker as reported by the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,

    /// Listing exchange (e.g., "NASDAQ NMS - GLOBAL MARKET")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,

    /// Country of domicile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Market capitalization in millions of the listing currency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_capitalization: Option<f64>,

    /// Industry classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    /// IPO date as reported (usually `YYYY-MM-DD`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipo_date: Option<String>,

    /// Company website URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl CompanyProfile {
    /// Create a new empty profile
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the provider returned no usable field at all.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
