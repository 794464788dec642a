//! Error types for the market data crate.
//!
//! [`MarketDataError`] is the single error enum returned by providers and the
//! registry. Provider clients never swallow failures; the registry decides
//! whether a failure moves the request on to the next provider.

use thiserror::Error;

/// Errors that can occur during market data operations.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The provider has no API key configured.
    /// Fatal to that provider only; the registry moves on to the next one.
    #[error("Missing API key for {provider}. Set {env_var} in the environment")]
    Configuration {
        /// The provider that is not configured
        provider: String,
        /// Environment variable that supplies the key
        env_var: String,
    },

    /// HTTP, network or decoding failure reported by one provider.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// HTTP status code, when the failure came from a response
        status: Option<u16>,
        /// The error message from the provider
        message: String,
    },

    /// The provider rate limited the request (HTTP 429 or a throttle note).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The requested symbol was not found by the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The symbol exists but has no history for the requested window.
    #[error("No data for date range")]
    NoDataForRange,

    /// The provider answered, but the payload failed validation.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// Description of the validation failure
        message: String,
    },

    /// Every provider in the chain was tried and none produced a valid result.
    #[error("All providers failed for {operation}")]
    AllProvidersFailed {
        /// The operation that was being resolved
        operation: String,
    },
}

impl MarketDataError {
    /// Builds a [`MarketDataError::ProviderError`] without an HTTP status.
    pub fn provider(provider: &str, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider: provider.to_string(),
            status: None,
            message: message.into(),
        }
    }

    /// Builds a [`MarketDataError::ProviderError`] for a non-success HTTP status.
    pub fn http(provider: &str, status: u16, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider: provider.to_string(),
            status: Some(status),
            message: message.into(),
        }
    }

    /// Builds a [`MarketDataError::Configuration`] for a missing API key.
    pub fn missing_key(provider: &str, env_var: &str) -> Self {
        Self::Configuration {
            provider: provider.to_string(),
            env_var: env_var.to_string(),
        }
    }

    /// Name of the provider the error came from, if it is provider-scoped.
    pub fn provider_id(&self) -> Option<&str> {
        match self {
            Self::Configuration { provider, .. }
            | Self::ProviderError { provider, .. }
            | Self::RateLimited { provider }
            | Self::Timeout { provider } => Some(provider),
            _ => None,
        }
    }

    /// HTTP status attached to the error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::ProviderError { status, .. } => *status,
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// True for a missing-key error, as opposed to a network or decoding failure.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_is_distinct_from_network_error() {
        let config = MarketDataError::missing_key("FINNHUB", "FINNHUB_API_KEY");
        let network = MarketDataError::provider("FINNHUB", "connection reset");

        assert!(config.is_configuration());
        assert!(!network.is_configuration());
    }

    #[test]
    fn test_provider_id() {
        let error = MarketDataError::http("ALPHA_VANTAGE", 500, "HTTP 500");
        assert_eq!(error.provider_id(), Some("ALPHA_VANTAGE"));
        assert_eq!(error.http_status(), Some(500));

        let error = MarketDataError::NoDataForRange;
        assert_eq!(error.provider_id(), None);
        assert_eq!(error.http_status(), None);
    }

    #[test]
    fn test_rate_limited_reports_429() {
        let error = MarketDataError::RateLimited {
            provider: "FINNHUB".to_string(),
        };
        assert_eq!(error.http_status(), Some(429));
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::SymbolNotFound("INVALID".to_string());
        assert_eq!(format!("{}", error), "Symbol not found: INVALID");

        let error = MarketDataError::missing_key("FINNHUB", "FINNHUB_API_KEY");
        assert_eq!(
            format!("{}", error),
            "Missing API key for FINNHUB. Set FINNHUB_API_KEY in the environment"
        );

        let error = MarketDataError::provider("ALPHA_VANTAGE", "API key invalid");
        assert_eq!(
            format!("{}", error),
            "Provider error: ALPHA_VANTAGE - API key invalid"
        );

        let error = MarketDataError::AllProvidersFailed {
            operation: "candles".to_string(),
        };
        assert_eq!(format!("{}", error), "All providers failed for candles");
    }
}
