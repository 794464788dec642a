use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Seconds in one day.
pub const DAY_SECONDS: i64 = 24 * 60 * 60;

/// Chart range selectable in the dashboard.
///
/// | Range | Lookback | Primary resolution | Fallback points |
/// |-------|----------|--------------------|-----------------|
/// | 1D    | 1 day    | 5-minute bars      | 1               |
/// | 1W    | 7 days   | 30-minute bars     | 5               |
/// | 1M    | 30 days  | 60-minute bars     | 22              |
/// | 1Y    | 365 days | daily bars         | 52              |
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartRange {
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    OneWeek,
    #[default]
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "1Y")]
    OneYear,
}

/// Inclusive window of Unix timestamps (seconds).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: i64,
    pub to: i64,
}

impl TimeWindow {
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.from && timestamp <= self.to
    }
}

impl ChartRange {
    pub const ALL: [ChartRange; 4] = [
        ChartRange::OneDay,
        ChartRange::OneWeek,
        ChartRange::OneMonth,
        ChartRange::OneYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1D",
            Self::OneWeek => "1W",
            Self::OneMonth => "1M",
            Self::OneYear => "1Y",
        }
    }

    /// Lookback window length in seconds.
    pub fn lookback_seconds(&self) -> i64 {
        match self {
            Self::OneDay => DAY_SECONDS,
            Self::OneWeek => 7 * DAY_SECONDS,
            Self::OneMonth => 30 * DAY_SECONDS,
            Self::OneYear => 365 * DAY_SECONDS,
        }
    }

    /// Bar resolution in the primary provider's encoding
    /// (minutes as a number, `D` for daily).
    pub fn resolution(&self) -> &'static str {
        match self {
            Self::OneDay => "5",
            Self::OneWeek => "30",
            Self::OneMonth => "60",
            Self::OneYear => "D",
        }
    }

    /// Number of most recent points to keep when a provider has history but
    /// nothing inside the window.
    pub fn fallback_points(&self) -> usize {
        match self {
            Self::OneDay => 1,
            Self::OneWeek => 5,
            Self::OneMonth => 22,
            Self::OneYear => 52,
        }
    }

    /// Window ending at `now` (Unix seconds).
    pub fn window_ending(&self, now: i64) -> TimeWindow {
        TimeWindow {
            from: now - self.lookback_seconds(),
            to: now,
        }
    }

    /// Parses a range label, resolving unknown labels to the default (`1M`).
    pub fn parse_or_default(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }
}

impl fmt::Display for ChartRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown chart range: {0}")]
pub struct ParseRangeError(pub String);

impl FromStr for ChartRange {
    type Err = ParseRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "1D" => Ok(Self::OneDay),
            "1W" => Ok(Self::OneWeek),
            "1M" => Ok(Self::OneMonth),
            "1Y" => Ok(Self::OneYear),
            _ => Err(ParseRangeError(s.to_string())),
        }
    }
}
