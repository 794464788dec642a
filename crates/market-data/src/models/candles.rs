use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV bar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start, Unix seconds
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Whether a series carries data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandleStatus {
    Ok,
    #[default]
    NoData,
}

/// Point on the close-price chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Unix milliseconds
    pub timestamp: i64,
    pub close: Decimal,
}

/// Column-aligned candle history.
///
/// # Invariants
/// - All six columns have the same length.
/// - Timestamps are strictly ascending.
/// - `status` is `Ok` exactly when the series is non-empty.
///
/// The columns are private so the only way to build a series is from whole
/// [`Candle`] rows, which keeps them aligned.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleSeries {
    status: CandleStatus,
    timestamps: Vec<i64>,
    opens: Vec<Decimal>,
    highs: Vec<Decimal>,
    lows: Vec<Decimal>,
    closes: Vec<Decimal>,
    volumes: Vec<Decimal>,
}

impl CandleSeries {
    /// Empty series with `no-data` status.
    pub fn no_data() -> Self {
        Self::default()
    }

    /// Builds a series from rows in any order. Rows are sorted by timestamp;
    /// when two rows share a timestamp the later one in `rows` wins.
    pub fn from_candles(mut rows: Vec<Candle>) -> Self {
        rows.sort_by_key(|c| c.timestamp);
        // Stable sort keeps input order among equal timestamps; keep the last.
        let mut deduped: Vec<Candle> = Vec::with_capacity(rows.len());
        for candle in rows {
            match deduped.last_mut() {
                Some(last) if last.timestamp == candle.timestamp => *last = candle,
                _ => deduped.push(candle),
            }
        }

        let len = deduped.len();
        let mut series = Self {
            status: if len == 0 {
                CandleStatus::NoData
            } else {
                CandleStatus::Ok
            },
            timestamps: Vec::with_capacity(len),
            opens: Vec::with_capacity(len),
            highs: Vec::with_capacity(len),
            lows: Vec::with_capacity(len),
            closes: Vec::with_capacity(len),
            volumes: Vec::with_capacity(len),
        };

        for candle in deduped {
            series.timestamps.push(candle.timestamp);
            series.opens.push(candle.open);
            series.highs.push(candle.high);
            series.lows.push(candle.low);
            series.closes.push(candle.close);
            series.volumes.push(candle.volume);
        }

        series
    }

    pub fn status(&self) -> CandleStatus {
        self.status
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn opens(&self) -> &[Decimal] {
        &self.opens
    }

    pub fn highs(&self) -> &[Decimal] {
        &self.highs
    }

    pub fn lows(&self) -> &[Decimal] {
        &self.lows
    }

    pub fn closes(&self) -> &[Decimal] {
        &self.closes
    }

    pub fn volumes(&self) -> &[Decimal] {
        &self.volumes
    }

    /// Rows in ascending timestamp order.
    pub fn candles(&self) -> impl Iterator<Item = Candle> + '_ {
        (0..self.len()).map(move |i| Candle {
            timestamp: self.timestamps[i],
            open: self.opens[i],
            high: self.highs[i],
            low: self.lows[i],
            close: self.closes[i],
            volume: self.volumes[i],
        })
    }

    /// `{timestamp (ms), close}` points for the chart, ascending.
    pub fn chart_points(&self) -> Vec<ChartPoint> {
        self.timestamps
            .iter()
            .zip(&self.closes)
            .map(|(&timestamp, &close)| ChartPoint {
                timestamp: timestamp.saturating_mul(1000),
                close,
            })
            .collect()
    }

    pub fn last_close(&self) -> Option<Decimal> {
        self.closes.last().copied()
    }
}
