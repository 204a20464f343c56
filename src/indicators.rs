//! SuperTrend indicator on top of the `ta` crate's ATR
//!
//! Basic bands are `hl2 ± multiplier * ATR`. Final bands only tighten while
//! price stays inside them, and the trend flips when the close crosses the
//! band on the other side. The first bar starts in an uptrend.

use serde::{Deserialize, Serialize};
use ta::indicators::AverageTrueRange;
use ta::Next;

use crate::error::StatsError;
use crate::Candle;

/// Trend direction reported by SuperTrend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Up,
    Down,
}

impl TrendDirection {
    pub fn label(&self) -> &'static str {
        match self {
            TrendDirection::Up => "Up",
            TrendDirection::Down => "Down",
        }
    }
}

/// SuperTrend output for one candle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuperTrendPoint {
    /// Active band: the lower band in an uptrend, the upper band in a downtrend
    pub value: f64,
    pub upper_band: f64,
    pub lower_band: f64,
    pub atr: f64,
    pub direction: TrendDirection,
}

/// Compute SuperTrend for every candle
pub fn supertrend(
    candles: &[Candle],
    period: usize,
    multiplier: f64,
) -> Result<Vec<SuperTrendPoint>, StatsError> {
    if !(multiplier.is_finite() && multiplier > 0.0) {
        return Err(StatsError::InvalidMultiplier);
    }
    let mut atr = AverageTrueRange::new(period).map_err(|_| StatsError::InvalidPeriod(period))?;

    let mut points: Vec<SuperTrendPoint> = Vec::with_capacity(candles.len());
    let mut prev_close: Option<f64> = None;

    for candle in candles {
        let atr_value = atr.next(candle);
        let hl2 = (candle.high + candle.low) / 2.0;
        let basic_upper = hl2 + multiplier * atr_value;
        let basic_lower = hl2 - multiplier * atr_value;

        let point = match (points.last(), prev_close) {
            (Some(prev), Some(prev_close)) => {
                let upper_band = if basic_upper < prev.upper_band || prev_close > prev.upper_band {
                    basic_upper
                } else {
                    prev.upper_band
                };
                let lower_band = if basic_lower > prev.lower_band || prev_close < prev.lower_band {
                    basic_lower
                } else {
                    prev.lower_band
                };

                let direction = match prev.direction {
                    TrendDirection::Up if candle.close < lower_band => TrendDirection::Down,
                    TrendDirection::Down if candle.close > upper_band => TrendDirection::Up,
                    unchanged => unchanged,
                };

                SuperTrendPoint {
                    value: match direction {
                        TrendDirection::Up => lower_band,
                        TrendDirection::Down => upper_band,
                    },
                    upper_band,
                    lower_band,
                    atr: atr_value,
                    direction,
                }
            }
            _ => SuperTrendPoint {
                value: basic_lower,
                upper_band: basic_upper,
                lower_band: basic_lower,
                atr: atr_value,
                direction: TrendDirection::Up,
            },
        };

        points.push(point);
        prev_close = Some(candle.close);
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        let start = Utc::now() - Duration::hours(closes.len() as i64);
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                datetime: start + Duration::hours(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn test_uptrend_stays_up() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 2.0).collect();
        let points = supertrend(&candles_from_closes(&closes), 10, 3.0).unwrap();

        assert_eq!(points.len(), 60);
        let last = points.last().unwrap();
        assert_eq!(last.direction, TrendDirection::Up);
        assert!(last.value < *closes.last().unwrap());
        assert_eq!(last.value, last.lower_band);
    }

    #[test]
    fn test_reversal_flips_to_down() {
        let mut closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        closes.extend((0..30).map(|i| 129.0 - i as f64 * 4.0));
        let points = supertrend(&candles_from_closes(&closes), 10, 3.0).unwrap();

        let last = points.last().unwrap();
        assert_eq!(last.direction, TrendDirection::Down);
        assert!(last.value > *closes.last().unwrap());
        assert_eq!(last.value, last.upper_band);
    }

    #[test]
    fn test_bands_bracket_hl2() {
        let closes: Vec<f64> = (0..20).map(|i| 50.0 + (i % 3) as f64).collect();
        for point in supertrend(&candles_from_closes(&closes), 5, 2.0).unwrap() {
            assert!(point.upper_band >= point.lower_band);
            assert!(point.atr >= 0.0);
        }
    }

    #[test]
    fn test_invalid_parameters() {
        let candles = candles_from_closes(&[1.0, 2.0, 3.0]);
        assert_eq!(supertrend(&candles, 0, 3.0), Err(StatsError::InvalidPeriod(0)));
        assert_eq!(supertrend(&candles, 10, 0.0), Err(StatsError::InvalidMultiplier));
    }

    #[test]
    fn test_empty_input() {
        assert!(supertrend(&[], 10, 3.0).unwrap().is_empty());
    }
}
