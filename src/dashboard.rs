//! Dashboard feed: numeric series and rows for a terminal renderer
//!
//! The renderer is an external collaborator behind [`DashboardSink`]; this
//! module never decides colours or layout.

use itertools::Itertools;
use tracing::info;

use crate::error::StatsError;
use crate::indicators::{supertrend, SuperTrendPoint, TrendDirection};
use crate::{Candle, Symbol};

/// One plottable series
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub label: String,
    pub x: Vec<String>,
    pub y: Vec<f64>,
}

/// Everything a renderer needs for one refresh
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardFrame {
    pub title: String,
    pub price: ChartSeries,
    pub volume: ChartSeries,
    pub trend: TrendDirection,
    /// Latest-candle metrics as (metric, value) pairs
    pub rows: Vec<(String, String)>,
}

/// Indicator and layout parameters for [`build_frame`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub supertrend_period: usize,
    pub supertrend_multiplier: f64,
    pub volume_bars: usize,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            supertrend_period: 10,
            supertrend_multiplier: 3.0,
            volume_bars: 50,
        }
    }
}

/// Build a frame from candles, oldest first
pub fn build_frame(
    symbol: &Symbol,
    timeframe: &str,
    candles: &[Candle],
    params: &FrameParams,
) -> Result<DashboardFrame, StatsError> {
    let latest = candles.last().ok_or(StatsError::InsufficientData)?;
    let points = supertrend(
        candles,
        params.supertrend_period,
        params.supertrend_multiplier,
    )?;
    let latest_trend: &SuperTrendPoint = points.last().ok_or(StatsError::InsufficientData)?;

    let quote = symbol.quote().unwrap_or("quote");
    let price = ChartSeries {
        label: format!("Price ({})", quote),
        x: (0..candles.len()).map(|i| i.to_string()).collect(),
        y: candles.iter().map(|c| c.close).collect(),
    };

    let tail = &candles[candles.len().saturating_sub(params.volume_bars)..];
    let volume = ChartSeries {
        label: "Volume".to_string(),
        x: (0..tail.len()).map(|i| i.to_string()).collect(),
        y: tail.iter().map(|c| c.volume).collect(),
    };

    let rows = vec![
        ("Open".to_string(), latest.open.to_string()),
        ("High".to_string(), latest.high.to_string()),
        ("Low".to_string(), latest.low.to_string()),
        ("Close".to_string(), latest.close.to_string()),
        ("Volume".to_string(), latest.volume.to_string()),
        ("SuperTrend".to_string(), format!("{:.2}", latest_trend.value)),
        ("Trend".to_string(), latest_trend.direction.label().to_string()),
    ];

    Ok(DashboardFrame {
        title: format!("{} SuperTrend Chart ({})", symbol, timeframe),
        price,
        volume,
        trend: latest_trend.direction,
        rows,
    })
}

/// Rendering surface for dashboard frames
pub trait DashboardSink: Send {
    fn render(&mut self, frame: &DashboardFrame);

    /// Surface a refresh failure to the user
    fn log(&mut self, message: &str);
}

/// Renders frames as log lines
#[derive(Debug, Default)]
pub struct LogDashboard {
    frames_rendered: u64,
}

impl LogDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

impl DashboardSink for LogDashboard {
    fn render(&mut self, frame: &DashboardFrame) {
        self.frames_rendered += 1;

        info!("━━━ {} ━━━", frame.title);
        for (metric, value) in &frame.rows {
            info!("{:<12} {}", metric, value);
        }

        let volumes = &frame.volume.y;
        let recent = volumes[volumes.len().saturating_sub(5)..]
            .iter()
            .map(|v| format!("{:.2}", v))
            .join(", ");
        info!(
            "{} points plotted, trend {}, last volumes [{}]",
            frame.price.y.len(),
            frame.trend.label(),
            recent
        );
    }

    fn log(&mut self, message: &str) {
        info!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn rising_candles(count: usize) -> Vec<Candle> {
        let start = Utc::now() - Duration::hours(count as i64);
        (0..count)
            .map(|i| {
                let close = 100.0 + i as f64;
                Candle {
                    datetime: start + Duration::hours(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 10.0 + i as f64,
                }
            })
            .collect()
    }

    #[test]
    fn test_frame_series_and_rows() {
        let candles = rising_candles(80);
        let frame = build_frame(
            &Symbol::new("BTC/USDT"),
            "1h",
            &candles,
            &FrameParams::default(),
        )
        .unwrap();

        assert_eq!(frame.title, "BTC/USDT SuperTrend Chart (1h)");
        assert_eq!(frame.price.label, "Price (USDT)");
        assert_eq!(frame.price.y.len(), 80);
        assert_eq!(frame.price.x.first().map(String::as_str), Some("0"));

        // Volume keeps only the most recent bars
        assert_eq!(frame.volume.y.len(), 50);
        assert_eq!(frame.volume.y.first(), Some(&40.0));
        assert_eq!(frame.volume.y.last(), Some(&89.0));

        let metrics: Vec<&str> = frame.rows.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(
            metrics,
            vec!["Open", "High", "Low", "Close", "Volume", "SuperTrend", "Trend"]
        );
        assert_eq!(frame.rows[3].1, "179");
        assert_eq!(frame.trend, TrendDirection::Up);
        assert_eq!(frame.rows[6].1, "Up");
    }

    #[test]
    fn test_short_history_keeps_all_volume_bars() {
        let candles = rising_candles(12);
        let frame = build_frame(&Symbol::new("ETH/USDT"), "4h", &candles, &FrameParams::default())
            .unwrap();
        assert_eq!(frame.volume.y.len(), 12);
    }

    #[test]
    fn test_empty_candles_rejected() {
        let result = build_frame(&Symbol::new("BTC/USDT"), "1h", &[], &FrameParams::default());
        assert_eq!(result, Err(StatsError::InsufficientData));
    }

    #[test]
    fn test_log_dashboard_counts_frames() {
        let candles = rising_candles(20);
        let frame =
            build_frame(&Symbol::new("BTC/USDT"), "1h", &candles, &FrameParams::default()).unwrap();

        let mut sink = LogDashboard::new();
        sink.render(&frame);
        sink.render(&frame);
        assert_eq!(sink.frames_rendered(), 2);
    }
}
