//! Chart and gauge models behind the dashboard cards.
//!
//! These hold data and clock state only; drawing lives in the GUI module so
//! the models stay testable without a window.

use std::collections::VecDeque;
use std::time::Duration;

use thingy_types::Reading;
use time::OffsetDateTime;

/// Upper bound on retained samples regardless of the time window.
const MAX_POINTS: usize = 2048;

/// Designated total of the rotary gauge.
pub const GAUGE_TOTAL: f64 = 360.0;

/// A rolling time series that scrolls on its own clock.
///
/// While running, the visible window ends at the current time, so the
/// series keeps moving left between readings. Stopping freezes the view.
#[derive(Debug, Clone)]
pub struct TimeSeriesChart {
    window: Duration,
    points: VecDeque<Reading>,
    running: bool,
    frozen_at: Option<OffsetDateTime>,
}

impl TimeSeriesChart {
    /// Create an empty, stopped chart showing `window` of history.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            points: VecDeque::new(),
            running: false,
            frozen_at: None,
        }
    }

    /// Append a sample and drop samples that fell out of the window.
    pub fn append(&mut self, reading: Reading) {
        self.points.push_back(reading);
        let cutoff = reading.timestamp - self.window;
        while let Some(front) = self.points.front() {
            if front.timestamp < cutoff || self.points.len() > MAX_POINTS {
                self.points.pop_front();
            } else {
                break;
            }
        }
    }

    /// Start the chart clock. Idempotent.
    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.frozen_at = None;
        }
    }

    /// Stop the chart clock, freezing the view. Points are kept.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.frozen_at = Some(OffsetDateTime::now_utc());
        }
    }

    /// Drop every point.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<&Reading> {
        self.points.back()
    }

    pub fn points(&self) -> impl Iterator<Item = &Reading> {
        self.points.iter()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Right edge of the visible window.
    pub fn view_end(&self) -> OffsetDateTime {
        match (self.running, self.frozen_at) {
            (false, Some(frozen)) => frozen,
            (false, None) => self
                .latest()
                .map(|r| r.timestamp)
                .unwrap_or_else(OffsetDateTime::now_utc),
            (true, _) => OffsetDateTime::now_utc(),
        }
    }

    /// Points as `[seconds relative to end, value]`, oldest first.
    ///
    /// The x axis runs from `-window` to `0`.
    pub fn plot_points(&self, end: OffsetDateTime) -> Vec<[f64; 2]> {
        self.points
            .iter()
            .map(|r| [(r.timestamp - end).as_seconds_f64(), r.value])
            .collect()
    }

    /// Smallest and largest value currently held.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.points.iter().fold(None, |acc, r| match acc {
            None => Some((r.value, r.value)),
            Some((lo, hi)) => Some((lo.min(r.value), hi.max(r.value))),
        })
    }
}

/// A single-value pie gauge with a designated total.
#[derive(Debug, Clone)]
pub struct PieGauge {
    total: f64,
    label: &'static str,
    value: Option<f64>,
}

impl PieGauge {
    /// Create an empty gauge.
    pub fn new(total: f64, label: &'static str) -> Self {
        Self {
            total,
            label,
            value: None,
        }
    }

    /// Replace the displayed value.
    pub fn set(&mut self, value: f64) {
        self.value = Some(value);
    }

    pub fn clear(&mut self) {
        self.value = None;
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Filled share of the pie in `0.0..=1.0`. Values beyond the total fill it.
    pub fn fraction(&self) -> f64 {
        match self.value {
            Some(v) if self.total > 0.0 => (v / self.total).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// Unfilled remainder of the total.
    pub fn remainder(&self) -> f64 {
        (self.total - self.value.unwrap_or(0.0)).max(0.0)
    }
}
