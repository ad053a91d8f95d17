//! Flow-window detection
//!
//! A static-fire recording is mostly idle. The flow event shows up on the
//! manifold pressure as a sharp rise followed, some time later, by a return
//! to the pre-flow baseline. Detection runs two forward scans:
//!
//! 1. the first step whose slope strictly exceeds `start_slope_threshold`
//!    marks the start;
//! 2. the first later sample within `proximity_threshold` of the mean of
//!    everything before the start marks the end.
//!
//! The resulting times are widened by `buffer_seconds` on both sides, with
//! the start clamped at zero.

pub mod trim;

use serde::{Deserialize, Serialize};

use crate::data::{FieldError, Series};

pub use trim::{detect_and_trim, trim};

pub const DEFAULT_PROXIMITY_THRESHOLD: f64 = 10.0;
pub const DEFAULT_BUFFER_SECONDS: f64 = 5.0;

/// Tunables for [`detect_flow_window`]
///
/// The slope threshold has no default: recordings from different stands
/// need different values and the caller must choose one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionParams {
    /// Minimum rise rate (value units per second) that marks flow start
    pub start_slope_threshold: f64,
    /// Maximum distance from the pre-flow baseline that marks flow end
    pub proximity_threshold: f64,
    /// Padding added around the detected window, in seconds
    pub buffer_seconds: f64,
}

impl DetectionParams {
    pub fn new(start_slope_threshold: f64) -> Self {
        Self {
            start_slope_threshold,
            proximity_threshold: DEFAULT_PROXIMITY_THRESHOLD,
            buffer_seconds: DEFAULT_BUFFER_SECONDS,
        }
    }

    pub fn with_proximity_threshold(mut self, threshold: f64) -> Self {
        self.proximity_threshold = threshold;
        self
    }

    pub fn with_buffer_seconds(mut self, seconds: f64) -> Self {
        self.buffer_seconds = seconds;
        self
    }

    /// Same thresholds, no padding; used to measure burn time
    pub fn unbuffered(self) -> Self {
        self.with_buffer_seconds(0.0)
    }

    pub fn validate(&self) -> Result<(), DetectionError> {
        if !self.start_slope_threshold.is_finite() {
            return Err(DetectionError::InvalidParameter {
                name: "start_slope_threshold",
                reason: "must be a finite number".to_string(),
            });
        }
        if !self.proximity_threshold.is_finite() || self.proximity_threshold < 0.0 {
            return Err(DetectionError::InvalidParameter {
                name: "proximity_threshold",
                reason: "must be a finite, non-negative number".to_string(),
            });
        }
        if !self.buffer_seconds.is_finite() || self.buffer_seconds < 0.0 {
            return Err(DetectionError::InvalidParameter {
                name: "buffer_seconds",
                reason: "must be a finite, non-negative number".to_string(),
            });
        }
        Ok(())
    }
}

/// Detected flow event
///
/// Indices point at the unbuffered start and end samples of the scanned
/// input; the times include the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowWindow {
    pub start_index: usize,
    pub end_index: usize,
    pub start_time: f64,
    pub end_time: f64,
}

impl FlowWindow {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time <= self.end_time
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DetectionError {
    #[error("start not found")]
    StartNotFound,

    #[error("end not found")]
    EndNotFound,

    #[error("timestamps and values differ in length ({timestamps} vs {values})")]
    LengthMismatch { timestamps: usize, values: usize },

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Locate the flow event in an index-aligned pair of sequences
pub fn detect_flow_window(
    timestamps: &[f64],
    values: &[f64],
    params: &DetectionParams,
) -> Result<FlowWindow, DetectionError> {
    params.validate()?;

    if timestamps.len() != values.len() {
        return Err(DetectionError::LengthMismatch {
            timestamps: timestamps.len(),
            values: values.len(),
        });
    }

    let start_index = find_start(timestamps, values, params.start_slope_threshold)
        .ok_or(DetectionError::StartNotFound)?;

    // start_index >= 1, so the baseline is never empty
    let baseline = values[..start_index].iter().sum::<f64>() / start_index as f64;

    let end_index = find_end(values, start_index, baseline, params.proximity_threshold)
        .ok_or(DetectionError::EndNotFound)?;

    let start_time = (timestamps[start_index] - params.buffer_seconds).max(0.0);
    let end_time = timestamps[end_index] + params.buffer_seconds;

    tracing::debug!(
        "Flow window: start_index={} end_index={} baseline={:.3} window=[{:.3}, {:.3}]",
        start_index,
        end_index,
        baseline,
        start_time,
        end_time
    );

    Ok(FlowWindow {
        start_index,
        end_index,
        start_time,
        end_time,
    })
}

/// Run detection over one channel of a series
///
/// Samples lacking the channel are skipped, so the returned indices refer
/// to positions among the samples that carry it.
pub fn detect_in_series(
    series: &Series,
    channel: &str,
    params: &DetectionParams,
) -> Result<FlowWindow, DetectionError> {
    let (timestamps, values): (Vec<f64>, Vec<f64>) =
        series.channel_points(channel)?.into_iter().unzip();
    detect_flow_window(&timestamps, &values, params)
}

fn find_start(timestamps: &[f64], values: &[f64], threshold: f64) -> Option<usize> {
    (1..values.len()).find(|&i| {
        let dt = timestamps[i] - timestamps[i - 1];
        let slope = (values[i] - values[i - 1]) / dt;
        // Shared timestamps give an infinite or NaN slope; skip the step
        slope.is_finite() && slope > threshold
    })
}

fn find_end(values: &[f64], start_index: usize, baseline: f64, proximity: f64) -> Option<usize> {
    (start_index + 1..values.len()).find(|&j| (values[j] - baseline).abs() <= proximity)
}
