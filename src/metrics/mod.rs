//! Derived propulsion metrics over a stored flow window
//!
//! Every metric is a pure function of a [`Series`]; none of them mutate it,
//! so any number may run at once against the same stored window.
//!
//! Times in series outputs are relative to the first sample carrying the
//! channels the metric reads, not to the first sample of the whole series.

pub mod scalar;
pub mod series;

use rayon::prelude::*;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::data::{FieldError, Series};
use crate::detect::{DetectionError, DetectionParams};

pub use scalar::{burn_time, data_rate, peak, PeakTarget};
pub use series::{
    channel_series, differential_pressure, injector_stiffness, mass_flow_rate, pressures,
};

/// One output sample: a relative time plus one or more named values
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub time: f64,
    pub values: Vec<(&'static str, f64)>,
}

impl MetricPoint {
    pub fn single(time: f64, name: &'static str, value: f64) -> Self {
        Self {
            time,
            values: vec![(name, value)],
        }
    }

    /// Value stored under `name`, if any
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }
}

impl Serialize for MetricPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("time", &self.time)?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Result of a single metric query
#[derive(Debug, Clone, PartialEq)]
pub enum MetricOutput {
    Series(Vec<MetricPoint>),
    Scalar(f64),
}

impl MetricOutput {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            MetricOutput::Scalar(v) => Some(*v),
            MetricOutput::Series(_) => None,
        }
    }

    pub fn as_series(&self) -> Option<&[MetricPoint]> {
        match self {
            MetricOutput::Series(points) => Some(points),
            MetricOutput::Scalar(_) => None,
        }
    }
}

/// Every metric the engine can compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Manifold,
    Tank,
    TankLc,
    ThrustLc,
    Pressures,
    DifferentialPressure,
    MassFlowRate,
    InjectorStiffness,
    BurnTime,
    PeakThrust,
    PeakChamber,
    PeakMassFlow,
    DataRate,
}

impl Metric {
    pub const ALL: &'static [Metric] = &[
        Metric::Manifold,
        Metric::Tank,
        Metric::TankLc,
        Metric::ThrustLc,
        Metric::Pressures,
        Metric::DifferentialPressure,
        Metric::MassFlowRate,
        Metric::InjectorStiffness,
        Metric::BurnTime,
        Metric::PeakThrust,
        Metric::PeakChamber,
        Metric::PeakMassFlow,
        Metric::DataRate,
    ];

    pub const SCALARS: &'static [Metric] = &[
        Metric::BurnTime,
        Metric::PeakThrust,
        Metric::PeakChamber,
        Metric::PeakMassFlow,
        Metric::DataRate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Manifold => "manifold",
            Metric::Tank => "tank",
            Metric::TankLc => "tanklc",
            Metric::ThrustLc => "thrustlc",
            Metric::Pressures => "pressures",
            Metric::DifferentialPressure => "dp",
            Metric::MassFlowRate => "mdot",
            Metric::InjectorStiffness => "stiffness",
            Metric::BurnTime => "burntime",
            Metric::PeakThrust => "peak-thrust",
            Metric::PeakChamber => "peak-chamber",
            Metric::PeakMassFlow => "peak-mdot",
            Metric::DataRate => "datarate",
        }
    }

    pub fn is_scalar(&self) -> bool {
        Self::SCALARS.contains(self)
    }
}

impl FromStr for Metric {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| MetricsError::UnknownMetric(s.to_string()))
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    #[error("Unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("Parameter '{0}' is required for this metric")]
    MissingParameter(&'static str),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error("no data for {0}")]
    NoData(&'static str),

    #[error("need at least 2 samples, got {0}")]
    InsufficientSamples(usize),

    #[error("mean sample interval is zero")]
    ZeroInterval,
}

impl MetricsError {
    /// Guarded arithmetic or empty aggregates, as opposed to bad input
    pub fn is_computation(&self) -> bool {
        matches!(
            self,
            MetricsError::NoData(_) | MetricsError::InsufficientSamples(_) | MetricsError::ZeroInterval
        )
    }
}

/// Compute one metric
///
/// `detection` is only consulted for [`Metric::BurnTime`]; its buffer is
/// ignored because burn time is measured on the unbuffered window.
pub fn compute_metric(
    series: &Series,
    metric: Metric,
    detection: Option<&DetectionParams>,
) -> Result<MetricOutput, MetricsError> {
    use crate::data::channel;

    let output = match metric {
        Metric::Manifold => MetricOutput::Series(channel_series(series, channel::MANIFOLD)?),
        Metric::Tank => MetricOutput::Series(channel_series(series, channel::TANK)?),
        Metric::TankLc => MetricOutput::Series(channel_series(series, channel::TANK_LC)?),
        Metric::ThrustLc => MetricOutput::Series(channel_series(series, channel::THRUST_LC)?),
        Metric::Pressures => MetricOutput::Series(pressures(series)?),
        Metric::DifferentialPressure => MetricOutput::Series(differential_pressure(series)?),
        Metric::MassFlowRate => MetricOutput::Series(mass_flow_rate(series)?),
        Metric::InjectorStiffness => MetricOutput::Series(injector_stiffness(series)?),
        Metric::BurnTime => {
            let params = detection.ok_or(MetricsError::MissingParameter("start_slope_threshold"))?;
            MetricOutput::Scalar(burn_time(series, params)?)
        }
        Metric::PeakThrust => MetricOutput::Scalar(peak(series, PeakTarget::Thrust)?),
        Metric::PeakChamber => MetricOutput::Scalar(peak(series, PeakTarget::Chamber)?),
        Metric::PeakMassFlow => MetricOutput::Scalar(peak(series, PeakTarget::MassFlow)?),
        Metric::DataRate => MetricOutput::Scalar(data_rate(series)?),
    };

    Ok(output)
}

/// All scalar metrics of a window, computed in parallel
///
/// Each entry carries its own result so one failing metric does not hide
/// the rest.
pub fn summarize(
    series: &Series,
    detection: Option<&DetectionParams>,
) -> BTreeMap<&'static str, Result<f64, MetricsError>> {
    Metric::SCALARS
        .par_iter()
        .map(|&metric| {
            let value = compute_metric(series, metric, detection).map(|out| {
                // scalar metrics always produce a scalar
                out.as_scalar().unwrap_or(f64::NAN)
            });
            (metric.name(), value)
        })
        .collect()
}
