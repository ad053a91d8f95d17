use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::value::Value;

/// Canonical channel names used after tag mapping
pub mod channel {
    pub const TIME: &str = "Time";
    pub const MANIFOLD: &str = "Manifold";
    pub const TANK: &str = "Tank";
    pub const TANK_LC: &str = "TankLC";
    pub const THRUST_LC: &str = "ThrustLC";
    pub const CHAMBER: &str = "Chamber";
}

/// Errors raised when a consumer reads a field out of a sample
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("Row {row}: missing required field '{field}'")]
    Missing { row: usize, field: String },

    #[error("Row {row}: field '{field}' has non-numeric value '{value}'")]
    NotNumeric {
        row: usize,
        field: String,
        value: String,
    },
}

/// One telemetry row: a time in seconds plus its channel cells
///
/// The time travels under the `Time` key, which the ingestor never stores
/// in `fields`, so a passthrough column such as `time` cannot collide with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "Time")]
    pub time: f64,
    #[serde(flatten)]
    pub fields: HashMap<String, Value>,
}

impl Sample {
    pub fn new(time: f64) -> Self {
        Self {
            time,
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Read a channel as a number
    ///
    /// Absent and null cells are `Ok(None)`; a present cell that does not
    /// coerce to a number is an error. `row` is only used for reporting.
    pub fn channel(&self, name: &str, row: usize) -> Result<Option<f64>, FieldError> {
        match self.fields.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value.as_f64().map(Some).ok_or_else(|| FieldError::NotNumeric {
                row,
                field: name.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// Row-ordered sequence of samples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series {
    samples: Vec<Sample>,
}

impl Series {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    /// Time of the first sample, if any
    pub fn start_time(&self) -> Option<f64> {
        self.samples.first().map(|s| s.time)
    }

    /// `(time, value)` pairs for every sample carrying `name`
    ///
    /// Samples without the channel are skipped, so the result may be shorter
    /// than the series.
    pub fn channel_points(&self, name: &str) -> Result<Vec<(f64, f64)>, FieldError> {
        let mut points = Vec::with_capacity(self.samples.len());
        for (row, sample) in self.samples.iter().enumerate() {
            if let Some(v) = sample.channel(name, row)? {
                points.push((sample.time, v));
            }
        }
        Ok(points)
    }

    /// Like [`Series::channel_points`] but for several channels at once;
    /// a sample is kept only when every requested channel is present.
    pub fn multi_channel_points(&self, names: &[&str]) -> Result<Vec<(f64, Vec<f64>)>, FieldError> {
        let mut points = Vec::with_capacity(self.samples.len());
        'rows: for (row, sample) in self.samples.iter().enumerate() {
            let mut values = Vec::with_capacity(names.len());
            for name in names {
                match sample.channel(name, row)? {
                    Some(v) => values.push(v),
                    None => continue 'rows,
                }
            }
            points.push((sample.time, values));
        }
        Ok(points)
    }
}

impl From<Vec<Sample>> for Series {
    fn from(samples: Vec<Sample>) -> Self {
        Self::new(samples)
    }
}

impl FromIterator<Sample> for Series {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(time: f64, tank: Option<Value>, manifold: Option<Value>) -> Sample {
        let mut s = Sample::new(time);
        if let Some(v) = tank {
            s.fields.insert(channel::TANK.to_string(), v);
        }
        if let Some(v) = manifold {
            s.fields.insert(channel::MANIFOLD.to_string(), v);
        }
        s
    }

    #[test]
    fn test_channel_missing_and_null_are_absent() {
        let s = sample(0.0, Some(Value::Null), None);
        assert_eq!(s.channel(channel::TANK, 0), Ok(None));
        assert_eq!(s.channel(channel::MANIFOLD, 0), Ok(None));
    }

    #[test]
    fn test_channel_non_numeric_is_error() {
        let s = sample(0.0, Some(Value::String("err".into())), None);
        let err = s.channel(channel::TANK, 3).unwrap_err();
        assert_eq!(
            err,
            FieldError::NotNumeric {
                row: 3,
                field: "Tank".into(),
                value: "err".into()
            }
        );
    }

    #[test]
    fn test_channel_points_skip_absent() {
        let series = Series::new(vec![
            sample(0.0, Some(Value::Int64(1)), None),
            sample(1.0, None, None),
            sample(2.0, Some(Value::Float64(2.5)), None),
        ]);
        let points = series.channel_points(channel::TANK).unwrap();
        assert_eq!(points, vec![(0.0, 1.0), (2.0, 2.5)]);
    }

    #[test]
    fn test_multi_channel_requires_all() {
        let series = Series::new(vec![
            sample(0.0, Some(Value::Int64(10)), Some(Value::Int64(4))),
            sample(1.0, Some(Value::Int64(10)), None),
        ]);
        let points = series
            .multi_channel_points(&[channel::TANK, channel::MANIFOLD])
            .unwrap();
        assert_eq!(points, vec![(0.0, vec![10.0, 4.0])]);
    }

    #[test]
    fn test_sample_serializes_flat() {
        let s = Sample::new(1.5).with_field(channel::TANK, 300.0);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json, serde_json::json!({"Time": 1.5, "Tank": 300.0}));

        let back: Sample = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }
}
