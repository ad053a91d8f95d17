use std::collections::HashMap;

use super::IngestError;
use crate::data::{channel, Sample, Series, Value};

/// One source row: canonical column name to raw cell text
pub type RawRow = HashMap<String, String>;

pub const NANOS_PER_SECOND: f64 = 1e9;

/// Converts string rows into a typed [`Series`]
///
/// `Time` (integer nanoseconds) and the reference channel are required in
/// the header and parsed on every row; other columns are inferred and kept.
#[derive(Debug, Clone)]
pub struct Ingestor {
    reference_channel: String,
}

impl Ingestor {
    pub fn new(reference_channel: impl Into<String>) -> Self {
        Self {
            reference_channel: reference_channel.into(),
        }
    }

    /// Ingestor keyed on the channel used for flow detection
    pub fn for_detection() -> Self {
        Self::new(channel::MANIFOLD)
    }

    pub fn reference_channel(&self) -> &str {
        &self.reference_channel
    }

    /// Check that the header carries every required column
    pub fn validate_headers(&self, headers: &[String]) -> Result<(), IngestError> {
        for required in [channel::TIME, self.reference_channel.as_str()] {
            if !headers.iter().any(|h| h == required) {
                return Err(IngestError::MissingColumn(required.to_string()));
            }
        }
        Ok(())
    }

    pub fn ingest<'a, I>(&self, headers: &[String], rows: I) -> Result<Series, IngestError>
    where
        I: IntoIterator<Item = &'a RawRow>,
    {
        self.validate_headers(headers)?;

        let samples = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| self.ingest_row(index, row))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Series::new(samples))
    }

    fn ingest_row(&self, index: usize, row: &RawRow) -> Result<Sample, IngestError> {
        let raw_time = required_cell(row, index, channel::TIME)?;
        let nanos: i64 = raw_time.parse().map_err(|_| IngestError::Parse {
            row: index,
            field: channel::TIME.to_string(),
            expected: "integer",
            value: raw_time.to_string(),
        })?;

        let raw_reference = required_cell(row, index, &self.reference_channel)?;
        let reference: f64 = raw_reference.parse().map_err(|_| IngestError::Parse {
            row: index,
            field: self.reference_channel.clone(),
            expected: "number",
            value: raw_reference.to_string(),
        })?;

        let mut sample = Sample::new(nanos as f64 / NANOS_PER_SECOND);
        for (name, raw) in row {
            if name == channel::TIME || *name == self.reference_channel {
                continue;
            }
            let value = Value::infer(raw);
            if !value.is_null() {
                sample.fields.insert(name.clone(), value);
            }
        }
        sample
            .fields
            .insert(self.reference_channel.clone(), Value::Float64(reference));

        Ok(sample)
    }
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::for_detection()
    }
}

fn required_cell<'a>(row: &'a RawRow, index: usize, field: &str) -> Result<&'a str, IngestError> {
    row.get(field)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| IngestError::MissingValue {
            row: index,
            field: field.to_string(),
        })
}
