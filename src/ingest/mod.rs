//! Ingest path for static-fire recordings
//!
//! Raw CSV text is read into string rows, renamed through the operator's
//! tag mapping, and converted into a typed [`Series`](crate::data::Series):
//!
//! ```text
//! CSV bytes -> read_csv (tags applied) -> Ingestor -> Series
//! ```
//!
//! Only `Time` and the reference channel are parsed eagerly. Every other
//! column is carried through as an inferred [`Value`](crate::data::Value)
//! and coerced by whichever metric needs it.

pub mod csv;
pub mod rows;
pub mod tags;

pub use self::csv::{read_csv, CsvTable};
pub use rows::{Ingestor, RawRow, NANOS_PER_SECOND};
pub use tags::TagMapping;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    #[error("Tag '{tag}' is assigned to both '{first}' and '{second}'")]
    DuplicateTag {
        tag: String,
        first: String,
        second: String,
    },

    #[error("Invalid tag mapping: {0}")]
    InvalidTags(String),

    #[error("Row {row}: missing value for '{field}'")]
    MissingValue { row: usize, field: String },

    #[error("Row {row}: field '{field}' is not a valid {expected}: '{value}'")]
    Parse {
        row: usize,
        field: String,
        expected: &'static str,
        value: String,
    },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] ::csv::Error),
}
