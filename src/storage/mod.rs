//! Dataset storage
//!
//! A dataset is the trimmed flow window of one upload plus the parameters
//! that produced it. Datasets are written once and then only read, so they
//! are handed out as shared `Arc<Dataset>` values.

pub mod file;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::data::Series;
use crate::detect::{DetectionParams, FlowWindow};

pub use file::FileStore;
pub use memory::InMemoryStore;

/// Stored artifact of one ingest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub params: DetectionParams,
    pub window: FlowWindow,
    /// Rows in the uploaded file before trimming
    pub rows_read: usize,
    pub series: Series,
}

impl Dataset {
    pub fn new(
        filename: impl Into<String>,
        params: DetectionParams,
        window: FlowWindow,
        rows_read: usize,
        series: Series,
    ) -> Self {
        Self {
            id: new_dataset_id(),
            filename: filename.into(),
            uploaded_at: Utc::now(),
            params,
            window,
            rows_read,
            series,
        }
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            id: self.id.clone(),
            filename: self.filename.clone(),
            uploaded_at: self.uploaded_at,
            rows_read: self.rows_read,
            sample_count: self.series.len(),
            window: self.window,
            params: self.params,
        }
    }
}

/// Listing entry without the samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub rows_read: usize,
    pub sample_count: usize,
    pub window: FlowWindow,
    pub params: DetectionParams,
}

/// Storage backend for datasets
///
/// Implementations must allow concurrent readers; writers are serialized
/// by the implementation.
pub trait DatasetStore: Send + Sync {
    fn insert(&self, dataset: Dataset) -> Result<Arc<Dataset>, StorageError>;

    fn get(&self, id: &str) -> Result<Option<Arc<Dataset>>, StorageError>;

    /// Summaries of every dataset, newest first
    fn list(&self) -> Result<Vec<DatasetSummary>, StorageError>;

    /// Returns whether a dataset was removed
    fn delete(&self, id: &str) -> Result<bool, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Dataset '{0}' already exists")]
    DatasetExists(String),

    #[error("Invalid dataset id '{0}'")]
    InvalidId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Random 16-hex-digit id
pub fn new_dataset_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// Ids double as file names, so only a conservative alphabet is allowed
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn sort_newest_first(summaries: &mut [DatasetSummary]) {
    summaries.sort_by(|a, b| {
        b.uploaded_at
            .cmp(&a.uploaded_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
