use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::data::Series;
use crate::detect::{
    DetectionError, DetectionParams, FlowWindow, DEFAULT_BUFFER_SECONDS,
    DEFAULT_PROXIMITY_THRESHOLD,
};
use crate::ingest::{IngestError, TagMapping};
use crate::metrics::{compute_metric, summarize, Metric, MetricOutput, MetricPoint, MetricsError};
use crate::pipeline::{ingest_csv, sanitize_filename, PipelineError};
use crate::storage::{Dataset, DatasetStore, DatasetSummary, StorageError};

/// Application state shared across handlers
pub struct AppState {
    pub store: Arc<dyn DatasetStore>,
    pub detection: DetectionDefaults,
}

/// Server-wide detection settings applied to uploads
///
/// `start_slope_threshold` may be left unset, in which case every upload
/// has to supply one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionDefaults {
    pub start_slope_threshold: Option<f64>,
    pub proximity_threshold: f64,
    pub buffer_seconds: f64,
}

impl Default for DetectionDefaults {
    fn default() -> Self {
        Self {
            start_slope_threshold: None,
            proximity_threshold: DEFAULT_PROXIMITY_THRESHOLD,
            buffer_seconds: DEFAULT_BUFFER_SECONDS,
        }
    }
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Upload
// ============================================================================

/// Per-request replacements for configured detection parameters
#[derive(Debug, Default)]
pub struct DetectionOverrides {
    pub start_slope_threshold: Option<f64>,
    pub proximity_threshold: Option<f64>,
    pub buffer_seconds: Option<f64>,
}

impl DetectionOverrides {
    fn apply_to(&self, base: DetectionParams) -> Result<DetectionParams, ApiError> {
        let params = DetectionParams {
            start_slope_threshold: self.start_slope_threshold.unwrap_or(base.start_slope_threshold),
            proximity_threshold: self.proximity_threshold.unwrap_or(base.proximity_threshold),
            buffer_seconds: self.buffer_seconds.unwrap_or(base.buffer_seconds),
        };
        params.validate()?;
        Ok(params)
    }

    /// Collect overrides from query parameters; unrelated keys are ignored
    fn from_query(query: &HashMap<String, String>) -> Result<Self, ApiError> {
        let mut overrides = Self::default();
        for (name, raw) in query {
            overrides.set(name, raw)?;
        }
        Ok(overrides)
    }

    fn set(&mut self, name: &str, raw: &str) -> Result<(), ApiError> {
        let slot = match name {
            "start_slope_threshold" => &mut self.start_slope_threshold,
            "proximity_threshold" => &mut self.proximity_threshold,
            "buffer_seconds" => &mut self.buffer_seconds,
            _ => return Ok(()),
        };
        let value: f64 = raw.trim().parse().map_err(|_| {
            ApiError::BadRequest(format!("'{}' is not a number: '{}'", name, raw.trim()))
        })?;
        *slot = Some(value);
        Ok(())
    }
}

impl DetectionDefaults {
    /// Parameters for an upload: request fields first, then configuration
    fn resolve(&self, overrides: &DetectionOverrides) -> Result<DetectionParams, ApiError> {
        let threshold = overrides
            .start_slope_threshold
            .or(self.start_slope_threshold)
            .ok_or_else(|| {
                ApiError::BadRequest(
                    "start_slope_threshold is required (no server default configured)".to_string(),
                )
            })?;
        let base = DetectionParams::new(threshold)
            .with_proximity_threshold(self.proximity_threshold)
            .with_buffer_seconds(self.buffer_seconds);
        overrides.apply_to(base)
    }
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub id: String,
    pub filename: String,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub window: FlowWindow,
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut tags_json = String::new();
    let mut overrides = DetectionOverrides::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                file = Some((filename, data.to_vec()));
            }
            "tags" => {
                tags_json = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            }
            "start_slope_threshold" | "proximity_threshold" | "buffer_seconds" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                overrides.set(&name, &raw)?;
            }
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let (filename, data) = file.ok_or_else(|| ApiError::BadRequest("No file part".to_string()))?;
    if filename.is_empty() {
        return Err(ApiError::BadRequest("No selected file".to_string()));
    }
    if !filename.to_ascii_lowercase().ends_with(".csv") {
        return Err(ApiError::BadRequest("Invalid file type".to_string()));
    }
    let filename = sanitize_filename(&filename)
        .ok_or_else(|| ApiError::BadRequest("Invalid file name".to_string()))?;

    let tags = TagMapping::from_json(&tags_json)?;
    let params = state.detection.resolve(&overrides)?;

    let outcome = ingest_csv(data.as_slice(), &tags, &params)?;
    let dataset = Dataset::new(
        filename,
        params,
        outcome.window,
        outcome.rows_read,
        outcome.series,
    );
    let stored = state.store.insert(dataset)?;

    tracing::info!(
        "Stored dataset {} from {} ({} of {} rows)",
        stored.id,
        stored.filename,
        stored.series.len(),
        stored.rows_read
    );

    Ok(Json(UploadResponse {
        message: "File uploaded and flow window stored",
        id: stored.id.clone(),
        filename: stored.filename.clone(),
        rows_read: stored.rows_read,
        rows_kept: stored.series.len(),
        window: stored.window,
    }))
}

// ============================================================================
// Datasets
// ============================================================================

#[derive(Serialize)]
pub struct DatasetsResponse {
    pub datasets: Vec<DatasetSummary>,
}

pub async fn list_datasets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DatasetsResponse>, ApiError> {
    let datasets = state.store.list()?;
    Ok(Json(DatasetsResponse { datasets }))
}

fn load(state: &AppState, id: &str) -> Result<Arc<Dataset>, ApiError> {
    state
        .store
        .get(id)?
        .ok_or_else(|| ApiError::NotFound(format!("Dataset '{}' not found", id)))
}

pub async fn get_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DatasetSummary>, ApiError> {
    Ok(Json(load(&state, &id)?.summary()))
}

pub async fn get_series(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Series>, ApiError> {
    Ok(Json(load(&state, &id)?.series.clone()))
}

pub async fn delete_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.store.delete(&id)? {
        return Err(ApiError::NotFound(format!("Dataset '{}' not found", id)));
    }
    tracing::info!("Deleted dataset {}", id);
    Ok(Json(serde_json::json!({ "deleted": id })))
}

// ============================================================================
// Metrics
// ============================================================================

#[derive(Serialize)]
#[serde(untagged)]
pub enum MetricResponse {
    Series(Vec<MetricPoint>),
    Scalar { metric: &'static str, value: f64 },
}

pub async fn metric(
    State(state): State<Arc<AppState>>,
    Path((id, name)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<MetricResponse>, ApiError> {
    let metric: Metric = name.parse()?;
    let dataset = load(&state, &id)?;
    // only burn time reads detection parameters
    let params = if metric == Metric::BurnTime {
        DetectionOverrides::from_query(&query)?.apply_to(dataset.params)?
    } else {
        dataset.params
    };

    let response = match compute_metric(&dataset.series, metric, Some(&params))? {
        MetricOutput::Series(points) => MetricResponse::Series(points),
        MetricOutput::Scalar(value) => MetricResponse::Scalar {
            metric: metric.name(),
            value,
        },
    };

    Ok(Json(response))
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub id: String,
    pub metrics: BTreeMap<&'static str, SummaryEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryEntry {
    Value(f64),
    Error(String),
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let dataset = load(&state, &id)?;
    let params = DetectionOverrides::from_query(&query)?.apply_to(dataset.params)?;

    let metrics = summarize(&dataset.series, Some(&params))
        .into_iter()
        .map(|(name, result)| {
            let entry = match result {
                Ok(value) => SummaryEntry::Value(value),
                Err(e) => SummaryEntry::Error(e.to_string()),
            };
            (name, entry)
        })
        .collect();

    Ok(Json(SummaryResponse {
        id: dataset.id.clone(),
        metrics,
    }))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unprocessable(String),
    Internal(String),
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<DetectionError> for ApiError {
    fn from(e: DetectionError) -> Self {
        match e {
            DetectionError::InvalidParameter { .. } | DetectionError::Field(_) => {
                ApiError::BadRequest(e.to_string())
            }
            _ => ApiError::Unprocessable(e.to_string()),
        }
    }
}

impl From<MetricsError> for ApiError {
    fn from(e: MetricsError) -> Self {
        match e {
            MetricsError::UnknownMetric(_) => ApiError::NotFound(e.to_string()),
            MetricsError::Detection(inner) => inner.into(),
            e if e.is_computation() => ApiError::Unprocessable(e.to_string()),
            _ => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Ingest(inner) => inner.into(),
            PipelineError::Detection(inner) => inner.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidId(_) => ApiError::BadRequest(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", message);
        } else {
            tracing::warn!("Request rejected: {}", message);
        }

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
