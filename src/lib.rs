//! Hotfire: Static-Fire Telemetry Analysis
//!
//! Ingests raw sensor CSV recorded during rocket engine static-fire tests,
//! isolates the propellant flow window, and serves derived propulsion
//! metrics over HTTP.
//!
//! # Features
//!
//! - **Tagged Ingest**: Operator-chosen header tags map raw columns to channels
//! - **Flow Window Detection**: Slope-triggered start, baseline-return end
//! - **Trimming**: Buffered window around the detected flow
//! - **Metrics**: Pressures, differential pressure, mass flow, stiffness
//! - **Scalars**: Burn time, peaks, data rate
//! - **Storage**: In-memory or JSON documents on disk
//!
//! # Example
//!
//! ```no_run
//! use hotfire::detect::DetectionParams;
//! use hotfire::ingest::TagMapping;
//! use hotfire::metrics::{compute_metric, Metric};
//! use hotfire::pipeline::ingest_csv;
//!
//! let csv = std::fs::File::open("static_fire.csv").unwrap();
//! let tags = TagMapping::from_json(r#"{"t_ns": "Time", "PT-1": "Manifold"}"#).unwrap();
//! let outcome = ingest_csv(csv, &tags, &DetectionParams::new(10000.0)).unwrap();
//!
//! let burn = compute_metric(&outcome.series, Metric::BurnTime, Some(&DetectionParams::new(10000.0)));
//! println!("Burn time: {:?}", burn);
//! ```

pub mod api;
pub mod data;
pub mod detect;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod storage;

// Re-export commonly used types
pub use data::{Sample, Series, Value};
pub use detect::{detect_flow_window, DetectionError, DetectionParams, FlowWindow};
pub use metrics::{compute_metric, summarize, Metric, MetricOutput, MetricsError};
pub use pipeline::{ingest_csv, IngestOutcome, PipelineError};
pub use storage::{Dataset, DatasetStore, StorageError};
