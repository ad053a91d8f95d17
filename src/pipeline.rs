//! Upload processing: CSV text to a trimmed flow window
//!
//! ```text
//! read_csv (tags) -> Ingestor (Time, Manifold) -> detect_and_trim
//! ```

use regex::Regex;
use std::io::Read;
use std::sync::OnceLock;

use crate::data::{channel, Series};
use crate::detect::{detect_and_trim, DetectionError, DetectionParams, FlowWindow};
use crate::ingest::{read_csv, IngestError, Ingestor, TagMapping};

/// Result of processing one upload
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Data rows in the source file
    pub rows_read: usize,
    /// Samples inside the buffered flow window
    pub series: Series,
    pub window: FlowWindow,
}

/// Read, type, and trim a telemetry CSV in one pass
pub fn ingest_csv<R: Read>(
    reader: R,
    tags: &TagMapping,
    params: &DetectionParams,
) -> Result<IngestOutcome, PipelineError> {
    let table = read_csv(reader, tags)?;
    let series = Ingestor::for_detection().ingest(&table.headers, &table.rows)?;
    let (trimmed, window) = detect_and_trim(&series, channel::MANIFOLD, params)?;

    tracing::info!(
        "Ingested {} rows, kept {} in flow window [{:.3}s, {:.3}s]",
        table.len(),
        trimmed.len(),
        window.start_time,
        window.end_time
    );

    Ok(IngestOutcome {
        rows_read: table.len(),
        series: trimmed,
        window,
    })
}

/// Make an uploaded file name safe to store and display
///
/// Directory components are stripped, runs of characters outside
/// `[A-Za-z0-9._-]` become `_`, and leading dots/underscores are removed.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let re = match disallowed_chars() {
        Ok(re) => re,
        Err(e) => {
            tracing::error!("Filename pattern failed to compile: {}", e);
            return None;
        }
    };
    let cleaned = re.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches(['.', '_']);

    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

fn disallowed_chars() -> &'static Result<Regex, regex::Error> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+"))
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Detection error: {0}")]
    Detection(#[from] DetectionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn firing_csv() -> String {
        let mut csv = String::from("t_ns,PT-1,PT-2,spare\n");
        for i in 0..30u64 {
            let manifold = match i {
                10 => 50000.0,
                11 => 51000.0,
                12 => 52000.0,
                13 => 5.0,
                _ => 0.0,
            };
            csv.push_str(&format!("{},{},{},x\n", i * 1_000_000_000, manifold, 600));
        }
        csv
    }

    fn tags() -> TagMapping {
        let mut map = HashMap::new();
        map.insert("t_ns".to_string(), "Time".to_string());
        map.insert("PT-1".to_string(), "Manifold".to_string());
        map.insert("PT-2".to_string(), "Tank".to_string());
        map.insert("spare".to_string(), "Disconnected".to_string());
        TagMapping::new(map).unwrap()
    }

    #[test]
    fn test_ingest_csv_trims_to_window() {
        let outcome = ingest_csv(
            firing_csv().as_bytes(),
            &tags(),
            &DetectionParams::new(10000.0),
        )
        .unwrap();

        assert_eq!(outcome.rows_read, 30);
        assert_eq!(outcome.window.start_time, 5.0);
        assert_eq!(outcome.window.end_time, 18.0);
        assert_eq!(outcome.series.len(), 14);
        assert!(outcome.series.samples()[0].get("spare").is_none());
        assert!(outcome.series.samples()[0].get("Tank").is_some());
    }

    #[test]
    fn test_ingest_csv_without_tags_misses_time() {
        let err = ingest_csv(
            firing_csv().as_bytes(),
            &TagMapping::default(),
            &DetectionParams::new(10000.0),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Ingest(IngestError::MissingColumn(_))));
    }

    #[test]
    fn test_ingest_csv_flat_recording() {
        let csv = "Time,Manifold\n0,1\n1000000000,1\n2000000000,1\n";
        let err = ingest_csv(csv.as_bytes(), &TagMapping::default(), &DetectionParams::new(5000.0))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Detection(DetectionError::StartNotFound)
        ));
    }

    #[test]
    fn test_filename_pattern_compiled_once() {
        assert!(disallowed_chars().is_ok());
        assert!(std::ptr::eq(disallowed_chars(), disallowed_chars()));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("hotfire 03.csv").as_deref(), Some("hotfire_03.csv"));
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\runs\\cold flow.csv").as_deref(), Some("cold_flow.csv"));
        assert_eq!(sanitize_filename(".hidden.csv").as_deref(), Some("hidden.csv"));
        assert_eq!(sanitize_filename("..."), None);
        assert_eq!(sanitize_filename(""), None);
    }
}
