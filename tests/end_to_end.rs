//! End-to-end tests for hotfire
//!
//! These tests run a recorded firing through tagging, detection, trimming,
//! storage and every metric.

use hotfire::detect::DetectionParams;
use hotfire::ingest::TagMapping;
use hotfire::metrics::{compute_metric, summarize, Metric, MetricOutput};
use hotfire::pipeline::ingest_csv;
use hotfire::storage::{Dataset, DatasetStore, FileStore};
use tempfile::tempdir;

/// 30 one-second samples with a three-second flow starting at t = 10 s
fn firing_csv() -> String {
    let mut csv = String::from("timestamp_ns,PT-MAN,PT-TANK,PT-CC,LC-TANK,LC-THRUST,PT-SPARE\n");
    for i in 0..30u64 {
        let t = i as f64;
        let (manifold, chamber, thrust) = match i {
            10 => (50000.0, 300.0, 900.0),
            11 => (51000.0, 320.0, 1100.0),
            12 => (52000.0, 310.0, 1000.0),
            13 => (5.0, 0.0, 20.0),
            _ => (0.0, 0.0, 0.0),
        };
        let tank_lc = 400.0 - 20.0 * (t - 10.0).clamp(0.0, 3.0);
        csv.push_str(&format!(
            "{},{},{},{},{},{},\n",
            i * 1_000_000_000,
            manifold,
            60000.0,
            chamber,
            tank_lc,
            thrust
        ));
    }
    csv
}

fn tags() -> TagMapping {
    TagMapping::from_json(
        r#"{
            "timestamp_ns": "Time",
            "PT-MAN": "Manifold",
            "PT-TANK": "Tank",
            "PT-CC": "Chamber",
            "LC-TANK": "TankLC",
            "LC-THRUST": "ThrustLC",
            "PT-SPARE": "Disconnected"
        }"#,
    )
    .unwrap()
}

fn params() -> DetectionParams {
    DetectionParams::new(10000.0)
}

#[test]
fn test_firing_window_and_metrics() {
    let outcome = ingest_csv(firing_csv().as_bytes(), &tags(), &params()).unwrap();

    assert_eq!(outcome.rows_read, 30);
    assert_eq!(outcome.window.start_time, 5.0);
    assert_eq!(outcome.window.end_time, 18.0);
    assert_eq!(outcome.series.len(), 14);
    assert_eq!(outcome.series.start_time(), Some(5.0));

    let series = &outcome.series;

    // Burn time is measured on the unbuffered window inside the trim
    let burn = compute_metric(series, Metric::BurnTime, Some(&params())).unwrap();
    assert_eq!(burn, MetricOutput::Scalar(3.0));

    let manifold = compute_metric(series, Metric::Manifold, None).unwrap();
    let manifold = manifold.as_series().unwrap();
    assert_eq!(manifold.len(), 14);
    assert_eq!(manifold[0].time, 0.0);
    assert_eq!(manifold[5].time, 5.0);
    assert_eq!(manifold[5].value("Manifold"), Some(50000.0));

    // Mass flow points sit at the later sample of each pair
    let mdot = compute_metric(series, Metric::MassFlowRate, None).unwrap();
    let mdot = mdot.as_series().unwrap();
    assert_eq!(mdot.len(), 13);
    assert_eq!(mdot[0].time, 1.0);
    assert_eq!(mdot[5].value("Mdot"), Some(-20.0));
    assert_eq!(mdot[7].value("Mdot"), Some(-20.0));
    assert_eq!(mdot[8].value("Mdot"), Some(0.0));

    // Stiffness only where the chamber is pressurised
    let stiffness = compute_metric(series, Metric::InjectorStiffness, None).unwrap();
    let stiffness = stiffness.as_series().unwrap();
    assert_eq!(stiffness.len(), 3);
    assert_eq!(stiffness[0].time, 5.0);
    let expected = (50000.0 - 300.0) / 300.0;
    assert!((stiffness[0].value("Stiffness").unwrap() - expected).abs() < 1e-9);

    let dp = compute_metric(series, Metric::DifferentialPressure, None).unwrap();
    assert_eq!(dp.as_series().unwrap()[6].value("DP"), Some(9000.0));
}

#[test]
fn test_firing_summary() {
    let outcome = ingest_csv(firing_csv().as_bytes(), &tags(), &params()).unwrap();
    let summary = summarize(&outcome.series, Some(&params()));

    assert_eq!(summary.len(), Metric::SCALARS.len());
    assert_eq!(summary["burntime"], Ok(3.0));
    assert_eq!(summary["peak-thrust"], Ok(1100.0));
    assert_eq!(summary["peak-chamber"], Ok(320.0));
    assert_eq!(summary["peak-mdot"], Ok(0.0));
    assert_eq!(summary["datarate"], Ok(1.0));
}

#[test]
fn test_disconnected_column_is_dropped() {
    let outcome = ingest_csv(firing_csv().as_bytes(), &tags(), &params()).unwrap();

    for sample in outcome.series.samples() {
        assert!(sample.get("PT-SPARE").is_none());
        assert!(sample.get("Disconnected").is_none());
        assert!(sample.get("Tank").is_some());
    }
}

#[test]
fn test_persisted_dataset_serves_metrics() {
    let dir = tempdir().unwrap();
    let outcome = ingest_csv(firing_csv().as_bytes(), &tags(), &params()).unwrap();

    let id = {
        let store = FileStore::new(dir.path()).unwrap();
        let dataset = Dataset::new(
            "firing.csv",
            params(),
            outcome.window,
            outcome.rows_read,
            outcome.series,
        );
        store.insert(dataset).unwrap().id.clone()
    };

    // Fresh store, so the dataset comes back from disk
    let store = FileStore::new(dir.path()).unwrap();
    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].sample_count, 14);

    let dataset = store.get(&id).unwrap().unwrap();
    let burn = compute_metric(&dataset.series, Metric::BurnTime, Some(&dataset.params)).unwrap();
    assert_eq!(burn.as_scalar(), Some(3.0));
}

#[test]
fn test_lowercase_time_passthrough_persists() {
    let mut csv = String::from("Time,Manifold,time\n");
    for i in 0..12u64 {
        let manifold = if (4..7).contains(&i) { 50000.0 + i as f64 } else { 0.0 };
        csv.push_str(&format!("{},{},{}\n", i * 1_000_000_000, manifold, i));
    }
    let outcome = ingest_csv(csv.as_bytes(), &TagMapping::default(), &params()).unwrap();
    let kept = outcome.series.len();

    let dir = tempdir().unwrap();
    let id = {
        let store = FileStore::new(dir.path()).unwrap();
        let dataset = Dataset::new("clock.csv", params(), outcome.window, 12, outcome.series);
        store.insert(dataset).unwrap().id.clone()
    };

    let store = FileStore::new(dir.path()).unwrap();
    assert_eq!(store.list().unwrap().len(), 1);
    let dataset = store.get(&id).unwrap().unwrap();
    assert_eq!(dataset.series.len(), kept);
    assert!(dataset.series.samples().iter().all(|s| s.get("time").is_some()));
}
