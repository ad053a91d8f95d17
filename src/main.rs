//! Hotfire Server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - HOTFIRE_HOST: Bind address (default: 0.0.0.0)
//! - HOTFIRE_PORT: Port number (default: 5000)
//! - HOTFIRE_DATA_DIR: Directory for dataset documents (default: keep in memory)
//! - HOTFIRE_MAX_UPLOAD_MB: Largest accepted upload in MB (default: 64)
//! - RUST_LOG: Log level (default: info)
//!
//! Flow window detection:
//! - HOTFIRE_START_SLOPE_THRESHOLD: Manifold slope that marks flow start
//!   (no default; uploads must then send `start_slope_threshold`)
//! - HOTFIRE_PROXIMITY_THRESHOLD: Distance from baseline that ends flow (default: 10)
//! - HOTFIRE_BUFFER_SECONDS: Padding kept around the window (default: 5)

use std::path::PathBuf;
use std::str::FromStr;

use hotfire::api::{run_server, DetectionDefaults, ServerConfig};
use hotfire::DetectionParams;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse an optional environment variable, failing on malformed values
fn env_parse<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("invalid {}='{}': {}", name, raw, e).into()),
        Err(_) => Ok(None),
    }
}

/// Megabytes to bytes, rejecting sizes that do not fit in `usize`
fn upload_limit_bytes(mb: usize) -> Result<usize, String> {
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| format!("invalid HOTFIRE_MAX_UPLOAD_MB={}: too large", mb))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hotfire=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let defaults = ServerConfig::default();

    let host = std::env::var("HOTFIRE_HOST").unwrap_or(defaults.host);
    let port: u16 = env_parse("HOTFIRE_PORT")?.unwrap_or(defaults.port);
    let data_dir = std::env::var("HOTFIRE_DATA_DIR")
        .ok()
        .filter(|d| !d.trim().is_empty())
        .map(PathBuf::from);
    let max_upload_bytes = match env_parse::<usize>("HOTFIRE_MAX_UPLOAD_MB")? {
        Some(mb) => upload_limit_bytes(mb)?,
        None => defaults.max_upload_bytes,
    };

    let detection = DetectionDefaults {
        start_slope_threshold: env_parse("HOTFIRE_START_SLOPE_THRESHOLD")?,
        proximity_threshold: env_parse("HOTFIRE_PROXIMITY_THRESHOLD")?
            .unwrap_or(defaults.detection.proximity_threshold),
        buffer_seconds: env_parse("HOTFIRE_BUFFER_SECONDS")?
            .unwrap_or(defaults.detection.buffer_seconds),
    };
    // an unset slope threshold is checked per upload
    DetectionParams::new(detection.start_slope_threshold.unwrap_or(0.0))
        .with_proximity_threshold(detection.proximity_threshold)
        .with_buffer_seconds(detection.buffer_seconds)
        .validate()?;

    let config = ServerConfig {
        host,
        port,
        data_dir,
        max_upload_bytes,
        detection,
    };

    tracing::info!("Hotfire configuration:");
    tracing::info!("  Host: {}:{}", config.host, config.port);
    match &config.data_dir {
        Some(dir) => tracing::info!("  Data dir: {}", dir.display()),
        None => tracing::info!("  Data dir: none (in-memory)"),
    }
    tracing::info!("  Max upload: {} MB", config.max_upload_bytes / (1024 * 1024));
    match config.detection.start_slope_threshold {
        Some(threshold) => tracing::info!("  Start slope threshold: {}", threshold),
        None => tracing::info!("  Start slope threshold: per upload"),
    }
    tracing::info!(
        "  Proximity threshold: {}",
        config.detection.proximity_threshold
    );
    tracing::info!("  Buffer: {} seconds", config.detection.buffer_seconds);

    run_server(config).await
}
