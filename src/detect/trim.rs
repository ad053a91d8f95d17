use super::{detect_in_series, DetectionError, DetectionParams, FlowWindow};
use crate::data::Series;

/// Keep the samples whose time falls inside `window` (inclusive)
///
/// Row order and every field are preserved. Trimming an already trimmed
/// series with the same window is a no-op.
pub fn trim(series: &Series, window: &FlowWindow) -> Series {
    series
        .samples()
        .iter()
        .filter(|s| window.contains(s.time))
        .cloned()
        .collect()
}

/// Detect the flow event on `channel` and cut the recording down to it
pub fn detect_and_trim(
    series: &Series,
    channel: &str,
    params: &DetectionParams,
) -> Result<(Series, FlowWindow), DetectionError> {
    let window = detect_in_series(series, channel, params)?;
    let trimmed = trim(series, &window);

    tracing::debug!(
        "Trimmed {} samples to {} within [{:.3}, {:.3}]",
        series.len(),
        trimmed.len(),
        window.start_time,
        window.end_time
    );

    Ok((trimmed, window))
}
