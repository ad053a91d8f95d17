use super::{MetricPoint, MetricsError};
use crate::data::{channel, Series};

/// Pass-through of one channel, e.g. `{time, Manifold}`
///
/// `name` doubles as the output key.
pub fn channel_series(series: &Series, name: &'static str) -> Result<Vec<MetricPoint>, MetricsError> {
    let points = series.channel_points(name)?;
    let t0 = first_time(&points);

    Ok(points
        .into_iter()
        .map(|(t, v)| MetricPoint::single(t - t0, name, v))
        .collect())
}

/// `{time, Chamber, Manifold, Tank}` for samples carrying all three
pub fn pressures(series: &Series) -> Result<Vec<MetricPoint>, MetricsError> {
    const CHANNELS: [&str; 3] = [channel::CHAMBER, channel::MANIFOLD, channel::TANK];

    let rows = series.multi_channel_points(&CHANNELS)?;
    let t0 = rows.first().map(|(t, _)| *t).unwrap_or(0.0);

    Ok(rows
        .into_iter()
        .map(|(t, values)| MetricPoint {
            time: t - t0,
            values: CHANNELS.iter().copied().zip(values).collect(),
        })
        .collect())
}

/// Differential pressure across the feed system: `Tank - Manifold`
pub fn differential_pressure(series: &Series) -> Result<Vec<MetricPoint>, MetricsError> {
    let rows = series.multi_channel_points(&[channel::TANK, channel::MANIFOLD])?;
    let t0 = rows.first().map(|(t, _)| *t).unwrap_or(0.0);

    Ok(rows
        .into_iter()
        .map(|(t, v)| MetricPoint::single(t - t0, "DP", v[0] - v[1]))
        .collect())
}

/// Mass flow rate as the discrete derivative of the tank load cell
///
/// Each point sits at the later sample of its pair. Pairs whose time does
/// not advance are skipped.
pub fn mass_flow_rate(series: &Series) -> Result<Vec<MetricPoint>, MetricsError> {
    let points = series.channel_points(channel::TANK_LC)?;
    let t0 = first_time(&points);

    Ok(points
        .windows(2)
        .filter_map(|pair| {
            let (t_prev, m_prev) = pair[0];
            let (t, m) = pair[1];
            let dt = t - t_prev;
            (dt > 0.0).then(|| MetricPoint::single(t - t0, "Mdot", (m - m_prev) / dt))
        })
        .collect())
}

/// Injector stiffness: `(Manifold - Chamber) / Chamber`
///
/// Samples with zero or non-finite pressures are dropped rather than
/// emitted as infinite or NaN.
pub fn injector_stiffness(series: &Series) -> Result<Vec<MetricPoint>, MetricsError> {
    let rows = series.multi_channel_points(&[channel::MANIFOLD, channel::CHAMBER])?;
    let t0 = rows.first().map(|(t, _)| *t).unwrap_or(0.0);

    Ok(rows
        .into_iter()
        .filter(|(_, v)| v[1] != 0.0 && v.iter().all(|p| p.is_finite()))
        .map(|(t, v)| MetricPoint::single(t - t0, "Stiffness", (v[0] - v[1]) / v[1]))
        .collect())
}

fn first_time(points: &[(f64, f64)]) -> f64 {
    points.first().map(|(t, _)| *t).unwrap_or(0.0)
}
