use super::series::mass_flow_rate;
use super::MetricsError;
use crate::data::{channel, Series};
use crate::detect::{detect_in_series, DetectionParams};

/// Channel or derived series a peak is taken over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakTarget {
    Thrust,
    Chamber,
    MassFlow,
}

impl PeakTarget {
    pub fn label(&self) -> &'static str {
        match self {
            PeakTarget::Thrust => channel::THRUST_LC,
            PeakTarget::Chamber => channel::CHAMBER,
            PeakTarget::MassFlow => "Mdot",
        }
    }
}

/// Duration of the unbuffered flow window found in a stored window
pub fn burn_time(series: &Series, params: &DetectionParams) -> Result<f64, MetricsError> {
    let window = detect_in_series(series, channel::MANIFOLD, &params.unbuffered())?;
    Ok(window.duration())
}

/// Largest value of the target; NaN cells are ignored
pub fn peak(series: &Series, target: PeakTarget) -> Result<f64, MetricsError> {
    let values: Vec<f64> = match target {
        PeakTarget::Thrust | PeakTarget::Chamber => series
            .channel_points(target.label())?
            .into_iter()
            .map(|(_, v)| v)
            .collect(),
        PeakTarget::MassFlow => mass_flow_rate(series)?
            .iter()
            .filter_map(|p| p.value("Mdot"))
            .collect(),
    };

    values
        .into_iter()
        .filter(|v| !v.is_nan())
        .reduce(f64::max)
        .ok_or(MetricsError::NoData(target.label()))
}

/// Samples per second: the inverse of the mean interval between samples
pub fn data_rate(series: &Series) -> Result<f64, MetricsError> {
    let times = series.times();
    if times.len() < 2 {
        return Err(MetricsError::InsufficientSamples(times.len()));
    }

    let mean_interval =
        times.windows(2).map(|w| w[1] - w[0]).sum::<f64>() / (times.len() - 1) as f64;
    let rate = 1.0 / mean_interval;
    if mean_interval == 0.0 || !rate.is_finite() {
        return Err(MetricsError::ZeroInterval);
    }

    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Sample;
    use crate::detect::DetectionError;

    fn manifold_series(values: &[f64]) -> Series {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new(i as f64).with_field(channel::MANIFOLD, v))
            .collect()
    }

    #[test]
    fn test_burn_time_ignores_buffer() {
        let series = manifold_series(&[0.0, 0.0, 0.0, 0.0, 50000.0, 51000.0, 52000.0, 5.0, 4.0, 3.0]);
        let params = DetectionParams::new(10000.0).with_buffer_seconds(5.0);
        assert_eq!(burn_time(&series, &params).unwrap(), 3.0);
    }

    #[test]
    fn test_burn_time_over_trimmed_window() {
        // window trimmed so tightly that no idle baseline remains
        let series = manifold_series(&[50000.0, 51000.0, 52000.0]);
        let err = burn_time(&series, &DetectionParams::new(10000.0)).unwrap_err();
        assert_eq!(err, MetricsError::Detection(DetectionError::StartNotFound));
    }

    #[test]
    fn test_peak_of_channel() {
        let series: Series = vec![
            Sample::new(0.0).with_field(channel::CHAMBER, 12.0),
            Sample::new(1.0).with_field(channel::CHAMBER, f64::NAN),
            Sample::new(2.0).with_field(channel::CHAMBER, 340.0),
            Sample::new(3.0),
        ]
        .into();
        assert_eq!(peak(&series, PeakTarget::Chamber).unwrap(), 340.0);
    }

    #[test]
    fn test_peak_of_absent_channel_is_error() {
        let series = manifold_series(&[1.0, 2.0]);
        let err = peak(&series, PeakTarget::Thrust).unwrap_err();
        assert_eq!(err, MetricsError::NoData("ThrustLC"));
        assert!(err.is_computation());
    }

    #[test]
    fn test_peak_mass_flow() {
        let series: Series = vec![
            Sample::new(0.0).with_field(channel::TANK_LC, 100.0),
            Sample::new(1.0).with_field(channel::TANK_LC, 90.0),
            Sample::new(2.0).with_field(channel::TANK_LC, 85.0),
        ]
        .into();
        assert_eq!(peak(&series, PeakTarget::MassFlow).unwrap(), -5.0);

        let single: Series = vec![Sample::new(0.0).with_field(channel::TANK_LC, 1.0)].into();
        assert_eq!(
            peak(&single, PeakTarget::MassFlow),
            Err(MetricsError::NoData("Mdot"))
        );
    }

    #[test]
    fn test_data_rate() {
        let series: Series = (0..101).map(|i| Sample::new(i as f64 * 0.001)).collect();
        let rate = data_rate(&series).unwrap();
        assert!((rate - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_data_rate_degenerate_inputs() {
        let one: Series = vec![Sample::new(0.0)].into();
        assert_eq!(data_rate(&one), Err(MetricsError::InsufficientSamples(1)));

        let stalled: Series = vec![Sample::new(4.0), Sample::new(4.0), Sample::new(4.0)].into();
        assert_eq!(data_rate(&stalled), Err(MetricsError::ZeroInterval));
    }
}
