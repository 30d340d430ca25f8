use anyhow::{Result, bail};
use chrono::{DateTime, Utc};

use crate::signals::vol_signal::{VolKind, VolSignal};
use crate::types::instrument::InstrumentId;

/// Low/high volatility thresholds shared by every model.
///
/// Values at or above `high` are `VOL_UP`, at or below `low` are `VOL_DOWN`,
/// anything strictly between is the normal band and yields no signal.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SignalBands {
    low: f64,
    high: f64,
}

impl SignalBands {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn validate(low: f64, high: f64) -> Result<()> {
        if !low.is_finite() || !high.is_finite() {
            bail!("thresholds must be finite (low={low}, high={high})");
        }
        if low > high {
            bail!("low_threshold {low} must not exceed high_threshold {high}");
        }
        Ok(())
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn classify(&self, value: f64) -> Option<VolKind> {
        if value >= self.high {
            Some(VolKind::Up)
        } else if value <= self.low {
            Some(VolKind::Down)
        } else {
            None
        }
    }

    /// Position of `value` between the thresholds, clamped to [0, 1].
    pub fn strength(&self, value: f64) -> f64 {
        let width = self.high - self.low;
        let denominator = if width == 0.0 { 1.0 } else { width };

        ((value - self.low) / denominator).clamp(0.0, 1.0)
    }

    pub fn signal(
        &self,
        instrument: InstrumentId,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Option<VolSignal> {
        if !value.is_finite() {
            return None;
        }

        let kind = self.classify(value)?;
        Some(VolSignal::new(
            instrument,
            kind,
            self.strength(value),
            timestamp,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_edges_are_inclusive() {
        let bands = SignalBands::new(0.003, 0.01);

        assert_eq!(bands.classify(0.01), Some(VolKind::Up));
        assert_eq!(bands.classify(0.003), Some(VolKind::Down));
        assert_eq!(bands.classify(0.005), None);
    }

    #[test]
    fn test_strength_stays_in_unit_interval() {
        let bands = SignalBands::new(0.005, 0.015);

        assert_eq!(bands.strength(10.0), 1.0);
        assert_eq!(bands.strength(-10.0), 0.0);
        assert!((bands.strength(0.01) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_equal_thresholds_use_unit_denominator() {
        let bands = SignalBands::new(0.02, 0.02);

        assert_eq!(bands.classify(0.02), Some(VolKind::Up));
        assert!((bands.strength(0.5) - 0.48).abs() < 1e-12);
    }

    #[test]
    fn test_signal_skips_normal_band_and_nan() {
        let bands = SignalBands::new(0.1, 0.2);
        let id = InstrumentId::new(3);
        let now = Utc::now();

        assert!(bands.signal(id, 0.15, now).is_none());
        assert!(bands.signal(id, f64::NAN, now).is_none());

        let signal = bands.signal(id, 0.9, now).unwrap();
        assert_eq!(signal.kind, VolKind::Up);
        assert_eq!(signal.strength, 1.0);
    }

    #[test]
    fn test_validate() {
        assert!(SignalBands::validate(0.1, 0.2).is_ok());
        assert!(SignalBands::validate(0.3, 0.2).is_err());
        assert!(SignalBands::validate(f64::INFINITY, 0.2).is_err());
    }
}
