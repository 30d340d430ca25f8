use anyhow::{Result, bail};
use serde::Deserialize;

use crate::market::market_state::MarketState;
use crate::signals::VolatilityModel;
use crate::signals::bands::SignalBands;
use crate::signals::observation::PriceCursor;
use crate::signals::vol_signal::VolSignal;
use crate::types::instrument::InstrumentId;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct EwmaVolParams {
    /// RiskMetrics lambda.
    pub decay_factor: f64,
    pub low_threshold: f64,
    pub high_threshold: f64,
    /// e.g. sqrt(252) for daily bars.
    pub annualization_factor: f64,
}

impl Default for EwmaVolParams {
    fn default() -> Self {
        Self {
            decay_factor: 0.94,
            low_threshold: 0.005,
            high_threshold: 0.015,
            annualization_factor: 1.0,
        }
    }
}

impl EwmaVolParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.decay_factor > 0.0 && self.decay_factor < 1.0) {
            bail!("decay_factor must be in (0, 1), got {}", self.decay_factor);
        }
        if !(self.annualization_factor.is_finite() && self.annualization_factor > 0.0) {
            bail!("annualization_factor must be > 0");
        }
        SignalBands::validate(self.low_threshold, self.high_threshold)
    }
}

/// variance_t = lambda * variance_{t-1} + (1 - lambda) * r_t^2
#[derive(Debug, Clone)]
pub struct EwmaVolModel {
    instrument: InstrumentId,
    decay_factor: f64,
    annualization_factor: f64,
    bands: SignalBands,
    last_price: Option<f64>,
    variance: f64,
    initialized: bool,
    cursor: PriceCursor,
}

impl EwmaVolModel {
    pub fn new(instrument: InstrumentId, params: EwmaVolParams) -> Result<Self> {
        params.validate()?;

        Ok(Self {
            instrument,
            decay_factor: params.decay_factor,
            annualization_factor: params.annualization_factor,
            bands: SignalBands::new(params.low_threshold, params.high_threshold),
            last_price: None,
            variance: 0.0,
            initialized: false,
            cursor: PriceCursor::default(),
        })
    }

    pub fn last_price(&self) -> Option<f64> {
        self.last_price
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl VolatilityModel for EwmaVolModel {
    fn name(&self) -> &'static str {
        "ewma_vol"
    }

    fn instrument(&self) -> InstrumentId {
        self.instrument
    }

    fn update(&mut self, state: &MarketState) -> Option<VolSignal> {
        let (price, timestamp) = self.cursor.next_price(state, self.instrument)?;

        // The very first price only seeds `last_price`.
        let previous = self.last_price.replace(price)?;

        let squared_return = (price / previous).ln().powi(2);
        if self.initialized {
            self.variance =
                self.decay_factor * self.variance + (1.0 - self.decay_factor) * squared_return;
        } else {
            // Seeded with the first squared return; noisy but settles quickly.
            self.variance = squared_return;
            self.initialized = true;
        }

        let vol = self.variance.sqrt() * self.annualization_factor;
        self.bands.signal(self.instrument, vol, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::event_loop::EventLoop;
    use crate::market::event_loop::test_support::tick;
    use crate::signals::vol_signal::VolKind;

    #[test]
    fn test_first_price_only_seeds() {
        let mut model = EwmaVolModel::new(InstrumentId::new(9), EwmaVolParams::default()).unwrap();
        let mut event_loop = EventLoop::new();

        let signal = model.update(event_loop.apply_tick(tick(9, 0, 100.0)));

        assert!(signal.is_none());
        assert_eq!(model.last_price(), Some(100.0));
        assert!(!model.is_initialized());
    }

    #[test]
    fn test_second_price_seeds_variance_with_squared_return() {
        let mut model = EwmaVolModel::new(InstrumentId::new(9), EwmaVolParams::default()).unwrap();
        let mut event_loop = EventLoop::new();

        model.update(event_loop.apply_tick(tick(9, 0, 100.0)));
        model.update(event_loop.apply_tick(tick(9, 1, 102.0)));

        let r = (102.0_f64 / 100.0).ln();
        assert!(model.is_initialized());
        assert!((model.variance() - r * r).abs() < 1e-15);
    }

    #[test]
    fn test_recursion_after_seed() {
        let params = EwmaVolParams {
            decay_factor: 0.9,
            ..Default::default()
        };
        let mut model = EwmaVolModel::new(InstrumentId::new(9), params).unwrap();
        let mut event_loop = EventLoop::new();

        model.update(event_loop.apply_tick(tick(9, 0, 100.0)));
        model.update(event_loop.apply_tick(tick(9, 1, 102.0)));
        let signal = model.update(event_loop.apply_tick(tick(9, 2, 101.0)));

        let r1 = (102.0_f64 / 100.0).ln();
        let r2 = (101.0_f64 / 102.0).ln();
        let expected = 0.9 * r1 * r1 + 0.1 * r2 * r2;
        assert!((model.variance() - expected).abs() < 1e-15);

        // sqrt(expected) ~ 0.019 > 0.015
        let signal = signal.unwrap();
        assert_eq!(signal.kind, VolKind::Up);
        assert_eq!(signal.strength, 1.0);
    }

    #[test]
    fn test_rejects_decay_outside_unit_interval() {
        for decay_factor in [0.0, 1.0, 1.5] {
            let params = EwmaVolParams {
                decay_factor,
                ..Default::default()
            };
            assert!(EwmaVolModel::new(InstrumentId::new(1), params).is_err());
        }
    }
}
