use anyhow::{Result, bail};
use serde::Deserialize;

use crate::market::market_state::MarketState;
use crate::signals::VolatilityModel;
use crate::signals::bands::SignalBands;
use crate::signals::observation::PriceCursor;
use crate::signals::rolling_window::{RollingWindow, sample_std};
use crate::signals::vol_signal::VolSignal;
use crate::types::instrument::InstrumentId;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RealizedVolParams {
    /// Number of log returns in the window.
    pub lookback: usize,
    pub low_threshold: f64,
    pub high_threshold: f64,
    pub annualization_factor: f64,
}

impl Default for RealizedVolParams {
    fn default() -> Self {
        Self {
            lookback: 30,
            low_threshold: 0.003,
            high_threshold: 0.01,
            annualization_factor: 1.0,
        }
    }
}

impl RealizedVolParams {
    pub fn validate(&self) -> Result<()> {
        if self.lookback < 2 {
            bail!("realized vol lookback must be >= 2, got {}", self.lookback);
        }
        if !(self.annualization_factor.is_finite() && self.annualization_factor > 0.0) {
            bail!("annualization_factor must be > 0");
        }
        SignalBands::validate(self.low_threshold, self.high_threshold)
    }
}

/// Rolling sample standard deviation of log returns for one instrument.
#[derive(Debug, Clone)]
pub struct RealizedVolModel {
    instrument: InstrumentId,
    bands: SignalBands,
    annualization_factor: f64,
    prices: RollingWindow<f64>,
    cursor: PriceCursor,
}

impl RealizedVolModel {
    pub fn new(instrument: InstrumentId, params: RealizedVolParams) -> Result<Self> {
        params.validate()?;

        Ok(Self {
            instrument,
            bands: SignalBands::new(params.low_threshold, params.high_threshold),
            annualization_factor: params.annualization_factor,
            prices: RollingWindow::new(params.lookback + 1),
            cursor: PriceCursor::default(),
        })
    }

    pub fn window_len(&self) -> usize {
        self.prices.len()
    }

    fn realized_volatility(&self) -> Option<f64> {
        let prices: Vec<f64> = self.prices.iter().copied().collect();
        let returns: Vec<f64> = prices
            .windows(2)
            .map(|pair| (pair[1] / pair[0]).ln())
            .collect();

        sample_std(&returns).map(|std| std * self.annualization_factor)
    }
}

impl VolatilityModel for RealizedVolModel {
    fn name(&self) -> &'static str {
        "realized_vol"
    }

    fn instrument(&self) -> InstrumentId {
        self.instrument
    }

    fn update(&mut self, state: &MarketState) -> Option<VolSignal> {
        let (price, timestamp) = self.cursor.next_price(state, self.instrument)?;
        self.prices.push(price);

        if !self.prices.is_full() {
            return None;
        }

        let vol = self.realized_volatility()?;
        self.bands.signal(self.instrument, vol, timestamp)
    }
}
