use anyhow::{Result, bail};
use serde::Deserialize;

use crate::market::market_state::MarketState;
use crate::signals::VolatilityModel;
use crate::signals::bands::SignalBands;
use crate::signals::observation::CandleCursor;
use crate::signals::rolling_window::RollingWindow;
use crate::signals::vol_signal::VolSignal;
use crate::types::instrument::InstrumentId;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct BollingerVolParams {
    pub period: usize,
    pub low_threshold: f64,
    pub high_threshold: f64,
}

impl Default for BollingerVolParams {
    fn default() -> Self {
        Self {
            period: 20,
            low_threshold: 0.02,
            high_threshold: 0.05,
        }
    }
}

impl BollingerVolParams {
    pub fn validate(&self) -> Result<()> {
        if self.period == 0 {
            bail!("bollinger period must be positive");
        }
        SignalBands::validate(self.low_threshold, self.high_threshold)
    }
}

/// Bollinger bandwidth `(upper - lower) / middle` over candle closes, with
/// bands at two population standard deviations.
#[derive(Debug, Clone)]
pub struct BollingerVolModel {
    instrument: InstrumentId,
    bands: SignalBands,
    closes: RollingWindow<f64>,
    cursor: CandleCursor,
}

impl BollingerVolModel {
    pub fn new(instrument: InstrumentId, params: BollingerVolParams) -> Result<Self> {
        params.validate()?;

        Ok(Self {
            instrument,
            bands: SignalBands::new(params.low_threshold, params.high_threshold),
            closes: RollingWindow::new(params.period),
            cursor: CandleCursor::default(),
        })
    }

    fn bandwidth(&self) -> Option<f64> {
        let mean = self.closes.mean()?;
        if mean <= 0.0 {
            return None;
        }
        let std = self.closes.population_std()?;

        let upper = mean + 2.0 * std;
        let lower = mean - 2.0 * std;
        Some((upper - lower) / mean)
    }
}

impl VolatilityModel for BollingerVolModel {
    fn name(&self) -> &'static str {
        "bollinger_vol"
    }

    fn instrument(&self) -> InstrumentId {
        self.instrument
    }

    fn update(&mut self, state: &MarketState) -> Option<VolSignal> {
        let candles = self.cursor.next_candles(state, self.instrument)?;
        let last = candles.last()?;
        self.closes.push(last.close.as_f64());

        if !self.closes.is_full() {
            return None;
        }

        let bandwidth = self.bandwidth()?;
        self.bands.signal(self.instrument, bandwidth, last.timestamp)
    }
}
