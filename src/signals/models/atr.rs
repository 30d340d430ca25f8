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
pub struct AtrVolParams {
    pub period: usize,
    pub low_threshold: f64,
    pub high_threshold: f64,
}

impl Default for AtrVolParams {
    fn default() -> Self {
        Self {
            period: 14,
            low_threshold: 0.004,
            high_threshold: 0.012,
        }
    }
}

impl AtrVolParams {
    pub fn validate(&self) -> Result<()> {
        if self.period == 0 {
            bail!("atr period must be positive");
        }
        SignalBands::validate(self.low_threshold, self.high_threshold)
    }
}

/// Average true range over the last `period` candles, as a fraction of the
/// latest close.
#[derive(Debug, Clone)]
pub struct AtrVolModel {
    instrument: InstrumentId,
    bands: SignalBands,
    true_ranges: RollingWindow<f64>,
    cursor: CandleCursor,
}

impl AtrVolModel {
    pub fn new(instrument: InstrumentId, params: AtrVolParams) -> Result<Self> {
        params.validate()?;

        Ok(Self {
            instrument,
            bands: SignalBands::new(params.low_threshold, params.high_threshold),
            true_ranges: RollingWindow::new(params.period),
            cursor: CandleCursor::default(),
        })
    }
}

fn true_range(high: f64, low: f64, previous_close: f64) -> f64 {
    (high - low)
        .max((high - previous_close).abs())
        .max((low - previous_close).abs())
}

impl VolatilityModel for AtrVolModel {
    fn name(&self) -> &'static str {
        "atr_vol"
    }

    fn instrument(&self) -> InstrumentId {
        self.instrument
    }

    fn update(&mut self, state: &MarketState) -> Option<VolSignal> {
        let candles = self.cursor.next_candles(state, self.instrument)?;
        let [.., previous, last] = candles.as_slice() else {
            return None;
        };

        let close = last.close.as_f64();
        self.true_ranges.push(true_range(
            last.high.as_f64(),
            last.low.as_f64(),
            previous.close.as_f64(),
        ));

        if !self.true_ranges.is_full() || close <= 0.0 {
            return None;
        }

        let atr = self.true_ranges.mean()?;
        self.bands.signal(self.instrument, atr / close, last.timestamp)
    }
}
