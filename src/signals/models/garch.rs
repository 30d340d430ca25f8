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
pub struct GarchVolParams {
    pub omega: f64,
    pub alpha: f64,
    pub beta: f64,
    pub low_threshold: f64,
    pub high_threshold: f64,
    pub annualization_factor: f64,
}

impl Default for GarchVolParams {
    fn default() -> Self {
        Self {
            omega: 0.000_001,
            alpha: 0.1,
            beta: 0.85,
            low_threshold: 0.005,
            high_threshold: 0.015,
            annualization_factor: 1.0,
        }
    }
}

impl GarchVolParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.omega.is_finite() && self.omega > 0.0) {
            bail!("omega must be > 0, got {}", self.omega);
        }
        if self.alpha < 0.0 || self.beta < 0.0 {
            bail!("alpha and beta must be non-negative");
        }
        if self.alpha + self.beta >= 1.0 {
            bail!(
                "alpha + beta must be < 1 for a finite long-run variance, got {}",
                self.alpha + self.beta
            );
        }
        if !(self.annualization_factor.is_finite() && self.annualization_factor > 0.0) {
            bail!("annualization_factor must be > 0");
        }
        SignalBands::validate(self.low_threshold, self.high_threshold)
    }

    pub fn long_run_variance(&self) -> f64 {
        self.omega / (1.0 - self.alpha - self.beta)
    }
}

/// GARCH(1,1) with the log return standing in for the residual (zero mean):
/// sigma_t^2 = omega + alpha * r_t^2 + beta * sigma_{t-1}^2
#[derive(Debug, Clone)]
pub struct GarchVolModel {
    instrument: InstrumentId,
    params: GarchVolParams,
    bands: SignalBands,
    last_price: Option<f64>,
    variance: f64,
    cursor: PriceCursor,
}

impl GarchVolModel {
    pub fn new(instrument: InstrumentId, params: GarchVolParams) -> Result<Self> {
        params.validate()?;

        Ok(Self {
            instrument,
            bands: SignalBands::new(params.low_threshold, params.high_threshold),
            variance: params.long_run_variance(),
            params,
            last_price: None,
            cursor: PriceCursor::default(),
        })
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }
}

impl VolatilityModel for GarchVolModel {
    fn name(&self) -> &'static str {
        "garch_vol"
    }

    fn instrument(&self) -> InstrumentId {
        self.instrument
    }

    fn update(&mut self, state: &MarketState) -> Option<VolSignal> {
        let (price, timestamp) = self.cursor.next_price(state, self.instrument)?;
        let previous = self.last_price.replace(price)?;

        let squared_return = (price / previous).ln().powi(2);
        self.variance = self.params.omega
            + self.params.alpha * squared_return
            + self.params.beta * self.variance;

        let vol = self.variance.sqrt() * self.params.annualization_factor;
        self.bands.signal(self.instrument, vol, timestamp)
    }
}
