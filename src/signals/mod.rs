pub mod bands;
pub mod models;
pub mod observation;
pub mod rolling_window;
pub mod vol_signal;

use crate::{
    market::market_state::MarketState, signals::vol_signal::VolSignal,
    types::instrument::InstrumentId,
};

/// Turns market state into at most one volatility signal per call.
///
/// Implementations keep their own rolling state, must not mutate `state`, and
/// return `None` while warming up or when the value sits in the normal band.
pub trait VolatilityModel: Send {
    fn name(&self) -> &'static str;
    fn instrument(&self) -> InstrumentId;
    fn update(&mut self, state: &MarketState) -> Option<VolSignal>;
}

pub type DynVolatilityModel = Box<dyn VolatilityModel>;
