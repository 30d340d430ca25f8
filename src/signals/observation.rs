use chrono::{DateTime, Utc};

use crate::events::Candle;
use crate::market::market_state::MarketState;
use crate::types::instrument::InstrumentId;

/// Remembers which tick of an instrument a model already consumed, so a
/// model invoked on another instrument's tick does not re-read a stale price.
#[derive(Debug, Clone, Default)]
pub struct PriceCursor {
    last_sequence: u64,
}

impl PriceCursor {
    /// Returns the newest positive price not yet consumed.
    pub fn next_price(
        &mut self,
        state: &MarketState,
        instrument: InstrumentId,
    ) -> Option<(f64, DateTime<Utc>)> {
        let sequence = state.tick_sequence(instrument);
        if sequence == self.last_sequence {
            return None;
        }
        self.last_sequence = sequence;

        let tick = state.last_tick(instrument)?;
        let price = tick.last_price.as_f64();
        (price > 0.0).then_some((price, tick.timestamp))
    }
}

/// Same idea as [`PriceCursor`] for the recent-candle list.
#[derive(Debug, Clone, Default)]
pub struct CandleCursor {
    last_revision: u64,
}

impl CandleCursor {
    /// Returns the candle list when it changed since the previous call.
    pub fn next_candles<'a>(
        &mut self,
        state: &'a MarketState,
        instrument: InstrumentId,
    ) -> Option<Vec<&'a Candle>> {
        let revision = state.candle_revision(instrument);
        if revision == self.last_revision {
            return None;
        }
        self.last_revision = revision;

        let candles = state.recent_candles(instrument)?;
        (!candles.is_empty()).then(|| candles.iter().collect())
    }
}
