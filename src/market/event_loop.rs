use std::collections::HashMap;

use crate::events::{Candle, Tick};
use crate::market::market_state::MarketState;
use crate::types::instrument::InstrumentId;

pub const DEFAULT_CANDLE_CAPACITY: usize = 500;

/// Sole writer of [`MarketState`]. No validation happens here: price sign and
/// timestamp ordering are the feed's concern.
#[derive(Debug)]
pub struct EventLoop {
    state: MarketState,
    candle_capacity: usize,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        Self::with_candle_capacity(DEFAULT_CANDLE_CAPACITY)
    }

    pub fn with_candle_capacity(candle_capacity: usize) -> Self {
        Self {
            state: MarketState::new(),
            candle_capacity: candle_capacity.max(1),
        }
    }

    pub fn apply_tick(&mut self, tick: Tick) -> &MarketState {
        self.state.record_tick(tick);
        &self.state
    }

    /// Replaces the whole positions map; instruments not present become flat.
    pub fn apply_positions(&mut self, positions: HashMap<InstrumentId, i64>) -> &MarketState {
        self.state.replace_positions(positions);
        &self.state
    }

    /// Replaces the candle list for `instrument` as given.
    pub fn set_candles(&mut self, instrument: InstrumentId, candles: Vec<Candle>) {
        self.state.replace_candles(instrument, candles.into());
    }

    /// Appends one candle, evicting the oldest beyond the configured capacity.
    pub fn push_candle(&mut self, candle: Candle) {
        self.state.append_candle(candle, self.candle_capacity);
    }

    pub fn state(&self) -> &MarketState {
        &self.state
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::events::{Candle, Tick};
    use crate::types::{instrument::InstrumentId, price::Price};

    pub fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_699_999_980 + seconds, 0).unwrap()
    }

    pub fn tick(instrument: u32, seconds: i64, price: f64) -> Tick {
        Tick::new(InstrumentId::new(instrument), ts(seconds), Price::new(price), 100)
    }

    pub fn candle(instrument: u32, seconds: i64, ohlc: (f64, f64, f64, f64)) -> Candle {
        let (open, high, low, close) = ohlc;
        Candle {
            instrument: InstrumentId::new(instrument),
            timestamp: ts(seconds),
            open: Price::new(open),
            high: Price::new(high),
            low: Price::new(low),
            close: Price::new(close),
            volume: 1_000,
            open_interest: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{candle, tick, ts};
    use super::*;

    #[test]
    fn test_apply_tick_replaces_last_tick() {
        let mut event_loop = EventLoop::new();
        let id = InstrumentId::new(123);

        event_loop.apply_tick(tick(123, 0, 100.0));
        let state = event_loop.apply_tick(tick(123, 5, 101.5));

        assert_eq!(state.last_price(id).unwrap().as_f64(), 101.5);
        assert_eq!(state.timestamp(), Some(ts(5)));
        assert_eq!(state.tick_sequence(id), 2);
        assert_eq!(state.tick_sequence(InstrumentId::new(9)), 0);
    }

    #[test]
    fn test_apply_tick_does_not_validate() {
        let mut event_loop = EventLoop::new();
        event_loop.apply_tick(tick(1, 10, 100.0));
        let state = event_loop.apply_tick(tick(1, 3, 0.0));

        // Out-of-order time is accepted, zero price is stored but not priced.
        assert_eq!(state.timestamp(), Some(ts(3)));
        assert!(state.last_tick(InstrumentId::new(1)).is_some());
        assert!(state.last_price(InstrumentId::new(1)).is_none());
    }

    #[test]
    fn test_apply_positions_is_wholesale() {
        let mut event_loop = EventLoop::new();
        let a = InstrumentId::new(1);
        let b = InstrumentId::new(2);

        event_loop.apply_positions(HashMap::from([(a, 5), (b, -3)]));
        let state = event_loop.apply_positions(HashMap::from([(b, 1)]));

        assert_eq!(state.position(a), 0);
        assert_eq!(state.position(b), 1);
        assert_eq!(state.positions().len(), 1);
    }

    #[test]
    fn test_set_candles_replaces_list() {
        let mut event_loop = EventLoop::new();
        let id = InstrumentId::new(4);

        event_loop.set_candles(
            id,
            vec![
                candle(4, 0, (1.0, 2.0, 0.5, 1.5)),
                candle(4, 60, (1.5, 2.5, 1.0, 2.0)),
            ],
        );
        event_loop.set_candles(id, vec![candle(4, 120, (2.0, 3.0, 1.5, 2.5))]);

        let candles = event_loop.state().recent_candles(id).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].timestamp, ts(120));
        assert_eq!(event_loop.state().candle_revision(id), 2);
    }

    #[test]
    fn test_push_candle_is_bounded() {
        let mut event_loop = EventLoop::with_candle_capacity(2);
        let id = InstrumentId::new(4);

        for i in 0..3 {
            event_loop.push_candle(candle(4, i * 60, (1.0, 2.0, 0.5, 1.5)));
        }

        let candles = event_loop.state().recent_candles(id).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles.front().unwrap().timestamp, ts(60));
        assert_eq!(event_loop.state().candle_revision(id), 3);
    }
}
