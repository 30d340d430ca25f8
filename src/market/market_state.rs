use std::collections::{HashMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};

use crate::events::{Candle, Tick};
use crate::types::instrument::InstrumentId;
use crate::types::price::Price;

/// Rolling view of the market for one engine run.
///
/// Only [`EventLoop`](crate::market::event_loop::EventLoop) mutates this; every
/// other component sees it through a shared reference.
#[derive(Clone, Default)]
pub struct MarketState {
    last_ticks: HashMap<InstrumentId, Tick>,
    tick_sequences: HashMap<InstrumentId, u64>,
    recent_candles: HashMap<InstrumentId, VecDeque<Candle>>,
    candle_revisions: HashMap<InstrumentId, u64>,
    positions: HashMap<InstrumentId, i64>,
    timestamp: Option<DateTime<Utc>>,
}

impl MarketState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_tick(&self, instrument: InstrumentId) -> Option<&Tick> {
        self.last_ticks.get(&instrument)
    }

    /// Last traded price, or `None` when missing or not strictly positive.
    pub fn last_price(&self, instrument: InstrumentId) -> Option<Price> {
        self.last_tick(instrument)
            .map(|tick| tick.last_price)
            .filter(|price| price.is_positive())
    }

    /// Number of ticks applied for `instrument` so far.
    pub fn tick_sequence(&self, instrument: InstrumentId) -> u64 {
        self.tick_sequences.get(&instrument).copied().unwrap_or(0)
    }

    pub fn recent_candles(&self, instrument: InstrumentId) -> Option<&VecDeque<Candle>> {
        self.recent_candles.get(&instrument)
    }

    /// Bumped every time the candle list of `instrument` changes.
    pub fn candle_revision(&self, instrument: InstrumentId) -> u64 {
        self.candle_revisions.get(&instrument).copied().unwrap_or(0)
    }

    pub fn position(&self, instrument: InstrumentId) -> i64 {
        self.positions.get(&instrument).copied().unwrap_or(0)
    }

    pub fn positions(&self) -> &HashMap<InstrumentId, i64> {
        &self.positions
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub(crate) fn record_tick(&mut self, tick: Tick) {
        self.timestamp = Some(tick.timestamp);
        *self.tick_sequences.entry(tick.instrument).or_default() += 1;
        self.last_ticks.insert(tick.instrument, tick);
    }

    pub(crate) fn replace_positions(&mut self, positions: HashMap<InstrumentId, i64>) {
        self.positions = positions;
    }

    pub(crate) fn replace_candles(&mut self, instrument: InstrumentId, candles: VecDeque<Candle>) {
        self.recent_candles.insert(instrument, candles);
        *self.candle_revisions.entry(instrument).or_default() += 1;
    }

    pub(crate) fn append_candle(&mut self, candle: Candle, capacity: usize) {
        let instrument = candle.instrument;
        let candles = self.recent_candles.entry(instrument).or_default();
        candles.push_back(candle);
        while candles.len() > capacity {
            candles.pop_front();
        }
        *self.candle_revisions.entry(instrument).or_default() += 1;
    }
}

impl fmt::Debug for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketState")
            .field("instruments", &self.last_ticks.len())
            .field(
                "last_prices",
                &self
                    .last_ticks
                    .iter()
                    .map(|(id, tick)| (*id, tick.last_price.as_f64()))
                    .collect::<HashMap<_, _>>(),
            )
            .field("positions", &self.positions)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}
