use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::events::{Candle, Tick};
use crate::types::instrument::InstrumentId;

/// Buckets ticks into fixed-interval OHLCV candles, one open bar per instrument.
///
/// A bar is emitted when the first tick of the next bucket arrives, so the
/// last partial bar of a finite feed is never emitted.
#[derive(Debug)]
pub struct CandleAggregator {
    interval_ms: i64,
    open_bars: HashMap<InstrumentId, OpenBar>,
}

#[derive(Debug, Clone)]
struct OpenBar {
    bucket: i64,
    candle: Candle,
}

impl CandleAggregator {
    pub fn new(interval: TimeDelta) -> Self {
        Self {
            interval_ms: interval.num_milliseconds().max(1),
            open_bars: HashMap::new(),
        }
    }

    fn bucket_of(&self, timestamp: DateTime<Utc>) -> i64 {
        timestamp.timestamp_millis().div_euclid(self.interval_ms)
    }

    fn bucket_start(&self, bucket: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(bucket * self.interval_ms).unwrap_or_default()
    }

    /// Folds `tick` into its bar and returns the bar it closed, if any.
    pub fn on_tick(&mut self, tick: &Tick) -> Option<Candle> {
        let bucket = self.bucket_of(tick.timestamp);
        let bucket_start = self.bucket_start(bucket);

        let open_bucket = self.open_bars.get(&tick.instrument).map(|open| open.bucket);
        match open_bucket {
            Some(open_bucket) if open_bucket == bucket => {
                if let Some(open) = self.open_bars.get_mut(&tick.instrument) {
                    let candle = &mut open.candle;
                    if tick.last_price > candle.high {
                        candle.high = tick.last_price;
                    }
                    if tick.last_price < candle.low {
                        candle.low = tick.last_price;
                    }
                    candle.close = tick.last_price;
                    candle.volume = candle.volume.saturating_add(tick.volume);
                    candle.open_interest = tick.open_interest.or(candle.open_interest);
                }
                None
            }
            // Late ticks from an earlier bucket are dropped.
            Some(open_bucket) if bucket < open_bucket => None,
            _ => {
                let fresh = OpenBar {
                    bucket,
                    candle: Candle {
                        instrument: tick.instrument,
                        timestamp: bucket_start,
                        open: tick.last_price,
                        high: tick.last_price,
                        low: tick.last_price,
                        close: tick.last_price,
                        volume: tick.volume,
                        open_interest: tick.open_interest,
                    },
                };
                self.open_bars
                    .insert(tick.instrument, fresh)
                    .map(|closed| closed.candle)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::event_loop::test_support::{tick, ts};

    #[test]
    fn test_emits_bar_on_bucket_roll() {
        let mut aggregator = CandleAggregator::new(TimeDelta::seconds(60));

        assert!(aggregator.on_tick(&tick(1, 0, 100.0)).is_none());
        assert!(aggregator.on_tick(&tick(1, 10, 104.0)).is_none());
        assert!(aggregator.on_tick(&tick(1, 20, 98.0)).is_none());
        assert!(aggregator.on_tick(&tick(1, 59, 101.0)).is_none());

        let closed = aggregator.on_tick(&tick(1, 61, 102.0)).unwrap();
        assert_eq!(closed.open.as_f64(), 100.0);
        assert_eq!(closed.high.as_f64(), 104.0);
        assert_eq!(closed.low.as_f64(), 98.0);
        assert_eq!(closed.close.as_f64(), 101.0);
        assert_eq!(closed.volume, 400);
        assert_eq!(closed.timestamp, ts(0));
    }

    #[test]
    fn test_instruments_are_independent() {
        let mut aggregator = CandleAggregator::new(TimeDelta::seconds(60));

        aggregator.on_tick(&tick(1, 0, 100.0));
        assert!(aggregator.on_tick(&tick(2, 120, 50.0)).is_none());

        let closed = aggregator.on_tick(&tick(1, 120, 101.0)).unwrap();
        assert_eq!(closed.instrument, InstrumentId::new(1));
    }

    #[test]
    fn test_late_tick_is_ignored() {
        let mut aggregator = CandleAggregator::new(TimeDelta::seconds(60));

        aggregator.on_tick(&tick(1, 120, 100.0));
        assert!(aggregator.on_tick(&tick(1, 0, 500.0)).is_none());

        let closed = aggregator.on_tick(&tick(1, 200, 101.0)).unwrap();
        assert_eq!(closed.high.as_f64(), 100.0);
    }
}
