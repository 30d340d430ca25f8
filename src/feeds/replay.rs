use std::path::Path;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use tracing::info;

use crate::{
    events::{Candle, Tick},
    market::market_source::{MarketFeed, TickStream},
    types::instrument::InstrumentId,
};

/// Finite historical replay. Every candle becomes four ticks carrying its
/// timestamp: open, high, low, close, in that order.
#[derive(Debug)]
pub struct ReplayFeed {
    candles: Vec<Candle>,
    subscribed: Vec<InstrumentId>,
    streamed: bool,
}

impl ReplayFeed {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self {
            candles,
            subscribed: Vec::new(),
            streamed: false,
        }
    }

    /// Reads a JSON array of candles.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read candles from {}", path.display()))?;
        let candles: Vec<Candle> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse candles in {}", path.display()))?;

        info!(candles = candles.len(), path = %path.display(), "Loaded replay candles");

        Ok(Self::new(candles))
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Ticks in replay order. The sort is stable, so candles sharing a
    /// timestamp keep their input order and their own O/H/L/C order.
    pub fn ticks(&self) -> Vec<Tick> {
        let mut ticks: Vec<Tick> = self
            .candles
            .iter()
            .filter(|candle| self.is_subscribed(candle.instrument))
            .flat_map(|candle| {
                [candle.open, candle.high, candle.low, candle.close].map(|price| Tick {
                    instrument: candle.instrument,
                    timestamp: candle.timestamp,
                    last_price: price,
                    volume: candle.volume,
                    open_interest: candle.open_interest,
                })
            })
            .collect();

        ticks.sort_by_key(|tick| tick.timestamp);
        ticks
    }

    fn is_subscribed(&self, instrument: InstrumentId) -> bool {
        self.subscribed.is_empty() || self.subscribed.contains(&instrument)
    }
}

#[async_trait]
impl MarketFeed for ReplayFeed {
    /// Narrows the replay to `instruments`; without a subscription every
    /// candle is replayed.
    async fn subscribe(&mut self, instruments: &[InstrumentId]) -> Result<()> {
        self.subscribed.extend_from_slice(instruments);
        Ok(())
    }

    fn stream(&mut self) -> Result<TickStream> {
        if self.streamed {
            bail!("replay feed stream already taken");
        }
        self.streamed = true;

        let ticks = self.ticks();
        info!(ticks = ticks.len(), "Replay started");

        Ok(stream::iter(ticks.into_iter().map(Ok)).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::event_loop::test_support::{candle, ts};

    #[tokio::test]
    async fn test_each_candle_yields_four_ticks_in_time_order() {
        let mut feed = ReplayFeed::new(vec![
            candle(1, 60, (10.0, 12.0, 9.0, 11.0)),
            candle(2, 0, (50.0, 51.0, 49.0, 50.5)),
            candle(1, 0, (8.0, 10.0, 7.5, 10.0)),
        ]);

        let ticks: Vec<Tick> = feed
            .stream()
            .unwrap()
            .map(|tick| tick.unwrap())
            .collect()
            .await;

        assert_eq!(ticks.len(), 12);
        let first_four: Vec<(u32, f64)> = ticks[..4]
            .iter()
            .map(|t| (t.instrument.token(), t.last_price.as_f64()))
            .collect();
        assert_eq!(first_four, vec![(2, 50.0), (2, 51.0), (2, 49.0), (2, 50.5)]);
        assert_eq!(ticks[4].instrument, InstrumentId::new(1));
        assert_eq!(ticks[4].last_price.as_f64(), 8.0);
        assert_eq!(ticks[11].timestamp, ts(60));
        assert_eq!(ticks[11].last_price.as_f64(), 11.0);
        assert!(ticks.iter().all(|t| t.volume == 1_000));
    }

    #[tokio::test]
    async fn test_subscription_filters_instruments() {
        let mut feed = ReplayFeed::new(vec![
            candle(1, 0, (1.0, 1.0, 1.0, 1.0)),
            candle(2, 0, (2.0, 2.0, 2.0, 2.0)),
        ]);
        feed.subscribe(&[InstrumentId::new(2)]).await.unwrap();

        let ticks = feed.ticks();
        assert_eq!(ticks.len(), 4);
        assert!(ticks.iter().all(|t| t.instrument == InstrumentId::new(2)));
    }

    #[tokio::test]
    async fn test_stream_is_exhaustible_and_single_use() {
        let mut feed = ReplayFeed::new(vec![candle(1, 0, (1.0, 2.0, 0.5, 1.5))]);

        let count = feed.stream().unwrap().count().await;
        assert_eq!(count, 4);
        assert!(feed.stream().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let path =
            std::env::temp_dir().join(format!("volpipe-replay-{}.json", uuid::Uuid::new_v4()));
        let candles = vec![candle(3, 0, (1.0, 2.0, 0.5, 1.5))];
        std::fs::write(&path, serde_json::to_string(&candles).unwrap()).unwrap();

        let feed = ReplayFeed::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(feed.candles(), candles.as_slice());
        assert!(ReplayFeed::from_json_file(&path).is_err());
    }
}
