use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use futures_util::{StreamExt, stream};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Deserialize;
use tracing::info;

use crate::{
    events::Tick,
    market::market_source::{MarketFeed, TickStream},
    types::{instrument::InstrumentId, price::Price},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticPath {
    /// `start + round`, strictly increasing.
    #[default]
    Ramp,
    RandomWalk,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyntheticFeedParams {
    pub interval_ms: u64,
    pub start_price: f64,
    pub path: SyntheticPath,
    /// Max relative move per step on the random walk.
    pub step_volatility: f64,
    pub seed: Option<u64>,
}

impl Default for SyntheticFeedParams {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            start_price: 100.0,
            path: SyntheticPath::Ramp,
            step_volatility: 0.002,
            seed: None,
        }
    }
}

impl SyntheticFeedParams {
    pub fn validate(&self) -> Result<()> {
        if !self.start_price.is_finite() || self.start_price <= 0.0 {
            bail!("synthetic start_price must be positive, got {}", self.start_price);
        }
        if !self.step_volatility.is_finite() || !(0.0..1.0).contains(&self.step_volatility) {
            bail!(
                "synthetic step_volatility must lie in [0, 1), got {}",
                self.step_volatility
            );
        }
        Ok(())
    }
}

/// Infinite generator: one tick per subscribed instrument per round.
#[derive(Debug)]
pub struct SyntheticFeed {
    params: SyntheticFeedParams,
    instruments: Vec<InstrumentId>,
    streamed: bool,
}

struct Walk {
    params: SyntheticFeedParams,
    instruments: Vec<InstrumentId>,
    prices: Vec<f64>,
    rng: StdRng,
    round: u64,
    index: usize,
}

impl Walk {
    fn next_tick(&mut self) -> Result<Tick> {
        let instrument = self.instruments[self.index];
        let price = match self.params.path {
            SyntheticPath::Ramp => self.params.start_price + self.round as f64,
            SyntheticPath::RandomWalk => {
                let step = self.params.step_volatility;
                let current = &mut self.prices[self.index];
                if self.round > 0 {
                    *current *= 1.0 + self.rng.random_range(-step..=step);
                }
                *current
            }
        };

        let tick = Tick::new(
            instrument,
            Utc::now(),
            Price::try_new(price)?,
            1_000 + self.round,
        );

        self.index += 1;
        if self.index == self.instruments.len() {
            self.index = 0;
            self.round += 1;
        }
        Ok(tick)
    }
}

impl SyntheticFeed {
    pub fn new(params: SyntheticFeedParams) -> Result<Self> {
        params.validate()?;

        Ok(Self {
            params,
            instruments: Vec::new(),
            streamed: false,
        })
    }
}

#[async_trait]
impl MarketFeed for SyntheticFeed {
    async fn subscribe(&mut self, instruments: &[InstrumentId]) -> Result<()> {
        for instrument in instruments {
            if !self.instruments.contains(instrument) {
                self.instruments.push(*instrument);
            }
        }
        Ok(())
    }

    fn stream(&mut self) -> Result<TickStream> {
        if self.streamed {
            bail!("synthetic feed stream already taken");
        }
        if self.instruments.is_empty() {
            bail!("synthetic feed has no subscribed instruments");
        }
        self.streamed = true;

        let seed = self.params.seed.unwrap_or_else(|| rand::rng().random());
        info!(
            instruments = self.instruments.len(),
            path = ?self.params.path,
            seed,
            "Synthetic feed started"
        );

        let walk = Walk {
            params: self.params.clone(),
            prices: vec![self.params.start_price; self.instruments.len()],
            instruments: self.instruments.clone(),
            rng: StdRng::seed_from_u64(seed),
            round: 0,
            index: 0,
        };
        let interval = Duration::from_millis(self.params.interval_ms);

        Ok(stream::unfold(walk, move |mut walk| async move {
            if walk.index == 0 && walk.round > 0 && !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }
            let tick = walk.next_tick();
            Some((tick, walk))
        })
        .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(path: SyntheticPath) -> SyntheticFeedParams {
        SyntheticFeedParams {
            interval_ms: 0,
            path,
            seed: Some(7),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_ramp_round_robins_instruments() {
        let mut feed = SyntheticFeed::new(params(SyntheticPath::Ramp)).unwrap();
        feed.subscribe(&[InstrumentId::new(1), InstrumentId::new(2)])
            .await
            .unwrap();

        let ticks: Vec<Tick> = feed
            .stream()
            .unwrap()
            .take(4)
            .map(|tick| tick.unwrap())
            .collect()
            .await;

        let seen: Vec<(u32, f64, u64)> = ticks
            .iter()
            .map(|t| (t.instrument.token(), t.last_price.as_f64(), t.volume))
            .collect();
        assert_eq!(
            seen,
            vec![
                (1, 100.0, 1000),
                (2, 100.0, 1000),
                (1, 101.0, 1001),
                (2, 101.0, 1001)
            ]
        );
    }

    #[tokio::test]
    async fn test_random_walk_is_seeded_and_positive() {
        let collect = || async {
            let mut feed = SyntheticFeed::new(params(SyntheticPath::RandomWalk)).unwrap();
            feed.subscribe(&[InstrumentId::new(1)]).await.unwrap();
            feed.stream()
                .unwrap()
                .take(50)
                .map(|tick| tick.unwrap().last_price.as_f64())
                .collect::<Vec<_>>()
                .await
        };

        let first = collect().await;
        let second = collect().await;

        assert_eq!(first, second);
        assert_eq!(first[0], 100.0);
        assert!(first.iter().all(|price| *price > 0.0));
        assert!(first.windows(2).any(|pair| pair[0] != pair[1]));
    }

    #[tokio::test]
    async fn test_stream_is_not_restartable() {
        let mut feed = SyntheticFeed::new(params(SyntheticPath::Ramp)).unwrap();
        assert!(feed.stream().is_err());

        feed.subscribe(&[InstrumentId::new(1)]).await.unwrap();
        assert!(feed.stream().is_ok());
        assert!(feed.stream().is_err());
    }

    #[test]
    fn test_rejects_bad_params() {
        let bad = SyntheticFeedParams {
            start_price: 0.0,
            ..Default::default()
        };
        assert!(SyntheticFeed::new(bad).is_err());
    }
}
