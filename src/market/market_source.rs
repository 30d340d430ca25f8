use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::events::Tick;
use crate::types::instrument::InstrumentId;

/// Lazy, non-restartable sequence of ticks. Live feeds never end on their own.
pub type TickStream = BoxStream<'static, Result<Tick>>;

#[async_trait]
pub trait MarketFeed: Send {
    async fn subscribe(&mut self, instruments: &[InstrumentId]) -> Result<()>;

    /// Hands out the tick sequence. Calling it a second time is an error.
    fn stream(&mut self) -> Result<TickStream>;
}

pub type DynMarketFeed = Box<dyn MarketFeed>;
