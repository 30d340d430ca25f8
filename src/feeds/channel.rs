use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::{
    events::Tick,
    market::market_source::{MarketFeed, TickStream},
    types::instrument::InstrumentId,
};

/// Producer half of a [`ChannelFeed`]. Cheap to clone, usable from any task
/// or thread.
#[derive(Debug, Clone)]
pub struct TickProducer {
    sender: UnboundedSender<Result<Tick>>,
}

impl TickProducer {
    pub fn push(&self, tick: Tick) -> Result<()> {
        self.sender
            .send(Ok(tick))
            .map_err(|_| anyhow!("tick channel closed"))
    }

    /// Surfaces a producer-side failure to the consumer as a stream error.
    pub fn fail(&self, error: anyhow::Error) -> Result<()> {
        self.sender
            .send(Err(error))
            .map_err(|_| anyhow!("tick channel closed"))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Unbounded FIFO between a producer and the engine. The stream waits for
/// the next tick and ends once every producer is dropped.
#[derive(Debug)]
pub struct ChannelFeed {
    receiver: Option<UnboundedReceiver<Result<Tick>>>,
    subscribed: Vec<InstrumentId>,
}

impl ChannelFeed {
    pub fn new() -> (Self, TickProducer) {
        let (sender, receiver) = mpsc::unbounded_channel();

        let feed = Self {
            receiver: Some(receiver),
            subscribed: Vec::new(),
        };
        (feed, TickProducer { sender })
    }

    pub fn subscribed(&self) -> &[InstrumentId] {
        &self.subscribed
    }
}

#[async_trait]
impl MarketFeed for ChannelFeed {
    async fn subscribe(&mut self, instruments: &[InstrumentId]) -> Result<()> {
        self.subscribed.extend_from_slice(instruments);
        debug!(instruments = ?self.subscribed, "Channel feed subscribed");
        Ok(())
    }

    fn stream(&mut self) -> Result<TickStream> {
        let Some(receiver) = self.receiver.take() else {
            bail!("channel feed stream already taken");
        };

        Ok(stream::unfold(receiver, |mut receiver| async move {
            let item = receiver.recv().await?;
            Some((item, receiver))
        })
        .boxed())
    }
}
