use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::types::trade_action::TradeAction;

/// Downstream of the risk filter. Called exactly once per tick, possibly with
/// an empty slice.
#[async_trait]
pub trait ActionSink: Send {
    async fn publish(&mut self, timestamp: DateTime<Utc>, actions: &[TradeAction]) -> Result<()>;
}

pub type DynActionSink = Box<dyn ActionSink>;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogActionSink;

#[async_trait]
impl ActionSink for LogActionSink {
    async fn publish(&mut self, timestamp: DateTime<Utc>, actions: &[TradeAction]) -> Result<()> {
        for action in actions {
            info!(%timestamp, %action, metadata = ?action.metadata, "Published action");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedActions {
    pub timestamp: DateTime<Utc>,
    pub actions: Vec<TradeAction>,
}

pub type PublishedSender = broadcast::Sender<PublishedActions>;

/// Fans non-empty action sets out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastActionSink {
    sender: PublishedSender,
}

impl BroadcastActionSink {
    pub fn new(sender: PublishedSender) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ActionSink for BroadcastActionSink {
    async fn publish(&mut self, timestamp: DateTime<Utc>, actions: &[TradeAction]) -> Result<()> {
        if actions.is_empty() {
            return Ok(());
        }

        let published = PublishedActions {
            timestamp,
            actions: actions.to_vec(),
        };
        if self.sender.send(published).is_err() {
            debug!("no subscribers for published actions");
        }
        Ok(())
    }
}
