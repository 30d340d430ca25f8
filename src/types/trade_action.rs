use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{instrument::InstrumentId, price::Price};

/// Free-form, execution-specific annotations attached to an action.
pub type ActionMetadata = Map<String, Value>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    OpenLong,
    OpenShort,
    CloseLong,
    CloseShort,
}

impl ActionKind {
    /// Signed change in net exposure for one unit of this action.
    pub fn exposure_sign(self) -> i64 {
        match self {
            ActionKind::OpenLong | ActionKind::CloseShort => 1,
            ActionKind::OpenShort | ActionKind::CloseLong => -1,
        }
    }

    pub fn is_opening(self) -> bool {
        matches!(self, ActionKind::OpenLong | ActionKind::OpenShort)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::OpenLong => write!(f, "OPEN_LONG"),
            ActionKind::OpenShort => write!(f, "OPEN_SHORT"),
            ActionKind::CloseLong => write!(f, "CLOSE_LONG"),
            ActionKind::CloseShort => write!(f, "CLOSE_SHORT"),
        }
    }
}

/// A trade intent produced by a strategy. Nothing here is an order yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAction {
    pub kind: ActionKind,
    pub instrument: InstrumentId,
    pub quantity: u32,
    pub limit_price: Option<Price>,
    pub metadata: Option<ActionMetadata>,
}

impl TradeAction {
    pub fn new(kind: ActionKind, instrument: InstrumentId, quantity: u32) -> Self {
        assert!(quantity > 0, "trade action quantity must be positive");

        Self {
            kind,
            instrument,
            quantity,
            limit_price: None,
            metadata: None,
        }
    }

    pub fn with_limit_price(mut self, price: Price) -> Self {
        self.limit_price = Some(price);
        self
    }

    pub fn with_metadata(mut self, metadata: ActionMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref()?.get(key)
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} x{}", self.kind, self.instrument, self.quantity)?;
        if let Some(price) = self.limit_price {
            write!(f, " @ {price}")?;
        }
        Ok(())
    }
}
