use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{instrument::InstrumentId, price::Price};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub instrument: InstrumentId,
    pub quantity: u32,
    pub order_type: OrderType,
    pub side: Side,
    pub price: Option<Price>,
    pub trigger_price: Option<Price>,
}

impl OrderRequest {
    pub fn market(instrument: InstrumentId, side: Side, quantity: u32) -> Self {
        Self {
            instrument,
            quantity,
            order_type: OrderType::Market,
            side,
            price: None,
            trigger_price: None,
        }
    }

    pub fn limit(instrument: InstrumentId, side: Side, quantity: u32, price: Price) -> Self {
        Self {
            order_type: OrderType::Limit,
            price: Some(price),
            ..Self::market(instrument, side, quantity)
        }
    }
}

/// Fields of a pending order that may be amended; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderModification {
    pub price: Option<Price>,
    pub quantity: Option<u32>,
    pub trigger_price: Option<Price>,
}

impl OrderModification {
    pub fn apply_to(&self, order: &mut OrderRequest) {
        if let Some(price) = self.price {
            order.price = Some(price);
        }
        if let Some(quantity) = self.quantity {
            order.quantity = quantity;
        }
        if let Some(trigger_price) = self.trigger_price {
            order.trigger_price = Some(trigger_price);
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    Filled,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub order_id: String,
    pub status: OrderStatus,
    pub filled_quantity: u32,
    pub avg_price: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub instrument: InstrumentId,
    /// Signed: positive long, negative short.
    pub quantity: i64,
    pub avg_price: f64,
    pub pnl: f64,
}

impl Position {
    /// Folds a fill into the position.
    ///
    /// The average price is reset when opening from flat or flipping sides,
    /// volume-weighted when adding, and kept when reducing.
    pub fn apply_fill(&mut self, side: Side, quantity: u32, price: f64) {
        let delta = side.sign() * i64::from(quantity);
        let previous = self.quantity;
        let next = previous + delta;

        self.avg_price = if previous == 0 || previous.signum() * next.signum() < 0 {
            price
        } else if next.abs() > previous.abs() {
            let previous_abs = previous.abs() as f64;
            let delta_abs = delta.abs() as f64;
            (self.avg_price * previous_abs + price * delta_abs) / (previous_abs + delta_abs)
        } else {
            self.avg_price
        };
        self.quantity = next;
    }

    pub fn flat(instrument: InstrumentId) -> Self {
        Self {
            instrument,
            quantity: 0,
            avg_price: 0.0,
            pnl: 0.0,
        }
    }
}
