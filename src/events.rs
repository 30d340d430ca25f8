use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{instrument::InstrumentId, price::Price};

/// A single last-traded-price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub instrument: InstrumentId,
    pub timestamp: DateTime<Utc>,
    pub last_price: Price,
    pub volume: u64,
    #[serde(default)]
    pub open_interest: Option<u64>,
}

impl Tick {
    pub fn new(
        instrument: InstrumentId,
        timestamp: DateTime<Utc>,
        last_price: Price,
        volume: u64,
    ) -> Self {
        Self {
            instrument,
            timestamp,
            last_price,
            volume,
            open_interest: None,
        }
    }
}

/// OHLCV aggregate. Bar shape (high >= low etc.) is the producer's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub instrument: InstrumentId,
    pub timestamp: DateTime<Utc>,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: u64,
    #[serde(default)]
    pub open_interest: Option<u64>,
}
