use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::instrument::InstrumentId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolKind {
    #[serde(rename = "VOL_UP")]
    Up,
    #[serde(rename = "VOL_DOWN")]
    Down,
}

impl fmt::Display for VolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolKind::Up => write!(f, "VOL_UP"),
            VolKind::Down => write!(f, "VOL_DOWN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolSignal {
    pub instrument: InstrumentId,
    pub kind: VolKind,
    /// Always within [0, 1].
    pub strength: f64,
    pub timestamp: DateTime<Utc>,
}

impl VolSignal {
    /// Clamps `strength` into [0, 1]; NaN becomes 0.
    pub fn new(
        instrument: InstrumentId,
        kind: VolKind,
        strength: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let strength = if strength.is_nan() {
            0.0
        } else {
            strength.clamp(0.0, 1.0)
        };

        Self {
            instrument,
            kind,
            strength,
            timestamp,
        }
    }
}
