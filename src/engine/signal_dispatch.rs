use std::fmt;

use serde::Deserialize;

/// How often a strategy's `on_vol_signal` hook runs on a tick that produced
/// signals.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalDispatch {
    /// Once per signal present on the tick, each call seeing the full list.
    #[default]
    PerSignal,
    /// Once per tick when at least one signal is present.
    Once,
}

impl SignalDispatch {
    pub fn calls_for(self, signal_count: usize) -> usize {
        match self {
            SignalDispatch::PerSignal => signal_count,
            SignalDispatch::Once => usize::from(signal_count > 0),
        }
    }
}

impl fmt::Display for SignalDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalDispatch::PerSignal => write!(f, "per_signal"),
            SignalDispatch::Once => write!(f, "once"),
        }
    }
}
