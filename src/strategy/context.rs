use crate::market::market_state::MarketState;
use crate::signals::vol_signal::VolSignal;
use crate::types::instrument::InstrumentId;

/// Everything a strategy may look at for the current tick. Built fresh per
/// tick and dropped once every strategy has run.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    pub state: &'a MarketState,
    pub signals: &'a [VolSignal],
}

impl<'a> StrategyContext<'a> {
    pub fn new(state: &'a MarketState, signals: &'a [VolSignal]) -> Self {
        Self { state, signals }
    }

    /// First signal of the tick targeting `instrument`; later ones are ignored.
    pub fn first_signal_for(&self, instrument: InstrumentId) -> Option<&'a VolSignal> {
        self.signals
            .iter()
            .find(|signal| signal.instrument == instrument)
    }
}
