use crate::types::instrument::InstrumentId;

/// The single underlying a strategy instance trades, and its lot size.
#[derive(Debug, Clone, Copy)]
pub struct InstrumentContext {
    pub underlying: InstrumentId,
    pub lot_size: u32,
}

impl InstrumentContext {
    pub fn new(underlying: InstrumentId, lot_size: u32) -> Self {
        Self {
            underlying,
            lot_size,
        }
    }
}

pub trait WithContext {
    fn ctx(&self) -> &InstrumentContext;
}
