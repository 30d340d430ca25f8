use anyhow::{Result, bail};

use crate::market::market_state::MarketState;
use crate::signals::{DynVolatilityModel, VolatilityModel};
use crate::signals::vol_signal::{VolKind, VolSignal};
use crate::types::instrument::InstrumentId;

/// Majority vote over child models watching the same instrument.
pub struct CompositeVolModel {
    instrument: InstrumentId,
    models: Vec<DynVolatilityModel>,
}

impl CompositeVolModel {
    pub fn new(models: Vec<DynVolatilityModel>) -> Result<Self> {
        let Some(first) = models.first() else {
            bail!("composite vol model needs at least one child model");
        };

        let instrument = first.instrument();
        if let Some(stray) = models.iter().find(|model| model.instrument() != instrument) {
            bail!(
                "composite vol model for {instrument} cannot contain {} watching {}",
                stray.name(),
                stray.instrument()
            );
        }

        Ok(Self { instrument, models })
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }
}

impl VolatilityModel for CompositeVolModel {
    fn name(&self) -> &'static str {
        "composite_vol"
    }

    fn instrument(&self) -> InstrumentId {
        self.instrument
    }

    fn update(&mut self, state: &MarketState) -> Option<VolSignal> {
        let mut ups: Vec<VolSignal> = Vec::new();
        let mut downs: Vec<VolSignal> = Vec::new();

        // Every child is updated, even once the vote is decided, to keep
        // their rolling state in step.
        for model in &mut self.models {
            match model.update(state) {
                Some(signal) if signal.kind == VolKind::Up => ups.push(signal),
                Some(signal) => downs.push(signal),
                None => {}
            }
        }

        let (kind, winners) = if ups.len() > downs.len() {
            (VolKind::Up, ups)
        } else if downs.len() > ups.len() {
            (VolKind::Down, downs)
        } else {
            return None;
        };

        let strength =
            winners.iter().map(|signal| signal.strength).sum::<f64>() / winners.len() as f64;
        let timestamp = winners.iter().map(|signal| signal.timestamp).max()?;

        Some(VolSignal::new(self.instrument, kind, strength, timestamp))
    }
}
