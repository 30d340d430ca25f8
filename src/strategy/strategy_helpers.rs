use serde_json::Value;

use crate::{
    signals::vol_signal::VolSignal,
    strategy::{context::StrategyContext, instrument_context::WithContext},
    types::trade_action::{ActionKind, ActionMetadata, TradeAction},
};

pub trait StrategyHelpers: WithContext {
    fn relevant_signal<'a>(&self, ctx: &StrategyContext<'a>) -> Option<&'a VolSignal> {
        ctx.first_signal_for(self.ctx().underlying)
    }

    fn underlying_price(&self, ctx: &StrategyContext<'_>) -> Option<f64> {
        ctx.state
            .last_price(self.ctx().underlying)
            .map(|price| price.as_f64())
    }

    /// One lot on the underlying, tagged with leg metadata.
    fn leg(&self, kind: ActionKind, fields: &[(&str, Value)]) -> TradeAction {
        let metadata: ActionMetadata = fields
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect();

        TradeAction::new(kind, self.ctx().underlying, self.ctx().lot_size).with_metadata(metadata)
    }
}

impl<T: WithContext> StrategyHelpers for T {}
