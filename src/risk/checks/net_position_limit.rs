use std::collections::HashMap;

use crate::{
    risk::{context::RiskContext, decision::RiskReason, engine::RiskCheck},
    types::{instrument::InstrumentId, trade_action::TradeAction},
};

/// Caps the absolute net exposure built up from approved actions, per
/// instrument. Actions that move exposure back towards zero always pass.
#[derive(Debug, Clone)]
pub struct NetPositionLimitCheck {
    max_net_position: i64,
    net: HashMap<InstrumentId, i64>,
}

impl NetPositionLimitCheck {
    pub fn new(max_net_position: i64) -> Self {
        Self {
            max_net_position: max_net_position.abs(),
            net: HashMap::new(),
        }
    }

    pub fn net_position(&self, instrument: InstrumentId) -> i64 {
        self.net.get(&instrument).copied().unwrap_or(0)
    }

    fn projected(&self, action: &TradeAction) -> (i64, i64) {
        let current = self.net_position(action.instrument);
        let delta = action.kind.exposure_sign() * i64::from(action.quantity);
        (current, current + delta)
    }
}

impl RiskCheck for NetPositionLimitCheck {
    fn name(&self) -> &'static str {
        "NetPositionLimitCheck"
    }

    fn evaluate(&mut self, ctx: &RiskContext) -> Result<(), Vec<RiskReason>> {
        let (current, projected) = self.projected(ctx.action);

        if projected.abs() > self.max_net_position && projected.abs() > current.abs() {
            return Err(vec![RiskReason::NetPositionLimit {
                instrument: ctx.action.instrument,
                projected,
                max_net_position: self.max_net_position,
            }]);
        }
        Ok(())
    }

    fn on_approved(&mut self, ctx: &RiskContext) {
        let (_, projected) = self.projected(ctx.action);
        self.net.insert(ctx.action.instrument, projected);
    }
}
