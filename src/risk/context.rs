use crate::types::trade_action::TradeAction;

/// One candidate action as seen by the checks.
#[derive(Debug, Clone, Copy)]
pub struct RiskContext<'a> {
    pub action: &'a TradeAction,
}
