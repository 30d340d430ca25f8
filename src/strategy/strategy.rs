use crate::{
    strategy::{context::StrategyContext, position_state::PositionState},
    types::trade_action::TradeAction,
};

/// Turns ticks and volatility signals into trade intents.
///
/// Instances own their FLAT/POSITIONED state and are driven synchronously from
/// the engine, one tick at a time.
pub trait Strategy: Send {
    fn name(&self) -> &'static str;

    /// Per-tick hook; the shipped strategies do nothing here.
    fn on_tick(&mut self, ctx: &StrategyContext<'_>) -> Vec<TradeAction>;

    fn on_vol_signal(&mut self, ctx: &StrategyContext<'_>) -> Vec<TradeAction>;

    fn position_state(&self) -> PositionState;
}

pub type DynStrategy = Box<dyn Strategy>;
