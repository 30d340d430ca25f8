pub mod context;
pub mod instrument_context;
pub mod position_state;
pub mod strategies;
pub mod strategy;
pub mod strategy_helpers;
