pub mod instrument;
pub mod price;
pub mod trade_action;
