pub mod candle_aggregator;
pub mod event_loop;
pub mod market_source;
pub mod market_state;
