pub mod engine;
pub mod signal_dispatch;
