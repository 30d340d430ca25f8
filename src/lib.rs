pub mod config;
pub mod engine;
pub mod events;
pub mod execution;
pub mod feeds;
pub mod market;
pub mod risk;
pub mod scenario;
pub mod signals;
pub mod strategy;
pub mod types;
