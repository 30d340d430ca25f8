pub mod action_sink;
pub mod dry_run;
pub mod simulated;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::execution::types::{ExecutionReport, OrderModification, OrderRequest, Position};

/// Execution collaborator. The engine only reads `positions`; order entry is
/// driven from outside the tick pipeline.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn place_order(&self, order: OrderRequest) -> Result<ExecutionReport>;
    async fn modify_order(
        &self,
        order_id: &str,
        modification: OrderModification,
    ) -> Result<ExecutionReport>;
    async fn cancel_order(&self, order_id: &str) -> Result<()>;
    async fn positions(&self) -> Result<Vec<Position>>;
}

pub type DynBroker = Arc<dyn Broker>;
