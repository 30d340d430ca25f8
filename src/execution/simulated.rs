use std::collections::HashMap;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::{
    execution::{
        Broker,
        types::{ExecutionReport, OrderModification, OrderRequest, OrderStatus, Position},
    },
    types::instrument::InstrumentId,
};

#[derive(Debug, Default)]
struct Book {
    positions: HashMap<InstrumentId, Position>,
    reports: HashMap<String, ExecutionReport>,
    pending: HashMap<String, OrderRequest>,
}

/// Backtest broker: orders rest as NEW until an external matching step calls
/// [`SimulatedBroker::simulate_fill`].
#[derive(Debug, Default)]
pub struct SimulatedBroker {
    book: Mutex<Book>,
}

impl SimulatedBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills a pending order. Returns `Ok(None)` when the order is no longer
    /// pending (already filled, cancelled or never placed).
    pub async fn simulate_fill(
        &self,
        order_id: &str,
        fill_price: f64,
        fill_quantity: u32,
    ) -> Result<Option<ExecutionReport>> {
        if !fill_price.is_finite() || fill_price <= 0.0 {
            bail!("fill price must be finite and positive, got {fill_price}");
        }

        let mut book = self.book.lock().await;
        let Some(order) = book.pending.remove(order_id) else {
            return Ok(None);
        };

        book.positions
            .entry(order.instrument)
            .or_insert_with(|| Position::flat(order.instrument))
            .apply_fill(order.side, fill_quantity, fill_price);

        let report = book
            .reports
            .get_mut(order_id)
            .ok_or_else(|| anyhow!("no report for pending order {order_id}"))?;
        report.status = OrderStatus::Filled;
        report.filled_quantity = fill_quantity;
        report.avg_price = fill_price;
        report.timestamp = Utc::now();

        debug!(order_id, fill_price, fill_quantity, "Simulated fill");

        Ok(Some(report.clone()))
    }

    pub async fn pending_orders(&self) -> Vec<(String, OrderRequest)> {
        self.book
            .lock()
            .await
            .pending
            .iter()
            .map(|(id, order)| (id.clone(), order.clone()))
            .collect()
    }
}

#[async_trait]
impl Broker for SimulatedBroker {
    async fn place_order(&self, order: OrderRequest) -> Result<ExecutionReport> {
        let order_id = Uuid::new_v4().to_string();
        let report = ExecutionReport {
            order_id: order_id.clone(),
            status: OrderStatus::New,
            filled_quantity: 0,
            avg_price: 0.0,
            timestamp: Utc::now(),
        };

        let mut book = self.book.lock().await;
        book.reports.insert(order_id.clone(), report.clone());
        book.pending.insert(order_id, order);

        Ok(report)
    }

    async fn modify_order(
        &self,
        order_id: &str,
        modification: OrderModification,
    ) -> Result<ExecutionReport> {
        let mut book = self.book.lock().await;
        if let Some(order) = book.pending.get_mut(order_id) {
            modification.apply_to(order);
        }

        book.reports
            .get(order_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown order {order_id}"))
    }

    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let mut book = self.book.lock().await;
        book.pending.remove(order_id);
        if let Some(report) = book.reports.get_mut(order_id) {
            report.status = OrderStatus::Cancelled;
        }
        Ok(())
    }

    async fn positions(&self) -> Result<Vec<Position>> {
        Ok(self.book.lock().await.positions.values().cloned().collect())
    }
}
