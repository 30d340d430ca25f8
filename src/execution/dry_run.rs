use std::collections::HashMap;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::{
    execution::{
        Broker,
        types::{ExecutionReport, OrderModification, OrderRequest, OrderStatus, Position},
    },
    types::instrument::InstrumentId,
};

pub const DEFAULT_FILL_PRICE: f64 = 100.0;

#[derive(Debug, Default)]
struct Book {
    positions: HashMap<InstrumentId, Position>,
    orders: HashMap<String, ExecutionReport>,
}

/// Fills every order on placement; nothing ever rests.
#[derive(Debug)]
pub struct DryRunBroker {
    fallback_price: f64,
    book: Mutex<Book>,
}

impl Default for DryRunBroker {
    fn default() -> Self {
        Self::new(DEFAULT_FILL_PRICE)
    }
}

impl DryRunBroker {
    pub fn new(fallback_price: f64) -> Self {
        Self {
            fallback_price,
            book: Mutex::new(Book::default()),
        }
    }
}

#[async_trait]
impl Broker for DryRunBroker {
    async fn place_order(&self, order: OrderRequest) -> Result<ExecutionReport> {
        let fill_price = order
            .price
            .map(|price| price.as_f64())
            .unwrap_or(self.fallback_price);
        let order_id = Uuid::new_v4().to_string();

        let mut book = self.book.lock().await;
        book.positions
            .entry(order.instrument)
            .or_insert_with(|| Position::flat(order.instrument))
            .apply_fill(order.side, order.quantity, fill_price);

        let report = ExecutionReport {
            order_id: order_id.clone(),
            status: OrderStatus::Filled,
            filled_quantity: order.quantity,
            avg_price: fill_price,
            timestamp: Utc::now(),
        };
        book.orders.insert(order_id, report.clone());

        info!(
            order_id = %report.order_id,
            instrument = %order.instrument,
            side = %order.side,
            quantity = order.quantity,
            price = fill_price,
            "Dry run fill"
        );

        Ok(report)
    }

    async fn modify_order(
        &self,
        order_id: &str,
        _modification: OrderModification,
    ) -> Result<ExecutionReport> {
        // Filled orders cannot change; report the fill back.
        self.book
            .lock()
            .await
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown order {order_id}"))
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<()> {
        Ok(())
    }

    async fn positions(&self) -> Result<Vec<Position>> {
        Ok(self.book.lock().await.positions.values().cloned().collect())
    }
}
