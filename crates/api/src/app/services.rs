use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;

use gatekeeper_auth::{OperationRegistry, TokenCodec};

use crate::app::dto::OrderResponse;

/// In-memory order book backing the demo order routes.
#[derive(Debug, Default)]
pub struct OrderBook {
    next_id: AtomicU64,
    orders: RwLock<BTreeMap<u64, OrderResponse>>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, item: String, quantity: u32, created_by: String) -> OrderResponse {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let order = OrderResponse {
            id,
            item,
            quantity,
            created_by,
            created_at: Utc::now(),
        };
        self.orders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, order.clone());
        order
    }

    pub fn get(&self, id: u64) -> Option<OrderResponse> {
        self.orders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

/// Shared handler dependencies.
#[derive(Debug)]
pub struct AppServices {
    pub codec: Arc<TokenCodec>,
    pub registry: Arc<OperationRegistry>,
    pub orders: OrderBook,
}

impl AppServices {
    pub fn new(codec: Arc<TokenCodec>, registry: Arc<OperationRegistry>) -> Self {
        Self {
            codec,
            registry,
            orders: OrderBook::new(),
        }
    }
}
