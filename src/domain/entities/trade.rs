use crate::domain::values::allocation::BuyMode;
use crate::domain::values::buy_order::BuyOrder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A filled purchase, appended to the trade ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEntry {
    pub id: String,
    pub mode: BuyMode,
    pub code: String,
    pub name: String,
    pub price: f64,
    pub quantity: u64,
    pub total: f64,
    pub fee: f64,
    pub order_id: Option<String>,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TradeEntry {
    pub fn new(
        mode: BuyMode,
        code: String,
        name: String,
        price: f64,
        quantity: u64,
        order_id: Option<String>,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mode,
            code,
            name,
            price,
            quantity,
            total: price * quantity as f64,
            fee: 0.0,
            order_id,
            memo: Some(format!("{mode} ({})", created_at.format("%Y-%m-%d"))),
            created_at,
        }
    }

    pub fn from_order(mode: BuyMode, order: &BuyOrder, order_id: Option<String>) -> Self {
        Self::new(
            mode,
            order.code.clone(),
            order.name.clone(),
            order.current_price,
            order.quantity,
            order_id,
        )
    }
}
