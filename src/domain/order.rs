use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::cart::LineItem;
use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Placed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "placed" => Ok(OrderStatus::Placed),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::Internal(format!("unknown order status '{}'", other))),
        }
    }
}

/// Header row of an order, written first inside the checkout transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderHeader {
    pub id: Uuid,
    pub customer_ref: String,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub line_cost: BigDecimal,
}

impl OrderLine {
    /// Stamps a cart line with `order_id` and fixes its cost at `unit_price`.
    pub fn from_cart_line(order_id: Uuid, line: &LineItem, unit_price: BigDecimal) -> Self {
        let line_cost = &unit_price * &BigDecimal::from(line.quantity);
        Self {
            order_id,
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price,
            line_cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub customer_ref: String,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    pub fn from_parts(header: OrderHeader, lines: Vec<OrderLine>) -> Self {
        Self {
            id: header.id,
            customer_ref: header.customer_ref,
            status: header.status,
            placed_at: header.placed_at,
            lines,
        }
    }

    pub fn total(&self) -> BigDecimal {
        self.lines.iter().map(|l| l.line_cost.clone()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<OrderHeader>,
    pub total: i64,
}
