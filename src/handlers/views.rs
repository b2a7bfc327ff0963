//! Response bodies and their conversions from domain values.

use bigdecimal::{BigDecimal, RoundingMode};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::cart::{CartChange, CartEvent, CartOutcome, CartView, LineItem};
use crate::domain::order::{Order, OrderHeader, OrderLine};
use crate::domain::product::Product;

/// Money as a string with two decimals, e.g. "25.00". Half a cent rounds up.
pub fn format_money(amount: &BigDecimal) -> String {
    amount.with_scale_round(2, RoundingMode::HalfUp).to_string()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineResponse {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: String,
    pub line_cost: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Success,
    Warning,
    Info,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NoticeResponse {
    pub message: String,
    pub alert: AlertType,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub session_id: Option<Uuid>,
    pub items: Vec<CartLineResponse>,
    pub total: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<NoticeResponse>,
}

impl From<&LineItem> for CartLineResponse {
    fn from(line: &LineItem) -> Self {
        Self {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price: format_money(&line.unit_price),
            line_cost: format_money(&line.line_cost()),
        }
    }
}

impl From<&CartEvent> for NoticeResponse {
    fn from(event: &CartEvent) -> Self {
        let name = &event.product_name;
        let (message, alert) = match event.change {
            CartChange::Added => (format!("{} successfully added", name), AlertType::Success),
            CartChange::AlreadyInCart => (format!("{} already in the cart", name), AlertType::Warning),
            CartChange::QuantityChanged { quantity } => {
                (format!("{} quantity is now {}", name, quantity), AlertType::Info)
            }
            CartChange::Removed => (format!("{} removed", name), AlertType::Info),
        };
        Self { message, alert }
    }
}

impl From<CartView> for CartResponse {
    fn from(view: CartView) -> Self {
        Self {
            session_id: view.session_id,
            items: view.lines.iter().map(CartLineResponse::from).collect(),
            total: format_money(&view.total),
            notice: None,
        }
    }
}

impl From<CartOutcome> for CartResponse {
    fn from(outcome: CartOutcome) -> Self {
        let notice = NoticeResponse::from(&outcome.event);
        Self {
            notice: Some(notice),
            ..Self::from(outcome.cart)
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: String,
    pub line_cost: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_ref: String,
    pub status: String,
    pub placed_at: String,
    pub total: String,
    pub lines: Vec<OrderLineResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderSummaryResponse {
    pub id: Uuid,
    pub customer_ref: String,
    pub status: String,
    pub placed_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderSummaryResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl From<&OrderLine> for OrderLineResponse {
    fn from(line: &OrderLine) -> Self {
        Self {
            order_id: line.order_id,
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price: format_money(&line.unit_price),
            line_cost: format_money(&line.line_cost),
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            total: format_money(&order.total()),
            customer_ref: order.customer_ref,
            status: order.status.to_string(),
            placed_at: order.placed_at.to_rfc3339(),
            lines: order.lines.iter().map(OrderLineResponse::from).collect(),
        }
    }
}

impl From<OrderHeader> for OrderSummaryResponse {
    fn from(header: OrderHeader) -> Self {
        Self {
            id: header.id,
            customer_ref: header.customer_ref,
            status: header.status.to_string(),
            placed_at: header.placed_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: String,
    pub available: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListProductsResponse {
    pub items: Vec<ProductResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            price: format_money(&product.price),
            name: product.name,
            description: product.description,
            available: product.available,
            created_at: product.created_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn event(change: CartChange) -> CartEvent {
        CartEvent {
            product_id: Uuid::new_v4(),
            product_name: "Laptop".to_string(),
            change,
            total: BigDecimal::from(10),
        }
    }

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(format_money(&BigDecimal::from(25)), "25.00");
        assert_eq!(
            format_money(&BigDecimal::from_str("9.5").expect("decimal")),
            "9.50"
        );
        assert_eq!(format_money(&BigDecimal::from(0)), "0.00");
    }

    #[test]
    fn money_rounds_to_nearest_cent() {
        let money = |s: &str| format_money(&BigDecimal::from_str(s).expect("decimal"));
        assert_eq!(money("0.335"), "0.34");
        assert_eq!(money("0.334"), "0.33");
        assert_eq!(money("1.999"), "2.00");
        assert_eq!(money("-0.335"), "-0.34");
    }

    #[test]
    fn notices_match_cart_changes() {
        let added = NoticeResponse::from(&event(CartChange::Added));
        assert_eq!(added.message, "Laptop successfully added");
        assert!(matches!(added.alert, AlertType::Success));

        let dup = NoticeResponse::from(&event(CartChange::AlreadyInCart));
        assert_eq!(dup.message, "Laptop already in the cart");
        assert!(matches!(dup.alert, AlertType::Warning));

        let qty = NoticeResponse::from(&event(CartChange::QuantityChanged { quantity: 3 }));
        assert_eq!(qty.message, "Laptop quantity is now 3");

        let removed = NoticeResponse::from(&event(CartChange::Removed));
        assert_eq!(removed.message, "Laptop removed");
    }
}
