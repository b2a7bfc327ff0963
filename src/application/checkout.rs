use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use crate::domain::cart::CartSession;
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderHeader, OrderLine, OrderStatus};
use crate::domain::ports::{OrderStore, OrderTransaction};

use super::cart_store::CartStore;
use super::pricing::{PricingAdapter, PricingPolicy};

/// Width of `orders.customer_ref`.
const MAX_CUSTOMER_REF: usize = 255;

/// Progress of a single checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    Idle,
    Validating,
    Persisting,
    Committed,
    RolledBack,
}

impl CheckoutState {
    pub fn can_advance_to(self, next: CheckoutState) -> bool {
        use CheckoutState::*;
        matches!(
            (self, next),
            (Idle, Validating) | (Validating, Persisting) | (Persisting, Committed) | (Persisting, RolledBack)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CheckoutState::Committed | CheckoutState::RolledBack)
    }
}

struct Attempt {
    session: Uuid,
    state: CheckoutState,
}

impl Attempt {
    fn advance(&mut self, next: CheckoutState) {
        debug_assert!(self.state.can_advance_to(next), "{:?} -> {:?}", self.state, next);
        log::debug!("checkout {}: {:?} -> {:?}", self.session, self.state, next);
        self.state = next;
    }
}

/// Turns a populated cart into a persisted order.
///
/// The whole attempt runs under the cart's session lock, so the cart cannot
/// change between validation and the clear that follows a commit. A failed
/// attempt leaves the cart exactly as it was.
pub struct CheckoutCoordinator {
    carts: Arc<CartStore>,
    pricing: PricingAdapter,
    orders: Arc<dyn OrderStore>,
    policy: PricingPolicy,
}

impl CheckoutCoordinator {
    pub fn new(
        carts: Arc<CartStore>,
        pricing: PricingAdapter,
        orders: Arc<dyn OrderStore>,
        policy: PricingPolicy,
    ) -> Self {
        Self {
            carts,
            pricing,
            orders,
            policy,
        }
    }

    pub fn place_order(&self, session: Option<Uuid>, customer_ref: &str) -> Result<Order, DomainError> {
        let customer_ref = customer_ref.trim();
        if customer_ref.is_empty() {
            return Err(DomainError::InvalidInput("customer_ref must not be empty".to_string()));
        }
        if customer_ref.chars().count() > MAX_CUSTOMER_REF {
            return Err(DomainError::InvalidInput(format!(
                "customer_ref must be at most {} characters",
                MAX_CUSTOMER_REF
            )));
        }

        let placed = self.carts.with_live_session(session, |cart| {
            let mut attempt = Attempt {
                session: cart.id(),
                state: CheckoutState::Idle,
            };
            attempt.advance(CheckoutState::Validating);
            if cart.is_empty() {
                return Err(DomainError::EmptyCart);
            }

            let header = OrderHeader {
                id: Uuid::new_v4(),
                customer_ref: customer_ref.to_string(),
                status: OrderStatus::Placed,
                // Postgres keeps microseconds.
                placed_at: Utc::now().trunc_subsecs(6),
            };
            let lines = self.price_lines(header.id, cart)?;

            attempt.advance(CheckoutState::Persisting);
            match self.persist(&header, &lines) {
                Ok(()) => {
                    attempt.advance(CheckoutState::Committed);
                    cart.close();
                    Ok(Order::from_parts(header, lines))
                }
                Err(e) => {
                    attempt.advance(CheckoutState::RolledBack);
                    log::warn!("checkout {}: order {} rolled back: {}", attempt.session, header.id, e);
                    Err(e)
                }
            }
        })?;

        let order = placed.ok_or(DomainError::EmptyCart)?;
        if let Some(session) = session {
            self.carts.clear(session)?;
        }
        log::info!(
            "order {} placed for {} ({} lines, total {})",
            order.id,
            order.customer_ref,
            order.lines.len(),
            order.total()
        );
        Ok(order)
    }

    fn price_lines(&self, order_id: Uuid, cart: &CartSession) -> Result<Vec<OrderLine>, DomainError> {
        cart.lines()
            .map(|line| {
                let unit_price = match self.policy {
                    PricingPolicy::AtAddTime => line.unit_price.clone(),
                    PricingPolicy::AtCheckout => {
                        let current = self.pricing.resolve(line.product_id)?.price;
                        if current != line.unit_price {
                            log::debug!(
                                "price of {} moved from {} to {} since it was added",
                                line.product_id,
                                line.unit_price,
                                current
                            );
                        }
                        current
                    }
                };
                Ok(OrderLine::from_cart_line(order_id, line, unit_price))
            })
            .collect()
    }

    fn persist(&self, header: &OrderHeader, lines: &[OrderLine]) -> Result<(), DomainError> {
        let mut tx = self
            .orders
            .begin()
            .map_err(DomainError::into_persistence_failure)?;

        if let Err(e) = write_order(tx.as_mut(), header, lines) {
            tx.rollback();
            return Err(e.into_persistence_failure());
        }
        tx.commit().map_err(DomainError::into_persistence_failure)
    }
}

fn write_order(
    tx: &mut (dyn OrderTransaction + '_),
    header: &OrderHeader,
    lines: &[OrderLine],
) -> Result<(), DomainError> {
    tx.insert_order(header)?;
    for line in lines {
        tx.insert_line_item(header.id, line)?;
    }
    Ok(())
}
