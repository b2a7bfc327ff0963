use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::errors::DomainError;
use super::product::Product;

/// One product-and-quantity entry of a cart.
///
/// `order_id` stays `None` while the line lives in a cart and is stamped by
/// checkout when the line becomes part of an order.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub order_id: Option<Uuid>,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

impl LineItem {
    pub fn for_product(product: &Product) -> Self {
        Self {
            order_id: None,
            product_id: product.id,
            product_name: product.name.clone(),
            quantity: 1,
            unit_price: product.price.clone(),
        }
    }

    pub fn line_cost(&self) -> BigDecimal {
        &self.unit_price * &BigDecimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityDelta {
    Increment,
    Decrement,
}

/// Result of applying a [`QuantityDelta`] to a line.
#[derive(Debug, Clone, PartialEq)]
pub enum Adjusted {
    Changed(LineItem),
    Removed(LineItem),
}

/// The in-progress cart of one shopper.
///
/// Lines are keyed by product id and kept in insertion order. A product
/// appears at most once and a present line never has a quantity below 1.
#[derive(Debug, Clone)]
pub struct CartSession {
    id: Uuid,
    lines: BTreeMap<u64, LineItem>,
    positions: HashMap<Uuid, u64>,
    next_position: u64,
    closed: bool,
    touched: Instant,
}

impl CartSession {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            lines: BTreeMap::new(),
            positions: HashMap::new(),
            next_position: 0,
            closed: false,
            touched: Instant::now(),
        }
    }

    /// Marks the session as used just now.
    pub fn touch(&mut self) {
        self.touched = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.touched.elapsed()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn contains(&self, product_id: Uuid) -> bool {
        self.positions.contains_key(&product_id)
    }

    pub fn get(&self, product_id: Uuid) -> Option<&LineItem> {
        self.positions
            .get(&product_id)
            .and_then(|pos| self.lines.get(pos))
    }

    /// Appends `line` unless its product is already present.
    ///
    /// Returns `false` (and leaves the cart untouched) for a duplicate.
    pub fn insert(&mut self, line: LineItem) -> bool {
        if self.contains(line.product_id) || line.quantity < 1 {
            return false;
        }
        let pos = self.next_position;
        self.next_position += 1;
        self.positions.insert(line.product_id, pos);
        self.lines.insert(pos, line);
        true
    }

    pub fn adjust(&mut self, product_id: Uuid, delta: QuantityDelta) -> Result<Adjusted, DomainError> {
        let pos = *self
            .positions
            .get(&product_id)
            .ok_or(DomainError::ItemNotFound(product_id))?;
        let quantity = self
            .lines
            .get(&pos)
            .map(|l| l.quantity)
            .ok_or(DomainError::ItemNotFound(product_id))?;

        let quantity = match delta {
            QuantityDelta::Increment => quantity.checked_add(1).ok_or_else(|| {
                DomainError::InvalidInput(format!("quantity of {} is at its maximum", product_id))
            })?,
            QuantityDelta::Decrement => quantity - 1,
        };

        // A line never sits at quantity 0; it goes away instead.
        if quantity < 1 {
            return self
                .remove(product_id)
                .map(Adjusted::Removed)
                .ok_or(DomainError::ItemNotFound(product_id));
        }

        let line = self
            .lines
            .get_mut(&pos)
            .ok_or(DomainError::ItemNotFound(product_id))?;
        line.quantity = quantity;
        Ok(Adjusted::Changed(line.clone()))
    }

    pub fn remove(&mut self, product_id: Uuid) -> Option<LineItem> {
        let pos = self.positions.remove(&product_id)?;
        self.lines.remove(&pos)
    }

    pub fn lines(&self) -> impl Iterator<Item = &LineItem> {
        self.lines.values()
    }

    pub fn snapshot(&self) -> Vec<LineItem> {
        self.lines.values().cloned().collect()
    }

    pub fn total(&self) -> BigDecimal {
        self.lines.values().map(LineItem::line_cost).sum()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.positions.clear();
    }

    /// Empties the cart and retires its id. A closed session is never
    /// mutated again; callers treat it as absent.
    pub fn close(&mut self) {
        self.clear();
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn view(&self) -> CartView {
        CartView {
            session_id: (!self.closed).then_some(self.id),
            lines: self.snapshot(),
            total: self.total(),
        }
    }
}

/// Read-only copy of a cart taken under its lock.
#[derive(Debug, Clone, PartialEq)]
pub struct CartView {
    pub session_id: Option<Uuid>,
    pub lines: Vec<LineItem>,
    pub total: BigDecimal,
}

impl CartView {
    pub fn empty() -> Self {
        Self {
            session_id: None,
            lines: Vec::new(),
            total: BigDecimal::from(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CartChange {
    Added,
    /// The product was already present; nothing changed.
    AlreadyInCart,
    QuantityChanged { quantity: i32 },
    Removed,
}

/// Notification describing what a cart mutation did, for user-facing messages.
#[derive(Debug, Clone, PartialEq)]
pub struct CartEvent {
    pub product_id: Uuid,
    pub product_name: String,
    pub change: CartChange,
    pub total: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartOutcome {
    pub event: CartEvent,
    pub cart: CartView,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;

    use super::*;

    fn product(name: &str, price: &str) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            price: BigDecimal::from_str(price).expect("valid decimal"),
            available: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_rejects_duplicate_product() {
        let mut cart = CartSession::new(Uuid::new_v4());
        let p = product("Laptop", "10");

        assert!(cart.insert(LineItem::for_product(&p)));
        assert!(!cart.insert(LineItem::for_product(&p)));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(p.id).map(|l| l.quantity), Some(1));
    }

    #[test]
    fn decrement_at_one_removes_line() {
        let mut cart = CartSession::new(Uuid::new_v4());
        let p = product("Tablet", "3.50");
        cart.insert(LineItem::for_product(&p));

        let adjusted = cart.adjust(p.id, QuantityDelta::Decrement).expect("adjust");

        assert!(matches!(adjusted, Adjusted::Removed(ref l) if l.product_id == p.id));
        assert!(cart.is_empty());
        assert!(!cart.contains(p.id));
    }

    #[test]
    fn increment_then_decrement_keeps_line() {
        let mut cart = CartSession::new(Uuid::new_v4());
        let p = product("Camera", "7");
        cart.insert(LineItem::for_product(&p));

        cart.adjust(p.id, QuantityDelta::Increment).expect("inc");
        cart.adjust(p.id, QuantityDelta::Increment).expect("inc");
        let adjusted = cart.adjust(p.id, QuantityDelta::Decrement).expect("dec");

        match adjusted {
            Adjusted::Changed(line) => assert_eq!(line.quantity, 2),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(cart.total(), BigDecimal::from(14));
    }

    #[test]
    fn adjust_unknown_product_is_item_not_found() {
        let mut cart = CartSession::new(Uuid::new_v4());
        let missing = Uuid::new_v4();

        let err = cart.adjust(missing, QuantityDelta::Increment).unwrap_err();

        assert!(matches!(err, DomainError::ItemNotFound(id) if id == missing));
    }

    #[test]
    fn removal_preserves_display_order_of_remaining_lines() {
        let mut cart = CartSession::new(Uuid::new_v4());
        let a = product("A", "1");
        let b = product("B", "2");
        let c = product("C", "3");
        for p in [&a, &b, &c] {
            cart.insert(LineItem::for_product(p));
        }

        cart.remove(b.id).expect("b present");
        let d = product("D", "4");
        cart.insert(LineItem::for_product(&d));

        let order: Vec<Uuid> = cart.lines().map(|l| l.product_id).collect();
        assert_eq!(order, vec![a.id, c.id, d.id]);
    }

    #[test]
    fn closed_cart_view_has_no_session_id() {
        let id = Uuid::new_v4();
        let mut cart = CartSession::new(id);
        cart.insert(LineItem::for_product(&product("A", "1")));
        assert_eq!(cart.view().session_id, Some(id));

        cart.close();

        let view = cart.view();
        assert_eq!(view.session_id, None);
        assert!(view.lines.is_empty());
        assert_eq!(view.total, BigDecimal::from(0));
    }

    #[test]
    fn total_of_empty_cart_is_zero() {
        let cart = CartSession::new(Uuid::new_v4());
        assert_eq!(cart.total(), BigDecimal::from(0));
    }

    #[test]
    fn total_matches_sum_of_line_costs() {
        let mut cart = CartSession::new(Uuid::new_v4());
        let a = product("A", "9.99");
        let b = product("B", "0.01");
        cart.insert(LineItem::for_product(&a));
        cart.insert(LineItem::for_product(&b));
        cart.adjust(a.id, QuantityDelta::Increment).expect("inc");

        let expected: BigDecimal = cart.snapshot().iter().map(LineItem::line_cost).sum();
        assert_eq!(cart.total(), expected);
        assert_eq!(cart.total(), BigDecimal::from_str("19.99").expect("decimal"));
    }
}
