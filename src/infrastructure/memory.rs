//! Process-local adapters for the product and order ports.
//!
//! Used by `STORAGE_BACKEND=memory` and by tests. Orders written through a
//! transaction are staged on the handle and only become visible on commit.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, Order, OrderHeader, OrderLine};
use crate::domain::ports::{OrderStore, OrderTransaction, ProductCatalog, ProductLookup};
use crate::domain::product::{NewProduct, Product, ProductPage, ProductUpdate};

fn poisoned() -> DomainError {
    DomainError::Internal("in-memory store lock poisoned".to_string())
}

fn page_of<T: Clone>(newest_last: &[T], offset: i64, limit: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(0);
    newest_last.iter().rev().skip(offset).take(limit).cloned().collect()
}

// ── Products ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryProductCatalog {
    products: RwLock<Vec<Product>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProductLookup for InMemoryProductCatalog {
    fn get_product(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        self.find_by_id(id)
    }
}

impl ProductCatalog for InMemoryProductCatalog {
    fn create(&self, product: NewProduct) -> Result<Product, DomainError> {
        let created = Product {
            id: Uuid::new_v4(),
            name: product.name,
            description: product.description,
            price: product.price,
            available: product.available,
            created_at: Utc::now().trunc_subsecs(6),
        };
        self.products
            .write()
            .map_err(|_| poisoned())?
            .push(created.clone());
        Ok(created)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let products = self.products.read().map_err(|_| poisoned())?;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    fn update(&self, id: Uuid, changes: ProductUpdate) -> Result<Option<Product>, DomainError> {
        let mut products = self.products.write().map_err(|_| poisoned())?;
        let Some(product) = products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            product.name = name;
        }
        if let Some(description) = changes.description {
            product.description = description;
        }
        if let Some(price) = changes.price {
            product.price = price;
        }
        if let Some(available) = changes.available {
            product.available = available;
        }
        Ok(Some(product.clone()))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut products = self.products.write().map_err(|_| poisoned())?;
        let before = products.len();
        products.retain(|p| p.id != id);
        Ok(products.len() != before)
    }

    fn list(&self, offset: i64, limit: i64) -> Result<ProductPage, DomainError> {
        let products = self.products.read().map_err(|_| poisoned())?;
        Ok(ProductPage {
            items: page_of(&products, offset, limit),
            total: products.len() as i64,
        })
    }
}

// ── Orders ───────────────────────────────────────────────────────────────────

/// Step of a transaction at which [`InMemoryOrderStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    InsertOrder,
    InsertLineItem,
    Commit,
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<Vec<Order>>,
    fail_at: Mutex<Option<FailurePoint>>,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following transaction fail at `point` (`None` to stop).
    pub fn fail_at(&self, point: Option<FailurePoint>) {
        if let Ok(mut fail_at) = self.fail_at.lock() {
            *fail_at = point;
        }
    }

    fn check(&self, point: FailurePoint) -> Result<(), DomainError> {
        let fail_at = *self.fail_at.lock().map_err(|_| poisoned())?;
        if fail_at == Some(point) {
            return Err(DomainError::Internal(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }

    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn order_count(&self) -> usize {
        self.orders.read().map(|o| o.len()).unwrap_or(0)
    }
}

struct InMemoryOrderTransaction<'a> {
    store: &'a InMemoryOrderStore,
    header: Option<OrderHeader>,
    lines: Vec<OrderLine>,
    finished: bool,
}

impl InMemoryOrderTransaction<'_> {
    fn discard(&mut self) {
        self.header = None;
        self.lines.clear();
        self.finished = true;
        self.store.rollbacks.fetch_add(1, Ordering::SeqCst);
    }
}

impl OrderTransaction for InMemoryOrderTransaction<'_> {
    fn insert_order(&mut self, header: &OrderHeader) -> Result<(), DomainError> {
        self.store.check(FailurePoint::InsertOrder)?;
        if self.header.is_some() {
            return Err(DomainError::Internal("order header already written".to_string()));
        }
        let exists = self
            .store
            .orders
            .read()
            .map_err(|_| poisoned())?
            .iter()
            .any(|o| o.id == header.id);
        if exists {
            return Err(DomainError::Internal(format!("duplicate order id {}", header.id)));
        }
        self.header = Some(header.clone());
        Ok(())
    }

    fn insert_line_item(&mut self, order_id: Uuid, line: &OrderLine) -> Result<(), DomainError> {
        self.store.check(FailurePoint::InsertLineItem)?;
        if self.header.as_ref().map(|h| h.id) != Some(order_id) {
            return Err(DomainError::Internal(format!("order {} was not written in this transaction", order_id)));
        }
        if self.lines.iter().any(|l| l.product_id == line.product_id) {
            return Err(DomainError::Internal(format!(
                "duplicate line for product {} in order {}",
                line.product_id, order_id
            )));
        }
        self.lines.push(OrderLine {
            order_id,
            ..line.clone()
        });
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<(), DomainError> {
        self.store.check(FailurePoint::Commit)?;
        let header = self
            .header
            .take()
            .ok_or_else(|| DomainError::Internal("nothing to commit".to_string()))?;
        let lines = std::mem::take(&mut self.lines);
        self.store
            .orders
            .write()
            .map_err(|_| poisoned())?
            .push(Order::from_parts(header, lines));
        self.finished = true;
        self.store.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(mut self: Box<Self>) {
        self.discard();
    }
}

impl Drop for InMemoryOrderTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.discard();
        }
    }
}

impl OrderStore for InMemoryOrderStore {
    fn begin(&self) -> Result<Box<dyn OrderTransaction + '_>, DomainError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryOrderTransaction {
            store: self,
            header: None,
            lines: Vec::new(),
            finished: false,
        }))
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let orders = self.orders.read().map_err(|_| poisoned())?;
        Ok(orders.iter().find(|o| o.id == id).cloned())
    }

    fn list(&self, offset: i64, limit: i64) -> Result<ListResult, DomainError> {
        let orders = self.orders.read().map_err(|_| poisoned())?;
        let headers: Vec<OrderHeader> = orders
            .iter()
            .map(|o| OrderHeader {
                id: o.id,
                customer_ref: o.customer_ref.clone(),
                status: o.status,
                placed_at: o.placed_at,
            })
            .collect();
        Ok(ListResult {
            items: page_of(&headers, offset, limit),
            total: headers.len() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::order::OrderStatus;

    fn header() -> OrderHeader {
        OrderHeader {
            id: Uuid::new_v4(),
            customer_ref: "cust1".to_string(),
            status: OrderStatus::Placed,
            placed_at: Utc::now(),
        }
    }

    fn line(order_id: Uuid) -> OrderLine {
        OrderLine {
            order_id,
            product_id: Uuid::new_v4(),
            product_name: "Headphone".to_string(),
            quantity: 2,
            unit_price: BigDecimal::from_str("4.50").expect("decimal"),
            line_cost: BigDecimal::from_str("9.00").expect("decimal"),
        }
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let store = InMemoryOrderStore::new();
        let h = header();
        {
            let mut tx = store.begin().expect("begin");
            tx.insert_order(&h).expect("insert order");
            tx.insert_line_item(h.id, &line(h.id)).expect("insert line");
        }

        assert_eq!(store.order_count(), 0);
        assert_eq!(store.rollbacks(), 1);
        assert!(store.find_by_id(h.id).expect("find").is_none());
    }

    #[test]
    fn committed_order_is_visible_with_lines() {
        let store = InMemoryOrderStore::new();
        let h = header();
        let mut tx = store.begin().expect("begin");
        tx.insert_order(&h).expect("insert order");
        tx.insert_line_item(h.id, &line(h.id)).expect("insert line");
        tx.commit().expect("commit");

        let order = store.find_by_id(h.id).expect("find").expect("exists");
        assert_eq!(order.lines.len(), 1);
        assert_eq!(store.commits(), 1);
        assert_eq!(store.rollbacks(), 0);
    }

    #[test]
    fn line_for_foreign_order_is_rejected() {
        let store = InMemoryOrderStore::new();
        let h = header();
        let mut tx = store.begin().expect("begin");
        tx.insert_order(&h).expect("insert order");

        let other = Uuid::new_v4();
        assert!(tx.insert_line_item(other, &line(other)).is_err());
    }

    #[test]
    fn list_is_newest_first() {
        let store = InMemoryOrderStore::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let h = header();
            ids.push(h.id);
            let mut tx = store.begin().expect("begin");
            tx.insert_order(&h).expect("insert order");
            tx.commit().expect("commit");
        }

        let result = store.list(0, 2).expect("list");

        assert_eq!(result.total, 3);
        let listed: Vec<Uuid> = result.items.iter().map(|o| o.id).collect();
        assert_eq!(listed, vec![ids[2], ids[1]]);
    }

    #[test]
    fn list_past_the_end_is_empty() {
        let store = InMemoryOrderStore::new();
        let h = header();
        let mut tx = store.begin().expect("begin");
        tx.insert_order(&h).expect("insert order");
        tx.commit().expect("commit");

        let result = store.list(i64::MAX, 100).expect("list");

        assert_eq!(result.total, 1);
        assert!(result.items.is_empty());
    }
}
