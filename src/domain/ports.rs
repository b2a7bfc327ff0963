use uuid::Uuid;

use super::errors::DomainError;
use super::order::{ListResult, Order, OrderHeader, OrderLine};
use super::product::{NewProduct, Product, ProductPage, ProductUpdate};

/// Resolves a product by id for pricing a cart line.
pub trait ProductLookup: Send + Sync + 'static {
    fn get_product(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
}

pub trait ProductCatalog: Send + Sync + 'static {
    fn create(&self, product: NewProduct) -> Result<Product, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    /// Applies `changes` and returns the product as stored, `None` if unknown.
    fn update(&self, id: Uuid, changes: ProductUpdate) -> Result<Option<Product>, DomainError>;
    /// Returns `false` when there was no such product.
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
    /// Newest first, skipping `offset` products.
    fn list(&self, offset: i64, limit: i64) -> Result<ProductPage, DomainError>;
}

/// An open, all-or-nothing unit of work against the order store.
///
/// Implementations must roll back when the handle is dropped without a
/// successful [`commit`](OrderTransaction::commit).
pub trait OrderTransaction {
    fn insert_order(&mut self, header: &OrderHeader) -> Result<(), DomainError>;
    fn insert_line_item(&mut self, order_id: Uuid, line: &OrderLine) -> Result<(), DomainError>;
    fn commit(self: Box<Self>) -> Result<(), DomainError>;
    fn rollback(self: Box<Self>);
}

pub trait OrderStore: Send + Sync + 'static {
    fn begin(&self) -> Result<Box<dyn OrderTransaction + '_>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    /// Order headers, newest first, skipping `offset` orders.
    fn list(&self, offset: i64, limit: i64) -> Result<ListResult, DomainError>;
}
