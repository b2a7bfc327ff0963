use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, Order};
use crate::domain::ports::OrderStore;

use super::PageRequest;

/// Read side of the order store: order detail and the paginated order list.
pub struct OrderService {
    repo: Arc<dyn OrderStore>,
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderStore>) -> Self {
        Self { repo }
    }

    pub fn get_order(&self, id: Uuid) -> Result<Order, DomainError> {
        self.repo.find_by_id(id)?.ok_or(DomainError::OrderNotFound(id))
    }

    pub fn list_orders(&self, page: PageRequest) -> Result<ListResult, DomainError> {
        self.repo.list(page.offset(), page.limit)
    }
}
