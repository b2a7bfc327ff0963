use std::str::FromStr;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::ProductLookup;
use crate::domain::product::Product;

/// Which price an order line is charged at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PricingPolicy {
    /// Re-read every product at checkout and charge the current price.
    #[default]
    AtCheckout,
    /// Charge the price captured when the product was added to the cart.
    AtAddTime,
}

impl FromStr for PricingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "checkout" | "at_checkout" => Ok(PricingPolicy::AtCheckout),
            "add_time" | "at_add_time" => Ok(PricingPolicy::AtAddTime),
            other => Err(format!("unknown pricing policy '{}'", other)),
        }
    }
}

/// Wraps the product lookup port: a product that is missing or marked
/// unavailable resolves to [`DomainError::ProductNotFound`].
#[derive(Clone)]
pub struct PricingAdapter {
    lookup: Arc<dyn ProductLookup>,
}

impl PricingAdapter {
    pub fn new(lookup: Arc<dyn ProductLookup>) -> Self {
        Self { lookup }
    }

    pub fn resolve(&self, product_id: Uuid) -> Result<Product, DomainError> {
        match self.lookup.get_product(product_id)? {
            Some(product) if product.available => Ok(product),
            Some(_) => {
                log::debug!("product {} exists but is not available", product_id);
                Err(DomainError::ProductNotFound(product_id))
            }
            None => Err(DomainError::ProductNotFound(product_id)),
        }
    }
}
