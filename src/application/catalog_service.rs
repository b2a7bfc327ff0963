use std::sync::Arc;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::ProductCatalog;
use crate::domain::product::{NewProduct, Product, ProductPage, ProductUpdate};

use super::PageRequest;

const MAX_NAME_LEN: usize = 255;

/// Prices are stored as NUMERIC(12, 2).
const PRICE_SCALE: i64 = 2;

fn price_ceiling() -> BigDecimal {
    BigDecimal::from(10_000_000_000_i64)
}

fn validate_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::InvalidInput("product name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::InvalidInput(format!(
            "product name is longer than {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

fn validate_price(price: &BigDecimal) -> Result<(), DomainError> {
    if *price < BigDecimal::from(0) {
        return Err(DomainError::InvalidInput(format!(
            "price must not be negative, got {}",
            price
        )));
    }
    if price.with_scale(PRICE_SCALE) != *price {
        return Err(DomainError::InvalidInput(format!(
            "price {} has more than {} decimal places",
            price, PRICE_SCALE
        )));
    }
    if *price >= price_ceiling() {
        return Err(DomainError::InvalidInput(format!(
            "price {} must be below {}",
            price,
            price_ceiling()
        )));
    }
    Ok(())
}

pub struct CatalogService {
    catalog: Arc<dyn ProductCatalog>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { catalog }
    }

    pub fn create_product(&self, mut product: NewProduct) -> Result<Product, DomainError> {
        product.name = validate_name(&product.name)?;
        validate_price(&product.price)?;
        let created = self.catalog.create(product)?;
        log::info!("product {} created: {}", created.id, created.name);
        Ok(created)
    }

    /// Changes name, description, price or availability. Carts pick the new
    /// price up at checkout; a withdrawn product can no longer be ordered.
    pub fn update_product(&self, id: Uuid, mut changes: ProductUpdate) -> Result<Product, DomainError> {
        if let Some(name) = &changes.name {
            changes.name = Some(validate_name(name)?);
        }
        if let Some(price) = &changes.price {
            validate_price(price)?;
        }
        let updated = self
            .catalog
            .update(id, changes)?
            .ok_or(DomainError::ProductNotFound(id))?;
        log::info!("product {} updated", id);
        Ok(updated)
    }

    pub fn delete_product(&self, id: Uuid) -> Result<(), DomainError> {
        if !self.catalog.delete(id)? {
            return Err(DomainError::ProductNotFound(id));
        }
        log::info!("product {} deleted", id);
        Ok(())
    }

    pub fn get_product(&self, id: Uuid) -> Result<Product, DomainError> {
        self.catalog
            .find_by_id(id)?
            .ok_or(DomainError::ProductNotFound(id))
    }

    pub fn list_products(&self, page: PageRequest) -> Result<ProductPage, DomainError> {
        self.catalog.list(page.offset(), page.limit)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::infrastructure::memory::InMemoryProductCatalog;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(InMemoryProductCatalog::new()))
    }

    fn input(name: &str, price: &str) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: "A thing".to_string(),
            price: BigDecimal::from_str(price).expect("decimal"),
            available: true,
        }
    }

    #[test]
    fn creates_and_fetches_product() {
        let svc = service();

        let created = svc.create_product(input("  Monitor ", "199.00")).expect("create");
        let fetched = svc.get_product(created.id).expect("get");

        assert_eq!(fetched.name, "Monitor");
        assert_eq!(fetched, created);
    }

    #[test]
    fn rejects_blank_name_and_negative_price() {
        let svc = service();

        assert!(matches!(
            svc.create_product(input(" ", "1")),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.create_product(input("Watch", "-0.01")),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_sub_cent_and_oversized_prices() {
        let svc = service();

        for price in ["0.339", "0.001", "10000000000", "12345678901.5"] {
            assert!(
                matches!(
                    svc.create_product(input("Watch", price)),
                    Err(DomainError::InvalidInput(_))
                ),
                "{} should be rejected",
                price
            );
        }
        // Trailing zeros beyond the cent are still whole cents.
        assert!(svc.create_product(input("Watch", "0.340")).is_ok());
        assert!(svc.create_product(input("Watch", "9999999999.99")).is_ok());
    }

    #[test]
    fn updates_only_the_given_fields() {
        let svc = service();
        let created = svc.create_product(input("Monitor", "199.00")).expect("create");

        let updated = svc
            .update_product(
                created.id,
                ProductUpdate {
                    price: Some(BigDecimal::from_str("149.50").expect("decimal")),
                    available: Some(false),
                    ..ProductUpdate::default()
                },
            )
            .expect("update");

        assert_eq!(updated.name, "Monitor");
        assert_eq!(updated.price, BigDecimal::from_str("149.50").expect("decimal"));
        assert!(!updated.available);
        assert_eq!(svc.get_product(created.id).expect("get"), updated);
    }

    #[test]
    fn update_validates_like_create() {
        let svc = service();
        let created = svc.create_product(input("Monitor", "199.00")).expect("create");

        let bad_price = ProductUpdate {
            price: Some(BigDecimal::from_str("1.005").expect("decimal")),
            ..ProductUpdate::default()
        };
        let blank_name = ProductUpdate {
            name: Some("  ".to_string()),
            ..ProductUpdate::default()
        };

        assert!(matches!(
            svc.update_product(created.id, bad_price),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.update_product(created.id, blank_name),
            Err(DomainError::InvalidInput(_))
        ));
        assert_eq!(svc.get_product(created.id).expect("get"), created);
    }

    #[test]
    fn update_and_delete_of_unknown_product_are_not_found() {
        let svc = service();
        let id = Uuid::new_v4();

        assert!(matches!(
            svc.update_product(id, ProductUpdate::default()),
            Err(DomainError::ProductNotFound(_))
        ));
        assert!(matches!(svc.delete_product(id), Err(DomainError::ProductNotFound(_))));
    }

    #[test]
    fn deleted_product_is_gone() {
        let svc = service();
        let created = svc.create_product(input("Monitor", "199.00")).expect("create");

        svc.delete_product(created.id).expect("delete");

        assert!(matches!(
            svc.get_product(created.id),
            Err(DomainError::ProductNotFound(_))
        ));
        assert_eq!(svc.list_products(PageRequest::new(None, None)).expect("list").total, 0);
    }

    #[test]
    fn lists_products_by_page() {
        let svc = service();
        for i in 0..5 {
            svc.create_product(input(&format!("Item {}", i), "1")).expect("create");
        }

        let page = svc.list_products(PageRequest::new(Some(2), Some(3))).expect("list");

        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
    }
}
