use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::{ProductCatalog, ProductLookup};
use crate::domain::product::{NewProduct, Product, ProductPage, ProductUpdate};
use crate::schema::products;

use super::models::{NewProductRow, ProductChangeset, ProductRow};

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            available: row.available,
            created_at: row.created_at,
        }
    }
}

pub struct DieselProductRepository {
    pool: DbPool,
}

impl DieselProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ProductLookup for DieselProductRepository {
    fn get_product(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        self.find_by_id(id)
    }
}

impl ProductCatalog for DieselProductRepository {
    fn create(&self, product: NewProduct) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;

        let row: ProductRow = diesel::insert_into(products::table)
            .values(&NewProductRow {
                id: Uuid::new_v4(),
                name: product.name,
                description: product.description,
                price: product.price,
                available: product.available,
            })
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?;

        Ok(row.into())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let row: Option<ProductRow> = products::table
            .filter(products::id.eq(id))
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.map(Product::from))
    }

    fn update(&self, id: Uuid, changes: ProductUpdate) -> Result<Option<Product>, DomainError> {
        // Diesel refuses an UPDATE without columns.
        if changes.is_empty() {
            return self.find_by_id(id);
        }
        let mut conn = self.pool.get()?;

        let row: Option<ProductRow> = diesel::update(products::table.find(id))
            .set(&ProductChangeset {
                name: changes.name,
                description: changes.description,
                price: changes.price,
                available: changes.available,
            })
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)
            .optional()?;

        Ok(row.map(Product::from))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(products::table.find(id)).execute(&mut conn)?;

        Ok(deleted > 0)
    }

    fn list(&self, offset: i64, limit: i64) -> Result<ProductPage, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = products::table.count().get_result(conn)?;

            let rows: Vec<ProductRow> = products::table
                .select(ProductRow::as_select())
                .order((products::created_at.desc(), products::id.asc()))
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            Ok(ProductPage {
                items: rows.into_iter().map(Product::from).collect(),
                total,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    use super::DieselProductRepository;
    use crate::domain::ports::{ProductCatalog, ProductLookup};
    use crate::domain::product::{NewProduct, ProductUpdate};
    use crate::infrastructure::test_db::setup_db;

    fn new_product(name: &str, price: &str) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: "Seeded".to_string(),
            price: BigDecimal::from_str(price).expect("valid decimal"),
            available: true,
        }
    }

    #[tokio::test]
    #[ignore = "requires a container runtime (docker or podman)"]
    async fn create_and_lookup_roundtrip() {
        let (_container, pool) = setup_db().await;
        let repo = DieselProductRepository::new(pool);

        let created = repo.create(new_product("Laptop", "999.90")).expect("create failed");
        let found = repo
            .get_product(created.id)
            .expect("lookup failed")
            .expect("product should exist");

        assert_eq!(found, created);
        assert_eq!(found.price, BigDecimal::from_str("999.90").expect("decimal"));
    }

    #[tokio::test]
    #[ignore = "requires a container runtime (docker or podman)"]
    async fn lookup_of_unknown_id_is_none() {
        let (_container, pool) = setup_db().await;
        let repo = DieselProductRepository::new(pool);

        assert!(repo.get_product(Uuid::new_v4()).expect("lookup failed").is_none());
    }

    #[tokio::test]
    #[ignore = "requires a container runtime (docker or podman)"]
    async fn list_paginates_correctly() {
        let (_container, pool) = setup_db().await;
        let repo = DieselProductRepository::new(pool);
        for i in 0..4 {
            repo.create(new_product(&format!("TV {}", i), "10"))
                .expect("create failed");
        }

        let page2 = repo.list(3, 3).expect("list failed");

        assert_eq!(page2.total, 4);
        assert_eq!(page2.items.len(), 1);
    }

    #[tokio::test]
    #[ignore = "requires a container runtime (docker or podman)"]
    async fn update_changes_only_given_columns() {
        let (_container, pool) = setup_db().await;
        let repo = DieselProductRepository::new(pool);
        let created = repo.create(new_product("Lamp", "20.00")).expect("create failed");

        let updated = repo
            .update(
                created.id,
                ProductUpdate {
                    price: Some(BigDecimal::from_str("17.50").expect("decimal")),
                    available: Some(false),
                    ..ProductUpdate::default()
                },
            )
            .expect("update failed")
            .expect("product should exist");

        assert_eq!(updated.name, "Lamp");
        assert_eq!(updated.price, BigDecimal::from_str("17.50").expect("decimal"));
        assert!(!updated.available);
        assert_eq!(updated.created_at, created.created_at);

        let unchanged = repo
            .update(created.id, ProductUpdate::default())
            .expect("empty update failed");
        assert_eq!(unchanged, Some(updated));
        assert_eq!(
            repo.update(Uuid::new_v4(), ProductUpdate::default()).expect("update failed"),
            None
        );
    }

    #[tokio::test]
    #[ignore = "requires a container runtime (docker or podman)"]
    async fn delete_removes_product_once() {
        let (_container, pool) = setup_db().await;
        let repo = DieselProductRepository::new(pool);
        let created = repo.create(new_product("Lamp", "20.00")).expect("create failed");

        assert!(repo.delete(created.id).expect("delete failed"));
        assert!(!repo.delete(created.id).expect("second delete failed"));
        assert!(repo.get_product(created.id).expect("lookup failed").is_none());
    }
}
