use std::sync::Arc;
use std::time::Duration;

use diesel_migrations::MigrationHarness;

use crate::application::cart_store::{CartStore, DEFAULT_IDLE_TTL};
use crate::application::catalog_service::CatalogService;
use crate::application::checkout::CheckoutCoordinator;
use crate::application::order_service::OrderService;
use crate::application::pricing::{PricingAdapter, PricingPolicy};
use crate::config::{Config, StorageBackend};
use crate::db::create_pool;
use crate::domain::ports::{OrderStore, ProductCatalog, ProductLookup};
use crate::errors::StartupError;
use crate::infrastructure::memory::{InMemoryOrderStore, InMemoryProductCatalog};
use crate::infrastructure::order_repo::DieselOrderRepository;
use crate::infrastructure::product_repo::DieselProductRepository;
use crate::MIGRATIONS;

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub carts: Arc<CartStore>,
    pub checkout: Arc<CheckoutCoordinator>,
    pub orders: Arc<OrderService>,
    pub catalog: Arc<CatalogService>,
}

impl AppState {
    pub fn new<P>(
        products: Arc<P>,
        orders: Arc<dyn OrderStore>,
        policy: PricingPolicy,
        cart_idle_ttl: Duration,
    ) -> Self
    where
        P: ProductLookup + ProductCatalog,
    {
        let pricing = PricingAdapter::new(products.clone());
        let carts = Arc::new(CartStore::with_idle_ttl(pricing.clone(), cart_idle_ttl));
        Self {
            checkout: Arc::new(CheckoutCoordinator::new(
                carts.clone(),
                pricing,
                orders.clone(),
                policy,
            )),
            carts,
            orders: Arc::new(OrderService::new(orders)),
            catalog: Arc::new(CatalogService::new(products)),
        }
    }

    pub fn in_memory(policy: PricingPolicy) -> Self {
        Self::in_memory_with_ttl(policy, DEFAULT_IDLE_TTL)
    }

    fn in_memory_with_ttl(policy: PricingPolicy, cart_idle_ttl: Duration) -> Self {
        Self::new(
            Arc::new(InMemoryProductCatalog::new()),
            Arc::new(InMemoryOrderStore::new()),
            policy,
            cart_idle_ttl,
        )
    }

    /// Wires the configured storage backend, running pending migrations
    /// first when it is Postgres.
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        match &config.storage {
            StorageBackend::Memory => {
                log::warn!("using in-memory storage; orders are lost on restart");
                Ok(Self::in_memory_with_ttl(config.pricing_policy, config.cart_idle_ttl))
            }
            StorageBackend::Postgres { database_url } => {
                let pool = create_pool(database_url)?;
                pool.get()?
                    .run_pending_migrations(MIGRATIONS)
                    .map_err(|e| StartupError::Migrations(e.to_string()))?;
                Ok(Self::new(
                    Arc::new(DieselProductRepository::new(pool.clone())),
                    Arc::new(DieselOrderRepository::new(pool)),
                    config.pricing_policy,
                    config.cart_idle_ttl,
                ))
            }
        }
    }
}
