use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::cart::{
    Adjusted, CartChange, CartEvent, CartOutcome, CartSession, CartView, LineItem, QuantityDelta,
};
use crate::domain::errors::DomainError;

use super::pricing::PricingAdapter;

type SharedSession = Arc<Mutex<CartSession>>;

/// Carts untouched for this long are dropped when new sessions open.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Live carts keyed by session id, each behind its own lock.
///
/// Every operation on a session runs while holding that session's mutex, so
/// concurrent requests against one cart are serialized while different carts
/// proceed independently. The outer map lock is only held long enough to
/// look up, insert, or drop an entry.
///
/// A session leaves the registry when checkout clears it. Abandoned carts,
/// emptied ones included, are swept once idle for `idle_ttl`.
pub struct CartStore {
    pricing: PricingAdapter,
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
    idle_ttl: Duration,
}

fn lock(session: &SharedSession) -> Result<MutexGuard<'_, CartSession>, DomainError> {
    session
        .lock()
        .map_err(|_| DomainError::Internal("cart session lock poisoned".to_string()))
}

fn outcome(cart: &CartSession, product_id: Uuid, product_name: String, change: CartChange) -> CartOutcome {
    let view = cart.view();
    CartOutcome {
        event: CartEvent {
            product_id,
            product_name,
            change,
            total: view.total.clone(),
        },
        cart: view,
    }
}

impl CartStore {
    pub fn new(pricing: PricingAdapter) -> Self {
        Self::with_idle_ttl(pricing, DEFAULT_IDLE_TTL)
    }

    pub fn with_idle_ttl(pricing: PricingAdapter, idle_ttl: Duration) -> Self {
        Self {
            pricing,
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    fn session(&self, id: Uuid) -> Result<Option<SharedSession>, DomainError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| DomainError::Internal("cart registry lock poisoned".to_string()))?;
        Ok(sessions.get(&id).cloned())
    }

    /// Runs `f` on the live session `id` while holding its lock.
    ///
    /// Returns `Ok(None)` when there is no such session or it was closed by a
    /// checkout or sweep that raced ahead of this call.
    pub fn with_live_session<T>(
        &self,
        id: Option<Uuid>,
        f: impl FnOnce(&mut CartSession) -> Result<T, DomainError>,
    ) -> Result<Option<T>, DomainError> {
        let Some(shared) = id.map(|id| self.session(id)).transpose()?.flatten() else {
            return Ok(None);
        };
        let mut cart = lock(&shared)?;
        if cart.is_closed() {
            return Ok(None);
        }
        cart.touch();
        f(&mut cart).map(Some)
    }

    /// Adds one unit of `product_id`, opening a new session when `session` is
    /// absent or no longer live.
    ///
    /// A product that is already in the cart is reported as
    /// [`CartChange::AlreadyInCart`] and leaves the cart untouched.
    pub fn add_item(&self, session: Option<Uuid>, product_id: Uuid) -> Result<CartOutcome, DomainError> {
        let existing = self.with_live_session(session, |cart| {
            if let Some(line) = cart.get(product_id) {
                let name = line.product_name.clone();
                log::debug!("cart {}: {} already present", cart.id(), product_id);
                return Ok(outcome(cart, product_id, name, CartChange::AlreadyInCart));
            }
            let product = self.pricing.resolve(product_id)?;
            cart.insert(LineItem::for_product(&product));
            log::debug!("cart {}: added {}", cart.id(), product_id);
            Ok(outcome(cart, product_id, product.name, CartChange::Added))
        })?;
        if let Some(outcome) = existing {
            return Ok(outcome);
        }

        // Nobody else knows the new id yet, so the session is built unlocked
        // and only published once it holds its first line.
        let product = self.pricing.resolve(product_id)?;
        let mut cart = CartSession::new(Uuid::new_v4());
        cart.insert(LineItem::for_product(&product));
        let added = outcome(&cart, product_id, product.name, CartChange::Added);
        log::debug!("cart {}: opened with {}", cart.id(), product_id);

        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| DomainError::Internal("cart registry lock poisoned".to_string()))?;
        self.sweep_idle(&mut sessions);
        sessions.insert(cart.id(), Arc::new(Mutex::new(cart)));
        Ok(added)
    }

    /// Closes and drops sessions idle for at least `idle_ttl`. A session whose
    /// lock is held is in use and stays.
    fn sweep_idle(&self, sessions: &mut HashMap<Uuid, SharedSession>) {
        let before = sessions.len();
        sessions.retain(|_, shared| match shared.try_lock() {
            Ok(mut cart) => {
                if cart.is_closed() || cart.idle_for() >= self.idle_ttl {
                    cart.close();
                    false
                } else {
                    true
                }
            }
            Err(_) => true,
        });
        if sessions.len() < before {
            log::debug!("swept {} idle cart sessions", before - sessions.len());
        }
    }

    pub fn adjust_quantity(
        &self,
        session: Option<Uuid>,
        product_id: Uuid,
        delta: QuantityDelta,
    ) -> Result<CartOutcome, DomainError> {
        self.with_live_session(session, |cart| {
            let (line, change) = match cart.adjust(product_id, delta)? {
                Adjusted::Changed(line) => {
                    let quantity = line.quantity;
                    (line, CartChange::QuantityChanged { quantity })
                }
                Adjusted::Removed(line) => (line, CartChange::Removed),
            };
            log::debug!("cart {}: {:?} {} -> {:?}", cart.id(), delta, product_id, change);
            Ok(outcome(cart, product_id, line.product_name, change))
        })?
        .ok_or(DomainError::ItemNotFound(product_id))
    }

    pub fn remove_item(&self, session: Option<Uuid>, product_id: Uuid) -> Result<CartOutcome, DomainError> {
        self.with_live_session(session, |cart| {
            let line = cart
                .remove(product_id)
                .ok_or(DomainError::ItemNotFound(product_id))?;
            log::debug!("cart {}: removed {}", cart.id(), product_id);
            Ok(outcome(cart, product_id, line.product_name, CartChange::Removed))
        })?
        .ok_or(DomainError::ItemNotFound(product_id))
    }

    /// Lines of the cart in display order; empty for an unknown session.
    pub fn snapshot(&self, session: Option<Uuid>) -> Result<CartView, DomainError> {
        Ok(self
            .with_live_session(session, |cart| Ok(cart.view()))?
            .unwrap_or_else(CartView::empty))
    }

    pub fn total(&self, session: Option<Uuid>) -> Result<BigDecimal, DomainError> {
        Ok(self
            .with_live_session(session, |cart| Ok(cart.total()))?
            .unwrap_or_else(|| BigDecimal::from(0)))
    }

    /// Empties the cart and invalidates its session id. Also drops the entry
    /// of a session that a checkout has already closed.
    pub fn clear(&self, session: Uuid) -> Result<(), DomainError> {
        self.with_live_session(Some(session), |cart| {
            cart.close();
            Ok(())
        })?;
        self.forget(session)
    }

    fn forget(&self, session: Uuid) -> Result<(), DomainError> {
        self.sessions
            .write()
            .map_err(|_| DomainError::Internal("cart registry lock poisoned".to_string()))?
            .remove(&session);
        Ok(())
    }

    pub fn live_sessions(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }
}
