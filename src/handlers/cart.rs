use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::cart::QuantityDelta;
use crate::errors::AppError;
use crate::state::AppState;

use super::views::CartResponse;
use super::{cart_response, session_id};

// ── Request DTOs ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QuantityAction {
    Increment,
    Decrement,
}

impl From<QuantityAction> for QuantityDelta {
    fn from(action: QuantityAction) -> Self {
        match action {
            QuantityAction::Increment => QuantityDelta::Increment,
            QuantityAction::Decrement => QuantityDelta::Decrement,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustQuantityRequest {
    pub action: QuantityAction,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /cart
///
/// Returns the lines and total of the caller's cart. A missing or expired
/// session yields an empty cart.
#[utoipa::path(
    get,
    path = "/cart",
    params(("X-Cart-Session" = Option<Uuid>, Header, description = "Cart session id")),
    responses(
        (status = 200, description = "Current cart", body = CartResponse),
        (status = 400, description = "Malformed session header"),
    ),
    tag = "cart"
)]
pub async fn get_cart(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let session = session_id(&req)?;

    let view = web::block(move || state.carts.snapshot(session))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(cart_response(HttpResponse::Ok(), CartResponse::from(view)))
}

/// POST /cart/items
///
/// Adds one unit of a product. Adding a product that is already in the cart
/// is not an error: the cart comes back unchanged with a warning notice.
#[utoipa::path(
    post,
    path = "/cart/items",
    params(("X-Cart-Session" = Option<Uuid>, Header, description = "Cart session id")),
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Item added, or already present", body = CartResponse),
        (status = 404, description = "Product unavailable"),
    ),
    tag = "cart"
)]
pub async fn add_item(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<AddItemRequest>,
) -> Result<HttpResponse, AppError> {
    let session = session_id(&req)?;
    let product_id = body.into_inner().product_id;

    let outcome = web::block(move || state.carts.add_item(session, product_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(cart_response(HttpResponse::Ok(), CartResponse::from(outcome)))
}

/// PATCH /cart/items/{product_id}
///
/// Increments or decrements a line. Decrementing a single unit removes it.
#[utoipa::path(
    patch,
    path = "/cart/items/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
        ("X-Cart-Session" = Option<Uuid>, Header, description = "Cart session id"),
    ),
    request_body = AdjustQuantityRequest,
    responses(
        (status = 200, description = "Quantity changed or line removed", body = CartResponse),
        (status = 404, description = "Item not in cart; refresh the cart view"),
    ),
    tag = "cart"
)]
pub async fn adjust_quantity(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<AdjustQuantityRequest>,
) -> Result<HttpResponse, AppError> {
    let session = session_id(&req)?;
    let product_id = path.into_inner();
    let delta = QuantityDelta::from(body.into_inner().action);

    let outcome = web::block(move || state.carts.adjust_quantity(session, product_id, delta))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(cart_response(HttpResponse::Ok(), CartResponse::from(outcome)))
}

/// DELETE /cart/items/{product_id}
#[utoipa::path(
    delete,
    path = "/cart/items/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
        ("X-Cart-Session" = Option<Uuid>, Header, description = "Cart session id"),
    ),
    responses(
        (status = 200, description = "Line removed", body = CartResponse),
        (status = 404, description = "Item not in cart; refresh the cart view"),
    ),
    tag = "cart"
)]
pub async fn remove_item(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let session = session_id(&req)?;
    let product_id = path.into_inner();

    let outcome = web::block(move || state.carts.remove_item(session, product_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(cart_response(HttpResponse::Ok(), CartResponse::from(outcome)))
}
