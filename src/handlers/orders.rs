use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::PageRequest;
use crate::errors::AppError;
use crate::state::AppState;

use super::session_id;
use super::views::{ListOrdersResponse, OrderResponse, OrderSummaryResponse};

// ── Request DTOs ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    /// Who the order is for, e.g. an e-mail address or customer number.
    pub customer_ref: String,
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page number (1-based). Defaults to 1.
    pub page: Option<i64>,
    /// Number of items per page. Defaults to 20, maximum 100.
    pub limit: Option<i64>,
}

impl From<PageParams> for PageRequest {
    fn from(params: PageParams) -> Self {
        PageRequest::new(params.page, params.limit)
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /checkout
///
/// Turns the session's cart into an order. The order header and all of its
/// lines are written in one transaction; on failure nothing is stored and the
/// cart is left as it was, so the request can simply be retried.
#[utoipa::path(
    post,
    path = "/checkout",
    params(("X-Cart-Session" = Option<Uuid>, Header, description = "Cart session id")),
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed; the cart is now empty", body = OrderResponse),
        (status = 400, description = "Missing customer reference"),
        (status = 404, description = "A product in the cart is no longer available"),
        (status = 422, description = "Cart is empty"),
        (status = 503, description = "Order could not be stored; retry"),
    ),
    tag = "orders"
)]
pub async fn place_order(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let session = session_id(&req)?;
    let customer_ref = body.into_inner().customer_ref;

    let order = web::block(move || state.checkout.place_order(session, &customer_ref))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/{id}
///
/// Returns the order together with its line items.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || state.orders.get_order(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// Returns a paginated list of orders (without their lines), newest first.
#[utoipa::path(
    get,
    path = "/orders",
    params(PageParams),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let page = PageRequest::from(query.into_inner());

    let result = web::block(move || state.orders.list_orders(page))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result
            .items
            .into_iter()
            .map(OrderSummaryResponse::from)
            .collect(),
        total: result.total,
        page: page.page,
        limit: page.limit,
        total_pages: page.total_pages(result.total),
    }))
}
