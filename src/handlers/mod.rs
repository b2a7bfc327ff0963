pub mod cart;
pub mod orders;
pub mod products;
pub mod views;

use actix_web::{web, HttpRequest, HttpResponse, HttpResponseBuilder};
use utoipa::OpenApi;
use uuid::Uuid;

use crate::errors::AppError;

use views::CartResponse;

pub const SESSION_HEADER: &str = "X-Cart-Session";

/// Reads the cart session id from [`SESSION_HEADER`]; absent means no cart yet.
pub fn session_id(req: &HttpRequest) -> Result<Option<Uuid>, AppError> {
    let Some(value) = req.headers().get(SESSION_HEADER) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::BadRequest(format!("{} is not valid text", SESSION_HEADER)))?;
    Uuid::parse_str(value.trim())
        .map(Some)
        .map_err(|_| AppError::BadRequest(format!("{} is not a valid UUID", SESSION_HEADER)))
}

/// Builds a cart response, echoing the live session id in [`SESSION_HEADER`].
pub fn cart_response(mut builder: HttpResponseBuilder, body: CartResponse) -> HttpResponse {
    if let Some(id) = body.session_id {
        builder.insert_header((SESSION_HEADER, id.to_string()));
    }
    builder.json(body)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        cart::get_cart,
        cart::add_item,
        cart::adjust_quantity,
        cart::remove_item,
        orders::place_order,
        orders::get_order,
        orders::list_orders,
        products::create_product,
        products::get_product,
        products::update_product,
        products::delete_product,
        products::list_products,
    ),
    components(schemas(
        cart::AddItemRequest,
        cart::AdjustQuantityRequest,
        cart::QuantityAction,
        orders::PlaceOrderRequest,
        products::CreateProductRequest,
        products::UpdateProductRequest,
        views::CartResponse,
        views::CartLineResponse,
        views::NoticeResponse,
        views::AlertType,
        views::OrderResponse,
        views::OrderLineResponse,
        views::OrderSummaryResponse,
        views::ListOrdersResponse,
        views::ProductResponse,
        views::ListProductsResponse,
    )),
    tags(
        (name = "cart", description = "Shopping cart of the current session"),
        (name = "orders", description = "Checkout and placed orders"),
        (name = "products", description = "Product catalog"),
    )
)]
pub struct ApiDoc;

/// Registers every route of the service.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/cart")
            .route("", web::get().to(cart::get_cart))
            .route("/items", web::post().to(cart::add_item))
            .route("/items/{product_id}", web::patch().to(cart::adjust_quantity))
            .route("/items/{product_id}", web::delete().to(cart::remove_item)),
    )
    .route("/checkout", web::post().to(orders::place_order))
    .service(
        web::scope("/orders")
            .route("", web::get().to(orders::list_orders))
            .route("/{id}", web::get().to(orders::get_order)),
    )
    .service(
        web::scope("/products")
            .route("", web::get().to(products::list_products))
            .route("", web::post().to(products::create_product))
            .route("/{id}", web::get().to(products::get_product))
            .route("/{id}", web::patch().to(products::update_product))
            .route("/{id}", web::delete().to(products::delete_product)),
    );
}
