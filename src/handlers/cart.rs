use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::cart::CartView;
use crate::errors::{with_retries, AppError};
use crate::PgCartService;

use super::deals::DealResponse;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    /// Signed delta applied to the line's quantity. A result of zero or
    /// below removes the line.
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: String,
    pub quantity: i32,
    pub available_quantity: i32,
    pub line_total: String,
    pub best_deal: Option<DealResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_items: usize,
    pub total_price: String,
    pub items: Vec<CartItemResponse>,
}

impl From<CartView> for CartResponse {
    fn from(cart: CartView) -> Self {
        CartResponse {
            id: cart.id,
            user_id: cart.user_id,
            total_items: cart.total_items,
            total_price: cart.total_price.to_string(),
            items: cart
                .items
                .into_iter()
                .map(|i| CartItemResponse {
                    id: i.id,
                    product_id: i.product_id,
                    line_total: i.line_total().to_string(),
                    product_name: i.product_name,
                    unit_price: i.unit_price.to_string(),
                    quantity: i.quantity,
                    available_quantity: i.available_quantity,
                    best_deal: i.best_deal.map(DealResponse::from),
                })
                .collect(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /cart/{user_id}
///
/// The user's cart, created empty on first access. Lines carry the
/// current catalog price, available stock and the best active deal.
#[utoipa::path(
    get,
    path = "/cart/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 200, description = "The user's cart", body = CartResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn get_cart(
    svc: web::Data<PgCartService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let cart = web::block(move || with_retries(|| svc.get_cart(user_id)))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// POST /cart/{user_id}/items
///
/// Add a product to the cart. Adding a product already present merges
/// into the existing line, and the merged quantity is validated against
/// current stock.
#[utoipa::path(
    post,
    path = "/cart/{user_id}/items",
    params(
        ("user_id" = Uuid, Path, description = "User UUID"),
    ),
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Non-positive quantity"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Requested quantity exceeds stock"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn add_item(
    svc: web::Data<PgCartService>,
    path: web::Path<Uuid>,
    body: web::Json<AddItemRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let body = body.into_inner();
    let cart =
        web::block(move || with_retries(|| svc.add_item(user_id, body.product_id, body.quantity)))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// PUT /cart/{user_id}/items/{item_id}
#[utoipa::path(
    put,
    path = "/cart/{user_id}/items/{item_id}",
    params(
        ("user_id" = Uuid, Path, description = "User UUID"),
        ("item_id" = Uuid, Path, description = "Cart item UUID"),
    ),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Cart item not found"),
        (status = 409, description = "Requested quantity exceeds stock"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn update_item(
    svc: web::Data<PgCartService>,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<UpdateItemRequest>,
) -> Result<HttpResponse, AppError> {
    let (user_id, item_id) = path.into_inner();
    let delta = body.into_inner().quantity;
    let cart = web::block(move || with_retries(|| svc.update_item(user_id, item_id, delta)))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// DELETE /cart/{user_id}/items/{item_id}
#[utoipa::path(
    delete,
    path = "/cart/{user_id}/items/{item_id}",
    params(
        ("user_id" = Uuid, Path, description = "User UUID"),
        ("item_id" = Uuid, Path, description = "Cart item UUID"),
    ),
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Cart item not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn remove_item(
    svc: web::Data<PgCartService>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (user_id, item_id) = path.into_inner();
    let cart = web::block(move || with_retries(|| svc.remove_item(user_id, item_id)))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// DELETE /cart/{user_id}
#[utoipa::path(
    delete,
    path = "/cart/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 204, description = "Cart emptied"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn clear_cart(
    svc: web::Data<PgCartService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    web::block(move || with_retries(|| svc.clear_cart(user_id)))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::NoContent().finish())
}
