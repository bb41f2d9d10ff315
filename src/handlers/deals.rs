use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::deal::{Deal, DealDraft};
use crate::errors::{with_retries, AppError};
use crate::PgDealService;

use super::parse_decimal;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct DealRequest {
    pub title: String,
    /// Decimal percentage as a string to avoid floating-point issues, e.g. "25.00"
    pub discount_percentage: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub product_ids: Vec<Uuid>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DealResponse {
    pub id: Uuid,
    pub title: String,
    pub discount_percentage: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
    pub product_ids: Vec<Uuid>,
}

impl From<Deal> for DealResponse {
    fn from(d: Deal) -> Self {
        DealResponse {
            id: d.id,
            title: d.title,
            discount_percentage: d.discount_percentage.to_string(),
            start_date: d.start_date,
            end_date: d.end_date,
            start_time: d.start_time,
            end_time: d.end_time,
            is_active: d.is_active,
            product_ids: d.product_ids,
        }
    }
}

impl DealRequest {
    fn into_draft(self) -> Result<DealDraft, AppError> {
        Ok(DealDraft {
            title: self.title,
            discount_percentage: parse_decimal("discount_percentage", &self.discount_percentage)?,
            start_date: self.start_date,
            end_date: self.end_date,
            start_time: self.start_time,
            end_time: self.end_time,
            is_active: self.is_active,
            product_ids: self.product_ids,
        })
    }
}

fn to_responses(deals: Vec<Deal>) -> Vec<DealResponse> {
    deals.into_iter().map(DealResponse::from).collect()
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /deals
#[utoipa::path(
    get,
    path = "/deals",
    responses(
        (status = 200, description = "All deals, active or not", body = [DealResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "deals"
)]
pub async fn list_deals(svc: web::Data<PgDealService>) -> Result<HttpResponse, AppError> {
    let deals = web::block(move || with_retries(|| svc.list_deals()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(to_responses(deals)))
}

/// GET /deals/active
///
/// Deals whose window covers the current instant, best discount first.
#[utoipa::path(
    get,
    path = "/deals/active",
    responses(
        (status = 200, description = "Currently active deals", body = [DealResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "deals"
)]
pub async fn list_active_deals(svc: web::Data<PgDealService>) -> Result<HttpResponse, AppError> {
    let deals = web::block(move || with_retries(|| svc.list_active_deals()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(to_responses(deals)))
}

/// GET /deals/{id}
#[utoipa::path(
    get,
    path = "/deals/{id}",
    params(
        ("id" = Uuid, Path, description = "Deal UUID"),
    ),
    responses(
        (status = 200, description = "Deal found", body = DealResponse),
        (status = 404, description = "Deal not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "deals"
)]
pub async fn get_deal(
    svc: web::Data<PgDealService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let deal = web::block(move || with_retries(|| svc.get_deal(id)))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(DealResponse::from(deal)))
}

/// GET /products/{product_id}/deals
///
/// Deals currently applicable to the product, best discount first. An
/// empty list means the product sells at full price.
#[utoipa::path(
    get,
    path = "/products/{product_id}/deals",
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 200, description = "Active deals for the product", body = [DealResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "deals"
)]
pub async fn deals_for_product(
    svc: web::Data<PgDealService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let deals = web::block(move || with_retries(|| svc.active_deals_for_product(product_id)))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(to_responses(deals)))
}

/// POST /deals
#[utoipa::path(
    post,
    path = "/deals",
    request_body = DealRequest,
    responses(
        (status = 201, description = "Deal created", body = DealResponse),
        (status = 400, description = "Invalid window, discount or product ids"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "deals"
)]
pub async fn create_deal(
    svc: web::Data<PgDealService>,
    body: web::Json<DealRequest>,
) -> Result<HttpResponse, AppError> {
    let draft = body.into_inner().into_draft()?;
    let deal = web::block(move || with_retries(|| svc.create_deal(draft.clone())))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Created().json(DealResponse::from(deal)))
}

/// PUT /deals/{id}
#[utoipa::path(
    put,
    path = "/deals/{id}",
    params(
        ("id" = Uuid, Path, description = "Deal UUID"),
    ),
    request_body = DealRequest,
    responses(
        (status = 200, description = "Deal replaced", body = DealResponse),
        (status = 400, description = "Invalid window, discount or product ids"),
        (status = 404, description = "Deal not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "deals"
)]
pub async fn update_deal(
    svc: web::Data<PgDealService>,
    path: web::Path<Uuid>,
    body: web::Json<DealRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let draft = body.into_inner().into_draft()?;
    let deal = web::block(move || with_retries(|| svc.update_deal(id, draft.clone())))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(DealResponse::from(deal)))
}

/// DELETE /deals/{id}
#[utoipa::path(
    delete,
    path = "/deals/{id}",
    params(
        ("id" = Uuid, Path, description = "Deal UUID"),
    ),
    responses(
        (status = 204, description = "Deal deleted"),
        (status = 404, description = "Deal not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "deals"
)]
pub async fn delete_deal(
    svc: web::Data<PgDealService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || with_retries(|| svc.delete_deal(id)))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::NoContent().finish())
}
