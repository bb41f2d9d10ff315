pub mod cart;
pub mod deals;
pub mod orders;

use std::str::FromStr;

use actix_web::HttpResponse;
use bigdecimal::BigDecimal;

use crate::domain::errors::DomainError;
use crate::errors::AppError;

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up"),
    ),
    tag = "health"
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Parse a decimal sent as a string, rejecting it as client input rather
/// than an internal failure.
pub(crate) fn parse_decimal(field: &str, raw: &str) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(raw).map_err(|_| {
        AppError::Domain(DomainError::InvalidInput(format!(
            "Invalid decimal for {field}: '{raw}'"
        )))
    })
}
