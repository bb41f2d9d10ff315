pub mod address_repo;
pub mod cart_repo;
pub mod catalog_repo;
pub mod deal_repo;
pub mod memory;
mod models;
pub mod order_repo;

use crate::domain::errors::DomainError;

// Infrastructure failures surface as `Unavailable` so callers can retry
// them; domain failures raised inside transactions pass through untouched.

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Unavailable(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Unavailable(e.to_string())
    }
}
