use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::{CatalogStore, ProductView};
use crate::schema::products;

use super::models::ProductRow;

/// Read-only view over the product catalog. Stock mutation happens inside
/// the order repository's transaction, never here.
#[derive(Clone)]
pub struct DieselCatalogStore {
    pool: DbPool,
}

impl DieselCatalogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogStore for DieselCatalogStore {
    fn find_product(&self, id: Uuid) -> Result<Option<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = products::table
            .filter(products::id.eq(id))
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.map(|p| ProductView {
            id: p.id,
            name: p.name,
            price: p.price,
            quantity: p.quantity,
        }))
    }
}
