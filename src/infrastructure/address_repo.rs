use diesel::dsl::exists;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::{AddressStore, AddressView, UserStore};
use crate::schema::{addresses, users};

use super::models::AddressRow;

#[derive(Clone)]
pub struct DieselUserStore {
    pool: DbPool,
}

impl DieselUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UserStore for DieselUserStore {
    fn user_exists(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let found = diesel::select(exists(users::table.filter(users::id.eq(id))))
            .get_result(&mut conn)?;
        Ok(found)
    }
}

#[derive(Clone)]
pub struct DieselAddressStore {
    pool: DbPool,
}

impl DieselAddressStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AddressStore for DieselAddressStore {
    fn find_address(&self, id: Uuid) -> Result<Option<AddressView>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = addresses::table
            .filter(addresses::id.eq(id))
            .select(AddressRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.map(|a| AddressView {
            id: a.id,
            user_id: a.user_id,
            street: a.street,
            city: a.city,
            state: a.state,
            zip_code: a.zip_code,
            country: a.country,
        }))
    }
}
