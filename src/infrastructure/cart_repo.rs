use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartLineRecord, CartRecord, CartRepository};
use crate::schema::{cart_items, carts};

use super::models::{CartItemRow, CartRow, NewCartItemRow, NewCartRow};

#[derive(Clone)]
pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn touch(conn: &mut PgConnection, cart_id: Uuid) -> Result<(), DomainError> {
        diesel::update(carts::table.filter(carts::id.eq(cart_id)))
            .set(carts::updated_at.eq(diesel::dsl::now))
            .execute(conn)?;
        Ok(())
    }
}

impl CartRepository for DieselCartRepository {
    fn find_or_create(&self, user_id: Uuid) -> Result<CartRecord, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Concurrent first accesses race on the user_id unique key, so
            // insert tolerantly and reselect.
            diesel::insert_into(carts::table)
                .values(&NewCartRow {
                    id: Uuid::new_v4(),
                    user_id,
                })
                .on_conflict(carts::user_id)
                .do_nothing()
                .execute(conn)?;

            let cart = carts::table
                .filter(carts::user_id.eq(user_id))
                .select(CartRow::as_select())
                .first(conn)?;

            let lines = cart_items::table
                .filter(cart_items::cart_id.eq(cart.id))
                .order(cart_items::created_at.asc())
                .select(CartItemRow::as_select())
                .load(conn)?;

            Ok(CartRecord {
                id: cart.id,
                user_id: cart.user_id,
                lines: lines
                    .into_iter()
                    .map(|l| CartLineRecord {
                        id: l.id,
                        product_id: l.product_id,
                        quantity: l.quantity,
                    })
                    .collect(),
            })
        })
    }

    fn set_line_quantity(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(cart_items::table)
                .values(&NewCartItemRow {
                    id: Uuid::new_v4(),
                    cart_id,
                    product_id,
                    quantity,
                })
                .on_conflict((cart_items::cart_id, cart_items::product_id))
                .do_update()
                .set(cart_items::quantity.eq(quantity))
                .execute(conn)?;

            Self::touch(conn, cart_id)
        })
    }

    fn remove_line(&self, cart_id: Uuid, line_id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let deleted = diesel::delete(
                cart_items::table
                    .filter(cart_items::id.eq(line_id))
                    .filter(cart_items::cart_id.eq(cart_id)),
            )
            .execute(conn)?;

            if deleted > 0 {
                Self::touch(conn, cart_id)?;
            }
            Ok(deleted > 0)
        })
    }

    fn clear(&self, cart_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart_id)))
                .execute(conn)?;
            Self::touch(conn, cart_id)
        })
    }
}
