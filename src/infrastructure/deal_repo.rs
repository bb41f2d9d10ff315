use std::collections::HashMap;

use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::deal::Deal;
use crate::domain::errors::DomainError;
use crate::domain::ports::DealRepository;
use crate::schema::{deal_products, deals};

use super::models::{DealProductRow, DealRow, NewDealRow};

#[derive(Clone)]
pub struct DieselDealRepository {
    pool: DbPool,
}

impl DieselDealRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn to_insert_row(deal: &Deal) -> NewDealRow {
    NewDealRow {
        id: deal.id,
        title: deal.title.clone(),
        discount_percentage: deal.discount_percentage.clone(),
        start_date: deal.start_date,
        end_date: deal.end_date,
        start_time: deal.start_time,
        end_time: deal.end_time,
        is_active: deal.is_active,
    }
}

fn join_rows(deal: &Deal) -> Vec<DealProductRow> {
    deal.product_ids
        .iter()
        .map(|p| DealProductRow {
            deal_id: deal.id,
            product_id: *p,
        })
        .collect()
}

fn to_deal(row: DealRow, product_ids: Vec<Uuid>) -> Deal {
    Deal {
        id: row.id,
        title: row.title,
        discount_percentage: row.discount_percentage,
        start_date: row.start_date,
        end_date: row.end_date,
        start_time: row.start_time,
        end_time: row.end_time,
        is_active: row.is_active,
        product_ids,
    }
}

/// Load the product sets for a batch of deal rows in one query.
fn attach_products(
    conn: &mut PgConnection,
    rows: Vec<DealRow>,
) -> Result<Vec<Deal>, DomainError> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let joins: Vec<DealProductRow> = deal_products::table
        .filter(deal_products::deal_id.eq_any(&ids))
        .load(conn)?;

    let mut by_deal: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for join in joins {
        by_deal.entry(join.deal_id).or_default().push(join.product_id);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let products = by_deal.remove(&row.id).unwrap_or_default();
            to_deal(row, products)
        })
        .collect())
}

impl DealRepository for DieselDealRepository {
    fn insert(&self, deal: &Deal) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(deals::table)
                .values(&to_insert_row(deal))
                .execute(conn)?;
            diesel::insert_into(deal_products::table)
                .values(&join_rows(deal))
                .execute(conn)?;
            Ok(())
        })
    }

    fn update(&self, deal: &Deal) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(deals::table.filter(deals::id.eq(deal.id)))
                .set((
                    deals::title.eq(&deal.title),
                    deals::discount_percentage.eq(&deal.discount_percentage),
                    deals::start_date.eq(deal.start_date),
                    deals::end_date.eq(deal.end_date),
                    deals::start_time.eq(deal.start_time),
                    deals::end_time.eq(deal.end_time),
                    deals::is_active.eq(deal.is_active),
                    deals::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn)?;

            if updated == 0 {
                return Ok(false);
            }

            // The product set is replaced wholesale.
            diesel::delete(deal_products::table.filter(deal_products::deal_id.eq(deal.id)))
                .execute(conn)?;
            diesel::insert_into(deal_products::table)
                .values(&join_rows(deal))
                .execute(conn)?;
            Ok(true)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Deal>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = deals::table
            .filter(deals::id.eq(id))
            .select(DealRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(attach_products(&mut conn, vec![row])?.pop())
    }

    fn list(&self) -> Result<Vec<Deal>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = deals::table
            .order(deals::created_at.desc())
            .select(DealRow::as_select())
            .load(&mut conn)?;
        attach_products(&mut conn, rows)
    }

    fn find_for_product(&self, product_id: Uuid) -> Result<Vec<Deal>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = deals::table
            .inner_join(deal_products::table)
            .filter(deal_products::product_id.eq(product_id))
            .select(DealRow::as_select())
            .load(&mut conn)?;
        attach_products(&mut conn, rows)
    }

    fn list_flagged_active(&self) -> Result<Vec<Deal>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = deals::table
            .filter(deals::is_active.eq(true))
            .select(DealRow::as_select())
            .load(&mut conn)?;
        attach_products(&mut conn, rows)
    }

    fn set_active(&self, id: Uuid, active: bool) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        diesel::update(deals::table.filter(deals::id.eq(id)))
            .set((
                deals::is_active.eq(active),
                deals::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        // deal_products rows go with the deal via ON DELETE CASCADE.
        let deleted = diesel::delete(deals::table.filter(deals::id.eq(id))).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}
