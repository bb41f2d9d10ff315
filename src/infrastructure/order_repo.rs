use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, NewOrder, OrderLineView, OrderStatus, OrderView};
use crate::domain::ports::OrderRepository;
use crate::schema::{order_items, orders, products};

use super::models::{NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow};

#[derive(Clone)]
pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn to_view(row: OrderRow, lines: Vec<OrderItemRow>) -> Result<OrderView, DomainError> {
    let status: OrderStatus = row.status.parse()?;
    Ok(OrderView {
        id: row.id,
        user_id: row.user_id,
        address_id: row.address_id,
        status,
        subtotal_amount: row.subtotal_amount,
        shipping_cost: row.shipping_cost,
        tax_amount: row.tax_amount,
        total_amount: row.total_amount,
        created_at: row.created_at,
        updated_at: row.updated_at,
        lines: lines
            .into_iter()
            .map(|l| OrderLineView {
                id: l.id,
                product_id: l.product_id,
                quantity: l.quantity,
                unit_price: l.unit_price,
            })
            .collect(),
    })
}

/// Load the line items for a batch of order rows in one query.
fn attach_lines(
    conn: &mut PgConnection,
    rows: Vec<OrderRow>,
) -> Result<Vec<OrderView>, DomainError> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let items: Vec<OrderItemRow> = order_items::table
        .filter(order_items::order_id.eq_any(&ids))
        .order(order_items::created_at.asc())
        .select(OrderItemRow::as_select())
        .load(conn)?;

    let mut by_order: HashMap<Uuid, Vec<OrderItemRow>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    rows.into_iter()
        .map(|row| {
            let lines = by_order.remove(&row.id).unwrap_or_default();
            to_view(row, lines)
        })
        .collect()
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: NewOrder, now: DateTime<Utc>) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Decrement stock with a guarded update per line. Zero rows
            //    touched means the product is gone or short on stock, and
            //    the whole transaction rolls back.
            for line in &order.lines {
                let updated = diesel::update(
                    products::table
                        .filter(products::id.eq(line.product_id))
                        .filter(products::quantity.ge(line.quantity)),
                )
                .set((
                    products::quantity.eq(products::quantity - line.quantity),
                    products::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn)?;

                if updated == 0 {
                    let available: Option<i32> = products::table
                        .filter(products::id.eq(line.product_id))
                        .select(products::quantity)
                        .first(conn)
                        .optional()?;
                    return match available {
                        Some(available) => Err(DomainError::InsufficientStock {
                            product_id: line.product_id,
                            requested: line.quantity,
                            available,
                        }),
                        None => Err(DomainError::not_found("product", line.product_id)),
                    };
                }
            }

            // 2. Insert the order
            let order_id = Uuid::new_v4();
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    user_id: order.user_id,
                    address_id: order.address_id,
                    status: OrderStatus::Pending.as_str().to_string(),
                    subtotal_amount: order.subtotal_amount.clone(),
                    shipping_cost: order.shipping_cost.clone(),
                    tax_amount: order.tax_amount.clone(),
                    total_amount: order.total_amount.clone(),
                    created_at: now,
                    updated_at: now,
                })
                .execute(conn)?;

            // 3. Insert order lines
            let new_items: Vec<NewOrderItemRow> = order
                .lines
                .iter()
                .map(|l| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: l.product_id,
                    quantity: l.quantity,
                    unit_price: l.unit_price.clone(),
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&new_items)
                .execute(conn)?;

            Ok(OrderView {
                id: order_id,
                user_id: order.user_id,
                address_id: order.address_id,
                status: OrderStatus::Pending,
                subtotal_amount: order.subtotal_amount,
                shipping_cost: order.shipping_cost,
                tax_amount: order.tax_amount,
                total_amount: order.total_amount,
                created_at: now,
                updated_at: now,
                lines: new_items
                    .into_iter()
                    .map(|l| OrderLineView {
                        id: l.id,
                        product_id: l.product_id,
                        quantity: l.quantity,
                        unit_price: l.unit_price,
                    })
                    .collect(),
            })
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(attach_lines(&mut conn, vec![row])?.pop())
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page - 1) * limit;
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table.count().get_result(conn)?;

            let rows = orders::table
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            Ok(ListResult {
                items: attach_lines(conn, rows)?,
                total,
            })
        })
    }

    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = orders::table
            .filter(orders::user_id.eq(user_id))
            .order(orders::created_at.desc())
            .select(OrderRow::as_select())
            .load(&mut conn)?;
        attach_lines(&mut conn, rows)
    }

    fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(orders::table.filter(orders::id.eq(id)))
            .set((
                orders::status.eq(status.as_str()),
                orders::updated_at.eq(updated_at),
            ))
            .execute(&mut conn)?;

        if updated == 0 {
            return Err(DomainError::not_found("order", id));
        }
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        // order_items rows go with the order via ON DELETE CASCADE.
        let deleted = diesel::delete(orders::table.filter(orders::id.eq(id))).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}
