use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::clock::Clock;
use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, NewOrder, OrderLineInput, OrderStatus, OrderView};
use crate::domain::ports::{AddressStore, CatalogStore, OrderRepository, UserStore};
use crate::domain::pricing::{self, PricingConfig};

/// Accidental client/server drift beyond this fails order creation. This
/// is not a tamper guard; the submitted unit prices are trusted as the
/// order's frozen prices.
fn max_total_variance() -> BigDecimal {
    // 0.01 currency units
    BigDecimal::new(1.into(), 2)
}

/// The order lifecycle manager: creation from a validated snapshot, status
/// transitions, cancellation and administrative deletion.
pub struct OrderService<O, C, U, A, K> {
    orders: O,
    catalog: C,
    users: U,
    addresses: A,
    pricing: PricingConfig,
    clock: K,
}

impl<O, C, U, A, K> OrderService<O, C, U, A, K>
where
    O: OrderRepository,
    C: CatalogStore,
    U: UserStore,
    A: AddressStore,
    K: Clock,
{
    pub fn new(
        orders: O,
        catalog: C,
        users: U,
        addresses: A,
        pricing: PricingConfig,
        clock: K,
    ) -> Self {
        OrderService {
            orders,
            catalog,
            users,
            addresses,
            pricing,
            clock,
        }
    }

    /// Create an order from a submitted line snapshot.
    ///
    /// The server recomputes the subtotal from the submitted unit prices
    /// and quantities and validates it against the client total within a
    /// small tolerance. Shipping, tax and the grand total are always
    /// computed server-side. Stock is decremented in the same transaction
    /// that persists the order.
    pub fn create_order(
        &self,
        user_id: Uuid,
        address_id: Uuid,
        items: Vec<OrderLineInput>,
        client_total: BigDecimal,
    ) -> Result<OrderView, DomainError> {
        if !self.users.user_exists(user_id)? {
            return Err(DomainError::not_found("user", user_id));
        }
        let address = self
            .addresses
            .find_address(address_id)?
            .ok_or_else(|| DomainError::not_found("address", address_id))?;
        if address.user_id != user_id {
            return Err(DomainError::Unauthorized(
                "Shipping address does not belong to the user".into(),
            ));
        }
        if items.is_empty() {
            return Err(DomainError::InvalidInput(
                "Order must contain at least one item".into(),
            ));
        }
        for item in &items {
            if item.quantity <= 0 {
                return Err(DomainError::InvalidInput(
                    "Item quantity must be greater than zero".into(),
                ));
            }
            if self.catalog.find_product(item.product_id)?.is_none() {
                return Err(DomainError::not_found("product", item.product_id));
            }
        }

        let subtotal = pricing::subtotal(&items);
        let variance = (&subtotal - &client_total).abs();
        if variance > max_total_variance() {
            return Err(DomainError::InvalidOrderTotal {
                calculated: subtotal,
                received: client_total,
            });
        }

        let shipping = pricing::shipping(&self.pricing, &subtotal);
        let tax = pricing::tax(&self.pricing, &subtotal);
        let total = pricing::total(&subtotal, &shipping, &tax);

        self.orders.create(
            NewOrder {
                user_id,
                address_id,
                subtotal_amount: subtotal,
                shipping_cost: shipping,
                tax_amount: tax,
                total_amount: total,
                lines: items,
            },
            self.clock.now(),
        )
    }

    pub fn get_order(&self, id: Uuid) -> Result<OrderView, DomainError> {
        self.orders
            .find_by_id(id)?
            .ok_or_else(|| DomainError::not_found("order", id))
    }

    pub fn list_orders(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        self.orders.list(page, limit)
    }

    pub fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError> {
        if !self.users.user_exists(user_id)? {
            return Err(DomainError::not_found("user", user_id));
        }
        self.orders.list_for_user(user_id)
    }

    /// Apply a status change after validating it against the state
    /// machine. Only `status` and `updated_at` ever change on a persisted
    /// order.
    pub fn update_status(&self, order_id: Uuid, status: &str) -> Result<OrderView, DomainError> {
        let next: OrderStatus = status.parse()?;
        let mut order = self.get_order(order_id)?;
        if !order.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: order.status,
                to: next,
            });
        }
        let now = self.clock.now();
        self.orders.update_status(order_id, next, now)?;
        order.status = next;
        order.updated_at = now;
        Ok(order)
    }

    pub fn cancel_order(&self, order_id: Uuid) -> Result<OrderView, DomainError> {
        let mut order = self.get_order(order_id)?;
        match order.status {
            OrderStatus::Cancelled => {
                return Err(DomainError::InvalidInput(
                    "Order is already cancelled".into(),
                ))
            }
            OrderStatus::Delivered => {
                return Err(DomainError::InvalidInput(
                    "Cannot cancel a delivered order".into(),
                ))
            }
            _ => {}
        }
        let now = self.clock.now();
        self.orders
            .update_status(order_id, OrderStatus::Cancelled, now)?;
        order.status = OrderStatus::Cancelled;
        order.updated_at = now;
        Ok(order)
    }

    /// Administrative hard delete of the order and its lines. Customer
    /// cancellation goes through `cancel_order` instead.
    pub fn delete_order(&self, order_id: Uuid) -> Result<(), DomainError> {
        if !self.orders.delete(order_id)? {
            return Err(DomainError::not_found("order", order_id));
        }
        Ok(())
    }
}
