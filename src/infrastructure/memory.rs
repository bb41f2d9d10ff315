//! In-memory adapters for the domain ports. Used by the service tests and
//! handy for wiring the application without a database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::deal::Deal;
use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, NewOrder, OrderLineView, OrderStatus, OrderView};
use crate::domain::ports::{
    AddressStore, AddressView, CartLineRecord, CartRecord, CartRepository, CatalogStore,
    DealRepository, OrderRepository, ProductView, UserStore,
};

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<Mutex<HashMap<Uuid, ProductView>>>,
}

impl InMemoryCatalog {
    pub fn insert(&self, product: ProductView) {
        locked(&self.products).insert(product.id, product);
    }

    pub fn quantity(&self, id: Uuid) -> Option<i32> {
        locked(&self.products).get(&id).map(|p| p.quantity)
    }
}

impl CatalogStore for InMemoryCatalog {
    fn find_product(&self, id: Uuid) -> Result<Option<ProductView>, DomainError> {
        Ok(locked(&self.products).get(&id).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<Mutex<HashMap<Uuid, ()>>>,
}

impl InMemoryUserStore {
    pub fn insert(&self, id: Uuid) {
        locked(&self.users).insert(id, ());
    }
}

impl UserStore for InMemoryUserStore {
    fn user_exists(&self, id: Uuid) -> Result<bool, DomainError> {
        Ok(locked(&self.users).contains_key(&id))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAddressStore {
    addresses: Arc<Mutex<HashMap<Uuid, AddressView>>>,
}

impl InMemoryAddressStore {
    pub fn insert(&self, address: AddressView) {
        locked(&self.addresses).insert(address.id, address);
    }
}

impl AddressStore for InMemoryAddressStore {
    fn find_address(&self, id: Uuid) -> Result<Option<AddressView>, DomainError> {
        Ok(locked(&self.addresses).get(&id).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCartRepository {
    carts: Arc<Mutex<HashMap<Uuid, CartRecord>>>,
}

impl CartRepository for InMemoryCartRepository {
    fn find_or_create(&self, user_id: Uuid) -> Result<CartRecord, DomainError> {
        let mut carts = locked(&self.carts);
        if let Some(cart) = carts.values().find(|c| c.user_id == user_id) {
            return Ok(cart.clone());
        }
        let cart = CartRecord {
            id: Uuid::new_v4(),
            user_id,
            lines: vec![],
        };
        carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    fn set_line_quantity(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), DomainError> {
        let mut carts = locked(&self.carts);
        let cart = carts
            .get_mut(&cart_id)
            .ok_or_else(|| DomainError::not_found("cart", cart_id))?;
        match cart.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = quantity,
            None => cart.lines.push(CartLineRecord {
                id: Uuid::new_v4(),
                product_id,
                quantity,
            }),
        }
        Ok(())
    }

    fn remove_line(&self, cart_id: Uuid, line_id: Uuid) -> Result<bool, DomainError> {
        let mut carts = locked(&self.carts);
        let cart = carts
            .get_mut(&cart_id)
            .ok_or_else(|| DomainError::not_found("cart", cart_id))?;
        let before = cart.lines.len();
        cart.lines.retain(|l| l.id != line_id);
        Ok(cart.lines.len() < before)
    }

    fn clear(&self, cart_id: Uuid) -> Result<(), DomainError> {
        let mut carts = locked(&self.carts);
        let cart = carts
            .get_mut(&cart_id)
            .ok_or_else(|| DomainError::not_found("cart", cart_id))?;
        cart.lines.clear();
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryDealRepository {
    deals: Arc<Mutex<HashMap<Uuid, Deal>>>,
}

impl DealRepository for InMemoryDealRepository {
    fn insert(&self, deal: &Deal) -> Result<(), DomainError> {
        locked(&self.deals).insert(deal.id, deal.clone());
        Ok(())
    }

    fn update(&self, deal: &Deal) -> Result<bool, DomainError> {
        let mut deals = locked(&self.deals);
        if !deals.contains_key(&deal.id) {
            return Ok(false);
        }
        deals.insert(deal.id, deal.clone());
        Ok(true)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Deal>, DomainError> {
        Ok(locked(&self.deals).get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<Deal>, DomainError> {
        Ok(locked(&self.deals).values().cloned().collect())
    }

    fn find_for_product(&self, product_id: Uuid) -> Result<Vec<Deal>, DomainError> {
        Ok(locked(&self.deals)
            .values()
            .filter(|d| d.references_product(product_id))
            .cloned()
            .collect())
    }

    fn list_flagged_active(&self) -> Result<Vec<Deal>, DomainError> {
        Ok(locked(&self.deals)
            .values()
            .filter(|d| d.is_active)
            .cloned()
            .collect())
    }

    fn set_active(&self, id: Uuid, active: bool) -> Result<(), DomainError> {
        if let Some(deal) = locked(&self.deals).get_mut(&id) {
            deal.is_active = active;
        }
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        Ok(locked(&self.deals).remove(&id).is_some())
    }
}

/// Orders plus a handle to the catalog so creation can decrement stock
/// with all-or-nothing semantics, mirroring the database transaction.
#[derive(Clone)]
pub struct InMemoryOrderRepository {
    orders: Arc<Mutex<Vec<OrderView>>>,
    catalog: InMemoryCatalog,
}

impl InMemoryOrderRepository {
    pub fn new(catalog: InMemoryCatalog) -> Self {
        Self {
            orders: Arc::new(Mutex::new(vec![])),
            catalog,
        }
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn create(&self, order: NewOrder, now: DateTime<Utc>) -> Result<OrderView, DomainError> {
        let mut products = locked(&self.catalog.products);

        // Validate every line before touching any quantity.
        for line in &order.lines {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| DomainError::not_found("product", line.product_id))?;
            if product.quantity < line.quantity {
                return Err(DomainError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available: product.quantity,
                });
            }
        }
        for line in &order.lines {
            if let Some(product) = products.get_mut(&line.product_id) {
                product.quantity -= line.quantity;
            }
        }

        let view = OrderView {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            address_id: order.address_id,
            status: OrderStatus::Pending,
            subtotal_amount: order.subtotal_amount,
            shipping_cost: order.shipping_cost,
            tax_amount: order.tax_amount,
            total_amount: order.total_amount,
            created_at: now,
            updated_at: now,
            lines: order
                .lines
                .into_iter()
                .map(|l| OrderLineView {
                    id: Uuid::new_v4(),
                    product_id: l.product_id,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                })
                .collect(),
        };
        locked(&self.orders).push(view.clone());
        Ok(view)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        Ok(locked(&self.orders).iter().find(|o| o.id == id).cloned())
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let orders = locked(&self.orders);
        let offset = ((page - 1) * limit).max(0) as usize;
        Ok(ListResult {
            items: orders
                .iter()
                .rev()
                .skip(offset)
                .take(limit.max(0) as usize)
                .cloned()
                .collect(),
            total: orders.len() as i64,
        })
    }

    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError> {
        Ok(locked(&self.orders)
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut orders = locked(&self.orders);
        let order = orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| DomainError::not_found("order", id))?;
        order.status = status;
        order.updated_at = updated_at;
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut orders = locked(&self.orders);
        let before = orders.len();
        orders.retain(|o| o.id != id);
        Ok(orders.len() < before)
    }
}
