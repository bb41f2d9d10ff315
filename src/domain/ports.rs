use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::deal::Deal;
use super::errors::DomainError;
use super::order::{ListResult, NewOrder, OrderStatus, OrderView};

/// The slice of a catalog product the transaction core reads. The catalog
/// itself is owned elsewhere.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct AddressView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// A cart line as stored, before catalog/deal enrichment.
#[derive(Debug, Clone)]
pub struct CartLineRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CartRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lines: Vec<CartLineRecord>,
}

pub trait CatalogStore: Send + Sync + 'static {
    fn find_product(&self, id: Uuid) -> Result<Option<ProductView>, DomainError>;
}

pub trait UserStore: Send + Sync + 'static {
    fn user_exists(&self, id: Uuid) -> Result<bool, DomainError>;
}

pub trait AddressStore: Send + Sync + 'static {
    fn find_address(&self, id: Uuid) -> Result<Option<AddressView>, DomainError>;
}

pub trait CartRepository: Send + Sync + 'static {
    /// Load the user's cart with its lines, creating an empty cart on
    /// first access.
    fn find_or_create(&self, user_id: Uuid) -> Result<CartRecord, DomainError>;

    /// Insert or replace the line for `product_id` with an absolute
    /// quantity. Quantities must already be validated by the caller.
    fn set_line_quantity(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), DomainError>;

    /// Delete a line by id. Returns false when the cart holds no such line.
    fn remove_line(&self, cart_id: Uuid, line_id: Uuid) -> Result<bool, DomainError>;

    fn clear(&self, cart_id: Uuid) -> Result<(), DomainError>;
}

pub trait DealRepository: Send + Sync + 'static {
    fn insert(&self, deal: &Deal) -> Result<(), DomainError>;

    /// Replace an existing deal wholesale. Returns false when absent.
    fn update(&self, deal: &Deal) -> Result<bool, DomainError>;

    fn find_by_id(&self, id: Uuid) -> Result<Option<Deal>, DomainError>;

    fn list(&self) -> Result<Vec<Deal>, DomainError>;

    /// Deals whose product set references the given product, regardless of
    /// activity. Window filtering is the resolver's job.
    fn find_for_product(&self, product_id: Uuid) -> Result<Vec<Deal>, DomainError>;

    /// All deals currently flagged active, window not considered.
    fn list_flagged_active(&self) -> Result<Vec<Deal>, DomainError>;

    fn set_active(&self, id: Uuid, active: bool) -> Result<(), DomainError>;

    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Persist the order with all of its lines and decrement catalog stock
    /// for every line, in a single transaction: either everything commits
    /// or nothing does. Fails with `InsufficientStock` when any product
    /// cannot cover its line quantity.
    fn create(&self, order: NewOrder, now: DateTime<Utc>) -> Result<OrderView, DomainError>;

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError>;

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError>;

    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError>;

    fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Hard-delete the order and its lines. Returns false when absent.
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}
