use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::warn;
use uuid::Uuid;

use crate::domain::cart::{check_stock, CartLineView, CartView};
use crate::domain::clock::Clock;
use crate::domain::deal::rank_active;
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartRecord, CartRepository, CatalogStore, DealRepository};

/// The cart engine: a per-user mutable set of (product, quantity) lines,
/// stock-validated on every mutation. Stock is only checked here, never
/// reserved; it is decremented at order placement.
pub struct CartService<R, C, D, K> {
    carts: R,
    catalog: C,
    deals: D,
    clock: K,
    /// One lock per user so the merge-then-check sequence cannot
    /// interleave for the same cart (lost-update hazard on concurrent
    /// adds). Carts of different users proceed independently.
    user_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl<R, C, D, K> CartService<R, C, D, K>
where
    R: CartRepository,
    C: CatalogStore,
    D: DealRepository,
    K: Clock,
{
    pub fn new(carts: R, catalog: C, deals: D, clock: K) -> Self {
        CartService {
            carts,
            catalog,
            deals,
            clock,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The user's cart, lines enriched with current price, stock and best
    /// active deal, plus undiscounted totals. Created lazily on first
    /// access.
    pub fn get_cart(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let record = self.carts.find_or_create(user_id)?;
        self.enrich(record)
    }

    pub fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::InvalidInput(
                "Quantity must be greater than zero".into(),
            ));
        }
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let record = self.carts.find_or_create(user_id)?;
        let product = self
            .catalog
            .find_product(product_id)?
            .ok_or_else(|| DomainError::not_found("product", product_id))?;

        let existing = record
            .lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .unwrap_or(0);
        // Re-validate the full post-merge quantity against current stock,
        // not just the delta. The merge must not overflow either.
        let merged = existing.checked_add(quantity).ok_or_else(|| {
            DomainError::InvalidInput("Quantity out of range".into())
        })?;
        check_stock(&product, merged)?;

        self.carts.set_line_quantity(record.id, product_id, merged)?;
        self.enrich(self.carts.find_or_create(user_id)?)
    }

    /// Apply a signed quantity delta to an existing line. Dropping the
    /// quantity to zero or below removes the line; carts never store
    /// non-positive quantities.
    pub fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity_delta: i32,
    ) -> Result<CartView, DomainError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let record = self.carts.find_or_create(user_id)?;
        let line = record
            .lines
            .iter()
            .find(|l| l.id == item_id)
            .ok_or_else(|| DomainError::not_found("cart item", item_id))?;

        let new_quantity = line.quantity.checked_add(quantity_delta).ok_or_else(|| {
            DomainError::InvalidInput("Quantity out of range".into())
        })?;
        if new_quantity <= 0 {
            self.carts.remove_line(record.id, item_id)?;
        } else {
            let product = self
                .catalog
                .find_product(line.product_id)?
                .ok_or_else(|| DomainError::not_found("product", line.product_id))?;
            check_stock(&product, new_quantity)?;
            self.carts
                .set_line_quantity(record.id, line.product_id, new_quantity)?;
        }
        self.enrich(self.carts.find_or_create(user_id)?)
    }

    /// Removal is not idempotent: removing an id that is no longer in the
    /// cart fails with not-found, including on a repeated call.
    pub fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, DomainError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let record = self.carts.find_or_create(user_id)?;
        if !self.carts.remove_line(record.id, item_id)? {
            return Err(DomainError::not_found("cart item", item_id));
        }
        self.enrich(self.carts.find_or_create(user_id)?)
    }

    /// Remove every line. A no-op when the cart is already empty.
    pub fn clear_cart(&self, user_id: Uuid) -> Result<(), DomainError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let record = self.carts.find_or_create(user_id)?;
        self.carts.clear(record.id)
    }

    fn user_lock(&self, user_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Drop entries nobody holds so the map doesn't grow with every
        // user ever seen.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(user_id).or_default().clone()
    }

    fn enrich(&self, record: CartRecord) -> Result<CartView, DomainError> {
        let now = self.clock.now();
        let (date, time) = (now.date_naive(), now.time());

        let mut items = Vec::with_capacity(record.lines.len());
        for line in record.lines {
            let product = self
                .catalog
                .find_product(line.product_id)?
                .ok_or_else(|| DomainError::not_found("product", line.product_id))?;

            // A failed deal lookup must not sink the whole cart fetch; the
            // line just renders undiscounted.
            let best_deal = match self.deals.find_for_product(line.product_id) {
                Ok(deals) => rank_active(deals, date, time).into_iter().next(),
                Err(e) => {
                    warn!("Deal lookup failed for product {}: {e}", line.product_id);
                    None
                }
            };

            items.push(CartLineView {
                id: line.id,
                product_id: line.product_id,
                product_name: product.name,
                unit_price: product.price,
                available_quantity: product.quantity,
                quantity: line.quantity,
                best_deal,
            });
        }
        Ok(CartView::assemble(record.id, record.user_id, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::domain::deal::Deal;
    use crate::domain::ports::ProductView;
    use crate::infrastructure::memory::{
        InMemoryCartRepository, InMemoryCatalog, InMemoryDealRepository,
    };
    use bigdecimal::BigDecimal;
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 4, 12, 12, 0, 0).unwrap())
    }

    fn service() -> (
        CartService<InMemoryCartRepository, InMemoryCatalog, InMemoryDealRepository, FixedClock>,
        InMemoryCatalog,
        InMemoryDealRepository,
    ) {
        let catalog = InMemoryCatalog::default();
        let deals = InMemoryDealRepository::default();
        let svc = CartService::new(
            InMemoryCartRepository::default(),
            catalog.clone(),
            deals.clone(),
            clock(),
        );
        (svc, catalog, deals)
    }

    fn product(catalog: &InMemoryCatalog, price: &str, quantity: i32) -> Uuid {
        let id = Uuid::new_v4();
        catalog.insert(ProductView {
            id,
            name: "Widget".into(),
            price: BigDecimal::from_str(price).unwrap(),
            quantity,
        });
        id
    }

    #[test]
    fn adding_same_product_twice_merges_into_one_line() {
        let (svc, catalog, _) = service();
        let user = Uuid::new_v4();
        let p = product(&catalog, "10.00", 10);

        svc.add_item(user, p, 2).unwrap();
        let cart = svc.add_item(user, p, 3).unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.total_items, 1);
        assert_eq!(cart.total_price, BigDecimal::from_str("50.00").unwrap());
    }

    #[test]
    fn merged_quantity_is_checked_against_stock() {
        let (svc, catalog, _) = service();
        let user = Uuid::new_v4();
        let p = product(&catalog, "10.00", 5);

        svc.add_item(user, p, 3).unwrap();
        let err = svc.add_item(user, p, 3).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                requested: 6,
                available: 5,
                ..
            }
        ));
    }

    #[test]
    fn add_rejects_non_positive_quantity_and_unknown_product() {
        let (svc, catalog, _) = service();
        let user = Uuid::new_v4();
        let p = product(&catalog, "10.00", 5);

        assert!(matches!(
            svc.add_item(user, p, 0).unwrap_err(),
            DomainError::InvalidInput(_)
        ));
        assert!(matches!(
            svc.add_item(user, Uuid::new_v4(), 1).unwrap_err(),
            DomainError::NotFound { entity: "product", .. }
        ));
    }

    #[test]
    fn update_applies_signed_delta_with_stock_check() {
        let (svc, catalog, _) = service();
        let user = Uuid::new_v4();
        let p = product(&catalog, "10.00", 5);

        let cart = svc.add_item(user, p, 4).unwrap();
        let item_id = cart.items[0].id;

        let cart = svc.update_item(user, item_id, -2).unwrap();
        assert_eq!(cart.items[0].quantity, 2);

        let err = svc.update_item(user, item_id, 4).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
    }

    #[test]
    fn update_to_zero_removes_the_line() {
        let (svc, catalog, _) = service();
        let user = Uuid::new_v4();
        let p = product(&catalog, "10.00", 5);

        let cart = svc.add_item(user, p, 2).unwrap();
        let item_id = cart.items[0].id;

        let cart = svc.update_item(user, item_id, -2).unwrap();
        assert!(cart.items.is_empty());
    }

    #[test]
    fn merged_quantity_cannot_overflow() {
        let (svc, catalog, _) = service();
        let user = Uuid::new_v4();
        let p = product(&catalog, "10.00", 5);

        svc.add_item(user, p, 1).unwrap();
        let err = svc.add_item(user, p, i32::MAX).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        let cart = svc.get_cart(user).unwrap();
        assert_eq!(cart.items[0].quantity, 1);

        let item_id = cart.items[0].id;
        let err = svc.update_item(user, item_id, i32::MAX).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert_eq!(svc.get_cart(user).unwrap().items[0].quantity, 1);
    }

    #[test]
    fn user_locks_do_not_accumulate_idle_entries() {
        let (svc, catalog, _) = service();
        let p = product(&catalog, "10.00", 100);

        for _ in 0..8 {
            svc.add_item(Uuid::new_v4(), p, 1).unwrap();
        }

        let locks = svc.user_locks.lock().unwrap();
        assert!(locks.len() <= 1);
    }

    #[test]
    fn update_of_unknown_item_is_not_found() {
        let (svc, _, _) = service();
        let err = svc
            .update_item(Uuid::new_v4(), Uuid::new_v4(), 1)
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "cart item", .. }));
    }

    #[test]
    fn second_removal_of_same_item_fails() {
        let (svc, catalog, _) = service();
        let user = Uuid::new_v4();
        let p = product(&catalog, "10.00", 5);

        let cart = svc.add_item(user, p, 1).unwrap();
        let item_id = cart.items[0].id;

        svc.remove_item(user, item_id).unwrap();
        let err = svc.remove_item(user, item_id).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "cart item", .. }));
    }

    #[test]
    fn clear_is_a_no_op_on_an_empty_cart() {
        let (svc, catalog, _) = service();
        let user = Uuid::new_v4();
        svc.clear_cart(user).unwrap();

        let p = product(&catalog, "10.00", 5);
        svc.add_item(user, p, 2).unwrap();
        svc.clear_cart(user).unwrap();
        assert!(svc.get_cart(user).unwrap().items.is_empty());
    }

    #[test]
    fn get_cart_attaches_best_deal_per_line() {
        let (svc, catalog, deals) = service();
        let user = Uuid::new_v4();
        let p = product(&catalog, "100.00", 10);

        for (discount, active) in [("10", true), ("25", true), ("90", false)] {
            deals
                .insert(&Deal {
                    id: Uuid::new_v4(),
                    title: format!("{discount}% off"),
                    discount_percentage: BigDecimal::from_str(discount).unwrap(),
                    start_date: clock().now().date_naive(),
                    end_date: clock().now().date_naive(),
                    start_time: chrono::NaiveTime::from_str("00:00:00").unwrap(),
                    end_time: chrono::NaiveTime::from_str("23:59:00").unwrap(),
                    is_active: active,
                    product_ids: vec![p],
                })
                .unwrap();
        }

        let cart = svc.add_item(user, p, 1).unwrap();
        let deal = cart.items[0].best_deal.as_ref().unwrap();
        assert_eq!(deal.discount_percentage, BigDecimal::from(25));
        // Informational only: the total stays undiscounted.
        assert_eq!(cart.total_price, BigDecimal::from_str("100.00").unwrap());
    }

    #[test]
    fn deal_lookup_failure_degrades_to_undiscounted_line() {
        struct FailingDeals;
        impl DealRepository for FailingDeals {
            fn insert(&self, _: &Deal) -> Result<(), DomainError> {
                unreachable!()
            }
            fn update(&self, _: &Deal) -> Result<bool, DomainError> {
                unreachable!()
            }
            fn find_by_id(&self, _: Uuid) -> Result<Option<Deal>, DomainError> {
                unreachable!()
            }
            fn list(&self) -> Result<Vec<Deal>, DomainError> {
                unreachable!()
            }
            fn find_for_product(&self, _: Uuid) -> Result<Vec<Deal>, DomainError> {
                Err(DomainError::Unavailable("deal store down".into()))
            }
            fn list_flagged_active(&self) -> Result<Vec<Deal>, DomainError> {
                unreachable!()
            }
            fn set_active(&self, _: Uuid, _: bool) -> Result<(), DomainError> {
                unreachable!()
            }
            fn delete(&self, _: Uuid) -> Result<bool, DomainError> {
                unreachable!()
            }
        }

        let catalog = InMemoryCatalog::default();
        let svc = CartService::new(
            InMemoryCartRepository::default(),
            catalog.clone(),
            FailingDeals,
            clock(),
        );
        let user = Uuid::new_v4();
        let p = product(&catalog, "10.00", 5);

        let cart = svc.add_item(user, p, 2).unwrap();
        assert!(cart.items[0].best_deal.is_none());
        assert_eq!(cart.total_price, BigDecimal::from_str("20.00").unwrap());
    }
}
