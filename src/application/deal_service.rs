use uuid::Uuid;

use crate::domain::clock::Clock;
use crate::domain::deal::{rank_active, Deal, DealDraft};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CatalogStore, DealRepository};

/// Deal administration plus the resolver that decides which discounts
/// apply to a product right now.
pub struct DealService<D, C, K> {
    deals: D,
    catalog: C,
    clock: K,
}

impl<D, C, K> DealService<D, C, K>
where
    D: DealRepository,
    C: CatalogStore,
    K: Clock,
{
    pub fn new(deals: D, catalog: C, clock: K) -> Self {
        DealService {
            deals,
            catalog,
            clock,
        }
    }

    pub fn list_deals(&self) -> Result<Vec<Deal>, DomainError> {
        self.deals.list()
    }

    /// Deals effectively active at this instant, across all products.
    pub fn list_active_deals(&self) -> Result<Vec<Deal>, DomainError> {
        let now = self.clock.now();
        Ok(rank_active(
            self.deals.list_flagged_active()?,
            now.date_naive(),
            now.time(),
        ))
    }

    pub fn get_deal(&self, id: Uuid) -> Result<Deal, DomainError> {
        self.deals
            .find_by_id(id)?
            .ok_or_else(|| DomainError::not_found("deal", id))
    }

    /// All deals effectively active for the product right now, best
    /// discount first (ties broken by deal id). Discounts are not merged
    /// or stacked; picking one is the caller's decision.
    pub fn active_deals_for_product(&self, product_id: Uuid) -> Result<Vec<Deal>, DomainError> {
        let now = self.clock.now();
        Ok(rank_active(
            self.deals.find_for_product(product_id)?,
            now.date_naive(),
            now.time(),
        ))
    }

    pub fn best_deal_for_product(&self, product_id: Uuid) -> Result<Option<Deal>, DomainError> {
        Ok(self
            .active_deals_for_product(product_id)?
            .into_iter()
            .next())
    }

    pub fn create_deal(&self, draft: DealDraft) -> Result<Deal, DomainError> {
        draft.validate()?;
        self.check_products(&draft.product_ids)?;
        let deal = draft.into_deal(Uuid::new_v4());
        self.deals.insert(&deal)?;
        Ok(deal)
    }

    pub fn update_deal(&self, id: Uuid, draft: DealDraft) -> Result<Deal, DomainError> {
        draft.validate()?;
        self.check_products(&draft.product_ids)?;
        let deal = draft.into_deal(id);
        if !self.deals.update(&deal)? {
            return Err(DomainError::not_found("deal", id));
        }
        Ok(deal)
    }

    pub fn delete_deal(&self, id: Uuid) -> Result<(), DomainError> {
        if !self.deals.delete(id)? {
            return Err(DomainError::not_found("deal", id));
        }
        Ok(())
    }

    fn check_products(&self, product_ids: &[Uuid]) -> Result<(), DomainError> {
        for id in product_ids {
            if self.catalog.find_product(*id)?.is_none() {
                return Err(DomainError::InvalidInput(format!(
                    "Invalid product id: {id}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::domain::ports::ProductView;
    use crate::infrastructure::memory::{InMemoryCatalog, InMemoryDealRepository};
    use bigdecimal::BigDecimal;
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use std::str::FromStr;

    fn service() -> (
        DealService<InMemoryDealRepository, InMemoryCatalog, FixedClock>,
        InMemoryDealRepository,
        InMemoryCatalog,
    ) {
        let deals = InMemoryDealRepository::default();
        let catalog = InMemoryCatalog::default();
        let svc = DealService::new(
            deals.clone(),
            catalog.clone(),
            FixedClock(Utc.with_ymd_and_hms(2025, 4, 12, 12, 0, 0).unwrap()),
        );
        (svc, deals, catalog)
    }

    fn draft(discount: u32, product_ids: Vec<Uuid>) -> DealDraft {
        DealDraft {
            title: "April deal".into(),
            discount_percentage: BigDecimal::from(discount),
            start_date: NaiveDate::from_str("2025-04-12").unwrap(),
            end_date: NaiveDate::from_str("2025-04-12").unwrap(),
            start_time: NaiveTime::from_str("00:00:00").unwrap(),
            end_time: NaiveTime::from_str("23:59:00").unwrap(),
            is_active: true,
            product_ids,
        }
    }

    fn seed_product(catalog: &InMemoryCatalog) -> Uuid {
        let id = Uuid::new_v4();
        catalog.insert(ProductView {
            id,
            name: "Widget".into(),
            price: BigDecimal::from(10),
            quantity: 5,
        });
        id
    }

    #[test]
    fn create_then_resolve_best_deal() {
        let (svc, _, catalog) = service();
        let p = seed_product(&catalog);

        svc.create_deal(draft(10, vec![p])).unwrap();
        svc.create_deal(draft(30, vec![p])).unwrap();

        let ranked = svc.active_deals_for_product(p).unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].discount_percentage, BigDecimal::from(30));

        let best = svc.best_deal_for_product(p).unwrap().unwrap();
        assert_eq!(best.discount_percentage, BigDecimal::from(30));
    }

    #[test]
    fn product_without_deals_resolves_to_none() {
        let (svc, _, catalog) = service();
        let p = seed_product(&catalog);
        assert!(svc.active_deals_for_product(p).unwrap().is_empty());
        assert!(svc.best_deal_for_product(p).unwrap().is_none());
    }

    #[test]
    fn create_rejects_unknown_product_ids() {
        let (svc, _, _) = service();
        let err = svc.create_deal(draft(10, vec![Uuid::new_v4()])).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn create_rejects_invalid_window() {
        let (svc, _, _) = service();
        let mut d = draft(10, vec![]);
        d.end_time = d.start_time;
        assert!(svc.create_deal(d).is_err());
    }

    #[test]
    fn update_missing_deal_is_not_found() {
        let (svc, _, _) = service();
        let err = svc.update_deal(Uuid::new_v4(), draft(10, vec![])).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "deal", .. }));
    }

    #[test]
    fn update_replaces_fields() {
        let (svc, _, catalog) = service();
        let p = seed_product(&catalog);
        let deal = svc.create_deal(draft(10, vec![p])).unwrap();

        let mut changed = draft(55, vec![p]);
        changed.title = "Bigger deal".into();
        let updated = svc.update_deal(deal.id, changed).unwrap();
        assert_eq!(updated.discount_percentage, BigDecimal::from(55));

        let fetched = svc.get_deal(deal.id).unwrap();
        assert_eq!(fetched.title, "Bigger deal");
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let (svc, _, _) = service();
        let deal = svc.create_deal(draft(10, vec![])).unwrap();
        svc.delete_deal(deal.id).unwrap();
        assert!(matches!(
            svc.get_deal(deal.id).unwrap_err(),
            DomainError::NotFound { .. }
        ));
        assert!(matches!(
            svc.delete_deal(deal.id).unwrap_err(),
            DomainError::NotFound { .. }
        ));
    }

    #[test]
    fn list_active_excludes_out_of_window_deals() {
        let (svc, _, catalog) = service();
        let p = seed_product(&catalog);
        svc.create_deal(draft(10, vec![p])).unwrap();

        let mut past = draft(50, vec![p]);
        past.start_date = NaiveDate::from_str("2025-03-01").unwrap();
        past.end_date = NaiveDate::from_str("2025-03-02").unwrap();
        svc.create_deal(past).unwrap();

        let active = svc.list_active_deals().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].discount_percentage, BigDecimal::from(10));
    }
}
