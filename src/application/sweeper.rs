use std::time::Duration;

use actix_web::web;
use log::{info, warn};

use crate::domain::clock::Clock;
use crate::domain::errors::DomainError;
use crate::domain::ports::DealRepository;

/// Deactivate every flagged-active deal whose window has fully elapsed.
///
/// Deals that merely haven't started yet are left alone, and a deal is
/// never reactivated here. Returns the number of deals deactivated.
pub fn run_expiry_sweep<D, K>(deals: &D, clock: &K) -> Result<usize, DomainError>
where
    D: DealRepository,
    K: Clock,
{
    let now = clock.now();
    let (date, time) = (now.date_naive(), now.time());

    let mut swept = 0;
    for deal in deals.list_flagged_active()? {
        if !deal.is_expired(date, time) {
            continue;
        }
        match deals.set_active(deal.id, false) {
            Ok(()) => {
                info!("deactivated expired deal {} ({})", deal.id, deal.title);
                swept += 1;
            }
            // One bad deal must not stop the sweep.
            Err(e) => warn!("failed to deactivate deal {}: {}", deal.id, e),
        }
    }
    Ok(swept)
}

/// Run the expiry sweep forever on a fixed interval, on the actix runtime.
pub fn spawn<D, K>(deals: D, clock: K, every: Duration)
where
    D: DealRepository + Clone,
    K: Clock + Clone,
{
    actix_web::rt::spawn(async move {
        let mut ticker = actix_web::rt::time::interval(every);
        loop {
            ticker.tick().await;
            let deals = deals.clone();
            let clock = clock.clone();
            let outcome = web::block(move || run_expiry_sweep(&deals, &clock)).await;
            match outcome {
                Ok(Ok(0)) => {}
                Ok(Ok(n)) => info!("deal expiry sweep deactivated {n} deal(s)"),
                Ok(Err(e)) => warn!("deal expiry sweep failed: {e}"),
                Err(e) => warn!("deal expiry sweep did not run: {e}"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::domain::deal::Deal;
    use crate::infrastructure::memory::InMemoryDealRepository;
    use bigdecimal::BigDecimal;
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use std::str::FromStr;
    use uuid::Uuid;

    fn deal(start: &str, end: &str, end_time: &str, active: bool) -> Deal {
        Deal {
            id: Uuid::new_v4(),
            title: "Sweep me".into(),
            discount_percentage: BigDecimal::from(10),
            start_date: NaiveDate::from_str(start).unwrap(),
            end_date: NaiveDate::from_str(end).unwrap(),
            start_time: NaiveTime::from_str("00:00:00").unwrap(),
            end_time: NaiveTime::from_str(end_time).unwrap(),
            is_active: active,
            product_ids: vec![],
        }
    }

    fn clock() -> FixedClock {
        // 2025-04-12 12:00 UTC
        FixedClock(Utc.with_ymd_and_hms(2025, 4, 12, 12, 0, 0).unwrap())
    }

    #[test]
    fn deactivates_only_elapsed_deals() {
        let repo = InMemoryDealRepository::default();
        let expired = deal("2025-04-01", "2025-04-10", "23:59:00", true);
        let running = deal("2025-04-12", "2025-04-12", "23:59:00", true);
        let upcoming = deal("2025-05-01", "2025-05-02", "23:59:00", true);
        repo.insert(&expired).unwrap();
        repo.insert(&running).unwrap();
        repo.insert(&upcoming).unwrap();

        let swept = run_expiry_sweep(&repo, &clock()).unwrap();
        assert_eq!(swept, 1);
        assert!(!repo.find_by_id(expired.id).unwrap().unwrap().is_active);
        assert!(repo.find_by_id(running.id).unwrap().unwrap().is_active);
        assert!(repo.find_by_id(upcoming.id).unwrap().unwrap().is_active);
    }

    #[test]
    fn same_day_deal_expires_after_end_time() {
        let repo = InMemoryDealRepository::default();
        let over = deal("2025-04-12", "2025-04-12", "11:00:00", true);
        repo.insert(&over).unwrap();

        assert_eq!(run_expiry_sweep(&repo, &clock()).unwrap(), 1);
        assert!(!repo.find_by_id(over.id).unwrap().unwrap().is_active);
    }

    #[test]
    fn sweep_is_idempotent_and_never_reactivates() {
        let repo = InMemoryDealRepository::default();
        let expired = deal("2025-04-01", "2025-04-10", "23:59:00", true);
        repo.insert(&expired).unwrap();

        assert_eq!(run_expiry_sweep(&repo, &clock()).unwrap(), 1);
        assert_eq!(run_expiry_sweep(&repo, &clock()).unwrap(), 0);
        assert!(!repo.find_by_id(expired.id).unwrap().unwrap().is_active);

        // Manually deactivated deals stay deactivated too.
        let dormant = deal("2025-04-01", "2025-04-10", "23:59:00", false);
        repo.insert(&dormant).unwrap();
        assert_eq!(run_expiry_sweep(&repo, &clock()).unwrap(), 0);
        assert!(!repo.find_by_id(dormant.id).unwrap().unwrap().is_active);
    }
}
