use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use super::errors::DomainError;

/// A promotional deal: a percentage discount over a set of products,
/// bounded by a date + time-of-day activity window.
#[derive(Debug, Clone)]
pub struct Deal {
    pub id: Uuid,
    pub title: String,
    pub discount_percentage: BigDecimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
    pub product_ids: Vec<Uuid>,
}

impl Deal {
    /// Whether the instant (date, time) falls inside the activity window:
    /// strictly between the dates, or on the start date at/after the start
    /// time, or on the end date at/before the end time.
    pub fn in_window(&self, date: NaiveDate, time: NaiveTime) -> bool {
        (self.start_date < date && self.end_date > date)
            || (self.start_date == date && self.start_time <= time)
            || (self.end_date == date && self.end_time >= time)
    }

    /// Flagged active AND currently inside the window.
    pub fn is_effectively_active(&self, date: NaiveDate, time: NaiveTime) -> bool {
        self.is_active && self.in_window(date, time)
    }

    /// Whether the window has fully elapsed as of (date, time).
    pub fn is_expired(&self, date: NaiveDate, time: NaiveTime) -> bool {
        self.end_date < date || (self.end_date == date && self.end_time < time)
    }

    pub fn references_product(&self, product_id: Uuid) -> bool {
        self.product_ids.contains(&product_id)
    }
}

/// Keep only deals effectively active at the given instant and order them
/// best-first: highest discount, deal id as the tie-break.
pub fn rank_active(mut deals: Vec<Deal>, date: NaiveDate, time: NaiveTime) -> Vec<Deal> {
    deals.retain(|d| d.is_effectively_active(date, time));
    deals.sort_by(|a, b| {
        b.discount_percentage
            .cmp(&a.discount_percentage)
            .then_with(|| a.id.cmp(&b.id))
    });
    deals
}

/// Fields accepted when creating or replacing a deal.
#[derive(Debug, Clone)]
pub struct DealDraft {
    pub title: String,
    pub discount_percentage: BigDecimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
    pub product_ids: Vec<Uuid>,
}

impl DealDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::InvalidInput("Title cannot be empty".into()));
        }
        if self.discount_percentage < BigDecimal::from(0)
            || self.discount_percentage > BigDecimal::from(100)
        {
            return Err(DomainError::InvalidInput(
                "Discount percentage must be between 0 and 100".into(),
            ));
        }
        if self.start_date > self.end_date {
            return Err(DomainError::InvalidInput(
                "Start date must be before or equal to end date".into(),
            ));
        }
        if self.start_date == self.end_date && self.start_time >= self.end_time {
            return Err(DomainError::InvalidInput(
                "Start time must be before end time on the same day".into(),
            ));
        }
        Ok(())
    }

    pub fn into_deal(self, id: Uuid) -> Deal {
        Deal {
            id,
            title: self.title,
            discount_percentage: self.discount_percentage,
            start_date: self.start_date,
            end_date: self.end_date,
            start_time: self.start_time,
            end_time: self.end_time,
            is_active: self.is_active,
            product_ids: self.product_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        NaiveTime::from_str(s).unwrap()
    }

    fn deal(start: (&str, &str), end: (&str, &str)) -> Deal {
        Deal {
            id: Uuid::new_v4(),
            title: "Summer sale".into(),
            discount_percentage: BigDecimal::from(10),
            start_date: date(start.0),
            end_date: date(end.0),
            start_time: time(start.1),
            end_time: time(end.1),
            is_active: true,
            product_ids: vec![],
        }
    }

    #[test]
    fn single_day_deal_active_at_noon() {
        let d = deal(("2025-04-12", "00:00:00"), ("2025-04-12", "23:59:00"));
        assert!(d.is_effectively_active(date("2025-04-12"), time("12:00:00")));
    }

    #[test]
    fn single_day_deal_inactive_next_midnight() {
        let d = deal(("2025-04-12", "00:00:00"), ("2025-04-12", "23:59:00"));
        assert!(!d.is_effectively_active(date("2025-04-13"), time("00:00:00")));
    }

    #[test]
    fn active_flag_overrides_window() {
        let mut d = deal(("2025-04-12", "00:00:00"), ("2025-04-12", "23:59:00"));
        d.is_active = false;
        assert!(!d.is_effectively_active(date("2025-04-12"), time("12:00:00")));
    }

    #[test]
    fn multi_day_deal_active_between_dates() {
        let d = deal(("2025-04-10", "09:00:00"), ("2025-04-20", "18:00:00"));
        assert!(d.in_window(date("2025-04-15"), time("03:00:00")));
    }

    #[test]
    fn start_day_respects_start_time() {
        let d = deal(("2025-04-10", "09:00:00"), ("2025-04-20", "18:00:00"));
        assert!(!d.in_window(date("2025-04-10"), time("08:59:59")));
        assert!(d.in_window(date("2025-04-10"), time("09:00:00")));
    }

    #[test]
    fn end_day_respects_end_time() {
        let d = deal(("2025-04-10", "09:00:00"), ("2025-04-20", "18:00:00"));
        assert!(d.in_window(date("2025-04-20"), time("18:00:00")));
        assert!(!d.in_window(date("2025-04-20"), time("18:00:01")));
    }

    #[test]
    fn expiry_boundary() {
        let d = deal(("2025-04-10", "09:00:00"), ("2025-04-20", "18:00:00"));
        assert!(!d.is_expired(date("2025-04-20"), time("18:00:00")));
        assert!(d.is_expired(date("2025-04-20"), time("18:00:01")));
        assert!(d.is_expired(date("2025-04-21"), time("00:00:00")));
    }

    #[test]
    fn rank_active_orders_by_discount_then_id() {
        let mut low = deal(("2025-04-10", "00:00:00"), ("2025-04-20", "23:59:00"));
        low.discount_percentage = BigDecimal::from(5);
        let mut high = deal(("2025-04-10", "00:00:00"), ("2025-04-20", "23:59:00"));
        high.discount_percentage = BigDecimal::from(30);
        let mut tied_a = deal(("2025-04-10", "00:00:00"), ("2025-04-20", "23:59:00"));
        tied_a.discount_percentage = BigDecimal::from(30);
        let mut inactive = deal(("2025-04-10", "00:00:00"), ("2025-04-20", "23:59:00"));
        inactive.is_active = false;

        let ranked = rank_active(
            vec![low.clone(), high.clone(), tied_a.clone(), inactive],
            date("2025-04-15"),
            time("12:00:00"),
        );
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].discount_percentage, BigDecimal::from(30));
        assert_eq!(ranked[1].discount_percentage, BigDecimal::from(30));
        assert!(ranked[0].id <= ranked[1].id);
        assert_eq!(ranked[2].id, low.id);
    }

    #[test]
    fn zero_discount_deals_are_valid_and_ranked() {
        let mut zero = deal(("2025-04-10", "00:00:00"), ("2025-04-20", "23:59:00"));
        zero.discount_percentage = BigDecimal::from(0);
        let ranked = rank_active(vec![zero], date("2025-04-15"), time("12:00:00"));
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn draft_rejects_inverted_dates() {
        let mut draft = draft_for(("2025-04-12", "10:00:00"), ("2025-04-11", "12:00:00"));
        assert!(draft.validate().is_err());
        draft.end_date = date("2025-04-12");
        draft.end_time = time("10:00:00");
        // Equal dates require start time strictly before end time.
        assert!(draft.validate().is_err());
        draft.end_time = time("10:00:01");
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn draft_rejects_out_of_range_discount() {
        let mut draft = draft_for(("2025-04-10", "00:00:00"), ("2025-04-20", "23:59:00"));
        draft.discount_percentage = BigDecimal::from(101);
        assert!(draft.validate().is_err());
        draft.discount_percentage = BigDecimal::from(-1);
        assert!(draft.validate().is_err());
        draft.discount_percentage = BigDecimal::from(100);
        assert!(draft.validate().is_ok());
    }

    fn draft_for(start: (&str, &str), end: (&str, &str)) -> DealDraft {
        DealDraft {
            title: "Flash sale".into(),
            discount_percentage: BigDecimal::from(20),
            start_date: date(start.0),
            end_date: date(end.0),
            start_time: time(start.1),
            end_time: time(end.1),
            is_active: true,
            product_ids: vec![],
        }
    }
}
