use bigdecimal::{BigDecimal, Zero};
use uuid::Uuid;

use super::deal::Deal;
use super::errors::DomainError;
use super::ports::ProductView;

/// One cart line joined with live catalog data and the best currently
/// active deal for its product. The deal is informational only; the cart
/// total is never discounted.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: BigDecimal,
    pub available_quantity: i32,
    pub quantity: i32,
    pub best_deal: Option<Deal>,
}

impl CartLineView {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct CartView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartLineView>,
    pub total_items: usize,
    pub total_price: BigDecimal,
}

impl CartView {
    pub fn assemble(id: Uuid, user_id: Uuid, items: Vec<CartLineView>) -> Self {
        let total_price = items
            .iter()
            .map(CartLineView::line_total)
            .fold(BigDecimal::zero(), |acc, t| acc + t);
        CartView {
            id,
            user_id,
            total_items: items.len(),
            total_price,
            items,
        }
    }
}

/// Validate a requested line quantity against what the catalog reports
/// right now. Callers pass the full post-merge quantity, never the delta.
pub fn check_stock(product: &ProductView, requested: i32) -> Result<(), DomainError> {
    if requested > product.quantity {
        return Err(DomainError::InsufficientStock {
            product_id: product.id,
            requested,
            available: product.quantity,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn line(price: &str, quantity: i32) -> CartLineView {
        CartLineView {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            product_name: "Widget".into(),
            unit_price: BigDecimal::from_str(price).unwrap(),
            available_quantity: 50,
            quantity,
            best_deal: None,
        }
    }

    #[test]
    fn assemble_counts_lines_and_sums_undiscounted_totals() {
        let view = CartView::assemble(
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![line("500.00", 2), line("9.99", 1)],
        );
        assert_eq!(view.total_items, 2);
        assert_eq!(view.total_price, BigDecimal::from_str("1009.99").unwrap());
    }

    #[test]
    fn assemble_of_empty_cart_is_zero() {
        let view = CartView::assemble(Uuid::new_v4(), Uuid::new_v4(), vec![]);
        assert_eq!(view.total_items, 0);
        assert_eq!(view.total_price, BigDecimal::zero());
    }

    #[test]
    fn check_stock_rejects_over_requests() {
        let product = ProductView {
            id: Uuid::new_v4(),
            name: "Widget".into(),
            price: BigDecimal::from(10),
            quantity: 3,
        };
        assert!(check_stock(&product, 3).is_ok());
        let err = check_stock(&product, 4).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                requested: 4,
                available: 3,
                ..
            }
        ));
    }
}
