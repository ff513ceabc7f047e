//! # Sale Planning
//!
//! Pure decisions behind a sale: what each line draws from stock, what it
//! costs, what the sale totals to, and how credit is settled.
//!
//! ## Sale Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NewSale                                                                │
//! │    │                                                                    │
//! │    ▼  for each item (under the product's row lock, in coldroom-db)      │
//! │  plan_sale_item ──► PlannedLine { unit price, line total, StockDraw }   │
//! │    │                    │                                               │
//! │    │                    ├── Units(n)      → unit quantity decrement     │
//! │    │                    └── Weight(kg)    → depletion engine            │
//! │    ▼                                                                    │
//! │  compute_totals(lines, discount, vat)                                   │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  opening_settlement(method, deposit, total)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, StockError, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, Product, ProductWeightPrice, Sale, SaleType, TaxRate};
use crate::validation::validate_quantity;
use crate::MAX_SALE_ITEMS;
use crate::weight::Weight;

// =============================================================================
// Line Planning
// =============================================================================

/// What a sale line takes out of stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum StockDraw {
    Units(i64),
    Weight(Weight),
}

/// A sale line with its price frozen and its stock draw decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: String,
    pub weight_price_id: Option<String>,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    pub draw: StockDraw,
}

/// Plans one sale line.
///
/// Boxed-weight products need a pack size that belongs to them and is
/// active; the line draws `quantity × pack weight`. Unit products draw
/// `quantity` units and take no pack size.
pub fn plan_sale_item(
    product: &Product,
    size: Option<&ProductWeightPrice>,
    quantity: i64,
    sale_type: SaleType,
) -> CoreResult<PlannedLine> {
    validate_quantity(quantity)?;

    if !product.is_active {
        return Err(CoreError::ProductNotFound(product.id.clone()));
    }

    if product.is_weight_tracked() {
        let size = size.ok_or_else(|| StockError::MissingWeightSelection {
            product: product.name.clone(),
        })?;
        if size.product_id != product.id {
            return Err(StockError::SizeProductMismatch {
                product: product.name.clone(),
                weight_price_id: size.id.clone(),
            }
            .into());
        }
        if !size.is_active {
            return Err(StockError::InactiveWeightSize {
                product: product.name.clone(),
                weight: size.weight,
            }
            .into());
        }

        let kg_to_sell = size
            .weight
            .times(quantity)
            .ok_or_else(|| StockError::invalid_quantity("weight overflow"))?;
        let unit_price = size.price_for(sale_type);

        return Ok(PlannedLine {
            product_id: product.id.clone(),
            weight_price_id: Some(size.id.clone()),
            name_snapshot: format!("{} {}", product.name, size.weight),
            quantity,
            unit_price,
            line_total: line_total(unit_price, quantity)?,
            draw: StockDraw::Weight(kg_to_sell),
        });
    }

    if let Some(size) = size {
        return Err(StockError::SizeProductMismatch {
            product: product.name.clone(),
            weight_price_id: size.id.clone(),
        }
        .into());
    }

    let unit_price = product.price_for(sale_type);
    Ok(PlannedLine {
        product_id: product.id.clone(),
        weight_price_id: None,
        name_snapshot: product.name.clone(),
        quantity,
        unit_price,
        line_total: line_total(unit_price, quantity)?,
        draw: StockDraw::Units(quantity),
    })
}

fn line_total(unit_price: Money, quantity: i64) -> CoreResult<Money> {
    unit_price
        .checked_mul_quantity(quantity)
        .ok_or_else(|| too_large("line_total"))
}

fn too_large(field: &str) -> CoreError {
    ValidationError::TooLarge {
        field: field.to_string(),
    }
    .into()
}

// =============================================================================
// Totals
// =============================================================================

/// A sale has between one and `MAX_SALE_ITEMS` lines.
pub fn check_sale_size(lines: usize) -> CoreResult<()> {
    if lines == 0 {
        return Err(CoreError::EmptySale);
    }
    if lines > MAX_SALE_ITEMS {
        return Err(CoreError::SaleTooLarge { max: MAX_SALE_ITEMS });
    }
    Ok(())
}

/// Money columns of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub vat: Money,
    pub total: Money,
}

/// Sums the lines, takes off the discount, adds VAT.
///
/// ```text
/// subtotal   = Σ line totals
/// discounted = max(subtotal - discount, 0)
/// vat        = discounted × rate   (half-up, only when apply_vat)
/// total      = discounted + vat
/// ```
pub fn compute_totals(
    lines: &[PlannedLine],
    discount: Money,
    apply_vat: bool,
    vat_rate: TaxRate,
) -> CoreResult<SaleTotals> {
    check_sale_size(lines.len())?;
    if discount.is_negative() {
        return Err(ValidationError::Negative {
            field: "discount".to_string(),
        }
        .into());
    }

    let subtotal = lines
        .iter()
        .try_fold(Money::zero(), |acc, line| acc.checked_add(line.line_total))
        .ok_or_else(|| too_large("subtotal"))?;
    let discounted = (subtotal - discount).clamp_non_negative();
    let vat = if apply_vat {
        discounted.calculate_tax(vat_rate)
    } else {
        Money::zero()
    };
    let total = discounted.checked_add(vat).ok_or_else(|| too_large("total"))?;

    Ok(SaleTotals {
        subtotal,
        discount,
        vat,
        total,
    })
}

// =============================================================================
// Settlement
// =============================================================================

/// Payment state of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub amount_paid: Money,
    pub is_credit: bool,
}

impl Settlement {
    /// Settlement after `total_paid` has been collected towards `total`.
    pub fn from_payments(total: Money, total_paid: Money) -> Self {
        Settlement {
            amount_paid: total_paid,
            is_credit: total_paid < total,
        }
    }
}

/// Payment state at the counter.
///
/// Cash, MoMo and card sales are paid in full. A credit sale may take a
/// deposit between zero and the total.
pub fn opening_settlement(
    method: PaymentMethod,
    deposit: Option<Money>,
    total: Money,
) -> CoreResult<Settlement> {
    if method.is_tender() {
        if deposit.is_some() {
            return Err(CoreError::InvalidPaymentAmount {
                reason: "only credit sales take a deposit".to_string(),
            });
        }
        return Ok(Settlement {
            amount_paid: total,
            is_credit: false,
        });
    }

    let deposit = deposit.unwrap_or_default();
    if deposit.is_negative() {
        return Err(CoreError::InvalidPaymentAmount {
            reason: "deposit cannot be negative".to_string(),
        });
    }
    if deposit > total {
        return Err(CoreError::InvalidPaymentAmount {
            reason: format!("deposit {deposit} exceeds total {total}"),
        });
    }
    Ok(Settlement::from_payments(total, deposit))
}

/// Checks an instalment against a credit sale before it is recorded.
pub fn validate_credit_payment(sale: &Sale, amount: Money, method: PaymentMethod) -> CoreResult<()> {
    if !method.is_tender() {
        return Err(ValidationError::NotAllowed {
            field: "payment_method".to_string(),
            allowed: vec!["cash".into(), "momo".into(), "card".into()],
        }
        .into());
    }
    if !amount.is_positive() {
        return Err(CoreError::InvalidPaymentAmount {
            reason: "amount must be positive".to_string(),
        });
    }
    if !sale.is_credit || sale.is_paid() {
        return Err(CoreError::SaleAlreadySettled {
            sale_id: sale.id.clone(),
        });
    }
    let balance = sale.balance_due();
    if amount > balance {
        return Err(CoreError::InvalidPaymentAmount {
            reason: format!("{amount} exceeds balance due {balance}"),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{boxed_product, unit_product, weight_price};
    use crate::DEFAULT_VAT_RATE;
    use chrono::Utc;

    fn kg(n: i64) -> Weight {
        Weight::from_kg(n)
    }

    #[test]
    fn test_weighted_line_draws_packs() {
        let product = boxed_product(kg(30), 2, kg(30));
        let size = weight_price(&product.id, kg(5), 25_000, 22_000);

        let line = plan_sale_item(&product, Some(&size), 3, SaleType::Wholesale).unwrap();
        assert_eq!(line.draw, StockDraw::Weight(kg(15)));
        assert_eq!(line.unit_price.cents(), 22_000);
        assert_eq!(line.line_total.cents(), 66_000);
        assert_eq!(line.name_snapshot, "Salmon 5.00kg");
        assert_eq!(line.weight_price_id, Some(size.id.clone()));
    }

    #[test]
    fn test_weighted_line_needs_its_own_active_size() {
        let product = boxed_product(kg(30), 2, kg(30));

        assert!(matches!(
            plan_sale_item(&product, None, 1, SaleType::Retail),
            Err(CoreError::Stock(StockError::MissingWeightSelection { .. }))
        ));

        let foreign = weight_price("other-product", kg(5), 100, 100);
        assert!(matches!(
            plan_sale_item(&product, Some(&foreign), 1, SaleType::Retail),
            Err(CoreError::Stock(StockError::SizeProductMismatch { .. }))
        ));

        let mut retired = weight_price(&product.id, kg(5), 100, 100);
        retired.is_active = false;
        assert!(matches!(
            plan_sale_item(&product, Some(&retired), 1, SaleType::Retail),
            Err(CoreError::Stock(StockError::InactiveWeightSize { .. }))
        ));
    }

    #[test]
    fn test_unit_line() {
        let product = unit_product(10);
        let line = plan_sale_item(&product, None, 4, SaleType::Retail).unwrap();
        assert_eq!(line.draw, StockDraw::Units(4));
        assert_eq!(line.line_total.cents(), 4 * product.unit_price_cents);

        assert!(matches!(
            plan_sale_item(&product, None, 0, SaleType::Retail),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_oversized_amounts_are_rejected_not_wrapped() {
        let mut product = unit_product(10);
        product.unit_price_cents = "50000000000000000.00".parse::<Money>().unwrap().cents();
        assert_eq!(
            plan_sale_item(&product, None, 2, SaleType::Retail),
            Err(CoreError::Validation(ValidationError::TooLarge {
                field: "line_total".to_string()
            }))
        );

        let mut big = plan_sale_item(&unit_product(10), None, 1, SaleType::Retail).unwrap();
        big.line_total = Money::from_cents(i64::MAX - 10);
        let lines = vec![big.clone(), big];
        assert!(matches!(
            compute_totals(&lines, Money::zero(), false, DEFAULT_VAT_RATE),
            Err(CoreError::Validation(ValidationError::TooLarge { .. }))
        ));
    }

    #[test]
    fn test_totals_with_discount_and_vat() {
        let product = unit_product(10);
        let line = plan_sale_item(&product, None, 2, SaleType::Retail).unwrap();
        // 2 × 50.00 = 100.00, minus 10.00, plus 15% = 103.50
        let totals =
            compute_totals(&[line], Money::from_cents(1_000), true, DEFAULT_VAT_RATE).unwrap();

        assert_eq!(totals.subtotal.cents(), 10_000);
        assert_eq!(totals.vat.cents(), 1_350);
        assert_eq!(totals.total.cents(), 10_350);
    }

    #[test]
    fn test_discount_larger_than_subtotal() {
        let product = unit_product(10);
        let line = plan_sale_item(&product, None, 1, SaleType::Retail).unwrap();
        let totals =
            compute_totals(&[line], Money::from_cents(99_999), true, DEFAULT_VAT_RATE).unwrap();

        assert_eq!(totals.vat, Money::zero());
        assert_eq!(totals.total, Money::zero());
    }

    #[test]
    fn test_totals_reject_empty_and_negative_discount() {
        assert_eq!(
            compute_totals(&[], Money::zero(), false, DEFAULT_VAT_RATE),
            Err(CoreError::EmptySale)
        );

        let product = unit_product(10);
        let line = plan_sale_item(&product, None, 1, SaleType::Retail).unwrap();
        assert!(compute_totals(&[line], Money::from_cents(-1), false, DEFAULT_VAT_RATE).is_err());
    }

    #[test]
    fn test_opening_settlement() {
        let total = Money::from_cents(10_000);

        let cash = opening_settlement(PaymentMethod::Cash, None, total).unwrap();
        assert_eq!(cash, Settlement { amount_paid: total, is_credit: false });

        let credit =
            opening_settlement(PaymentMethod::Credit, Some(Money::from_cents(2_500)), total)
                .unwrap();
        assert_eq!(credit.amount_paid.cents(), 2_500);
        assert!(credit.is_credit);

        assert!(opening_settlement(PaymentMethod::Credit, Some(Money::from_cents(10_001)), total)
            .is_err());
        assert!(opening_settlement(PaymentMethod::Cash, Some(Money::zero()), total).is_err());
    }

    #[test]
    fn test_credit_payment_rules() {
        let mut sale = Sale {
            id: "sale-1".into(),
            receipt_number: "CR-20260101-0001".into(),
            sale_type: SaleType::Retail,
            customer_name: Some("Ama".into()),
            customer_phone: None,
            payment_method: PaymentMethod::Credit,
            subtotal_cents: 10_000,
            discount_cents: 0,
            apply_vat: false,
            vat_cents: 0,
            total_cents: 10_000,
            is_credit: true,
            amount_paid_cents: 4_000,
            due_date: None,
            created_by: None,
            created_at: Utc::now(),
        };

        assert!(validate_credit_payment(&sale, Money::from_cents(6_000), PaymentMethod::Cash).is_ok());
        assert!(matches!(
            validate_credit_payment(&sale, Money::from_cents(6_001), PaymentMethod::Cash),
            Err(CoreError::InvalidPaymentAmount { .. })
        ));
        assert!(validate_credit_payment(&sale, Money::zero(), PaymentMethod::Cash).is_err());
        assert!(validate_credit_payment(&sale, Money::from_cents(1), PaymentMethod::Credit).is_err());

        sale.is_credit = false;
        assert!(matches!(
            validate_credit_payment(&sale, Money::from_cents(1), PaymentMethod::Card),
            Err(CoreError::SaleAlreadySettled { .. })
        ));
    }
}
