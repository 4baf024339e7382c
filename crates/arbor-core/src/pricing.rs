//! # Pricing & Discount Pipeline
//!
//! Pure computation from (line items, coupon, delivery charge, active tax
//! set) to a price breakdown. Deterministic given its inputs; the clock is
//! an explicit argument.
//!
//! ## Pipeline Order (normative)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Price Breakdown Stages                              │
//! │                                                                         │
//! │  1. subtotal           = Σ(unit_price × qty) + Σ(addon_price × qty)    │
//! │  2. category_tax_total = Σ per line of matching category taxes         │
//! │  3. discount           = validated coupon amount (else 0)              │
//! │  4. delivery_charge    = zone table lookup (supplied by caller)        │
//! │  5. taxable_amount     = subtotal + category_tax - discount + delivery │
//! │  6. full_bill_tax      = Σ active full-bill taxes of taxable_amount    │
//! │  7. total              = subtotal + category_tax + full_bill_tax       │
//! │                          - discount + delivery_charge                  │
//! │                                                                         │
//! │  Changing this order changes the result. Full-bill taxes deliberately  │
//! │  see the discount and the delivery charge; category taxes do not.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All intermediate values are integer cents (i128 where products occur), so
//! the persisted breakdown reconstructs the total exactly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CouponRejection;
use crate::money::Money;
use crate::types::{Coupon, DiscountType, Tax, TaxType};

// =============================================================================
// Inputs
// =============================================================================

/// One validated line as the pipeline sees it: prices captured at
/// validation time, never re-read.
#[derive(Debug, Clone)]
pub struct PricingLine {
    /// Display label for diagnostics ("SOFA-3S / Walnut / 3-Seater").
    pub label: String,

    /// Category of the underlying catalog item.
    pub category: String,

    /// Captured unit price.
    pub unit_price: Money,

    /// Quantity ordered.
    pub quantity: i64,

    /// Sum of addon sale prices per unit of this line (zero when none).
    pub addon_unit_price: Money,
}

impl PricingLine {
    /// Line total before tax: unit_price × quantity. Addons excluded;
    /// category taxes are computed against this value.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// Total addon charge for this line: addon_unit_price × quantity.
    pub fn addon_total(&self) -> Money {
        self.addon_unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Breakdown
// =============================================================================

/// The persisted price breakdown of an order.
///
/// ## Round-Trip Property
/// `total == subtotal + category_tax_total + full_bill_tax_total - discount
/// + delivery_charge` holds exactly in cents. `assert_reconstructs` checks
/// it and is exercised by the engine before persisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Money,
    pub category_tax_total: Money,
    pub full_bill_tax_total: Money,
    pub discount: Money,
    pub delivery_charge: Money,
    pub total: Money,
}

impl PriceBreakdown {
    /// Whether the persisted fields reconstruct the total to the cent.
    pub fn reconstructs(&self) -> bool {
        self.subtotal + self.category_tax_total + self.full_bill_tax_total - self.discount
            + self.delivery_charge
            == self.total
    }
}

// =============================================================================
// Coupon Gates
// =============================================================================

/// Checks every validity gate of a coupon against a subtotal and a clock.
///
/// ## Gates (in order)
/// 1. `is_active`
/// 2. validity window contains `now`
/// 3. `used_count < usage_limit` when a limit is set
/// 4. `subtotal >= minimum_amount`
///
/// The order matters only for which rejection is reported first; all gates
/// must pass for the coupon to apply.
pub fn validate_coupon(
    coupon: &Coupon,
    subtotal: Money,
    now: DateTime<Utc>,
) -> Result<(), CouponRejection> {
    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }

    if now < coupon.valid_from {
        return Err(CouponRejection::NotStarted);
    }

    if now > coupon.valid_to {
        return Err(CouponRejection::Expired);
    }

    if let Some(limit) = coupon.usage_limit {
        if coupon.used_count >= limit {
            return Err(CouponRejection::UsageExhausted);
        }
    }

    if subtotal.cents() < coupon.minimum_amount_cents {
        return Err(CouponRejection::BelowMinimum {
            subtotal_cents: subtotal.cents(),
            minimum_cents: coupon.minimum_amount_cents,
        });
    }

    Ok(())
}

/// Computes the discount a valid coupon grants on a subtotal.
///
/// - Percentage: `subtotal × percent`, capped at `max_discount` when set
/// - Fixed: the fixed amount, NOT capped by the subtotal
///
/// Fails with the first rejected gate when the coupon is not applicable.
pub fn coupon_discount(
    coupon: &Coupon,
    subtotal: Money,
    now: DateTime<Utc>,
) -> Result<Money, CouponRejection> {
    validate_coupon(coupon, subtotal, now)?;

    let discount = match coupon.discount_type {
        DiscountType::Percentage => {
            let raw = subtotal.percentage(coupon.percent_bps.unwrap_or(0));
            match coupon.max_discount_cents {
                Some(cap) => raw.min(Money::from_cents(cap)),
                None => raw,
            }
        }
        DiscountType::Fixed => Money::from_cents(coupon.amount_cents.unwrap_or(0)),
    };

    Ok(discount)
}

// =============================================================================
// Pipeline
// =============================================================================

/// Runs the full pricing pipeline over validated lines.
///
/// An invalid or absent coupon yields `discount = 0` and the bill proceeds;
/// this is the checkout behavior. The explicit validate-coupon operation,
/// which rejects instead, lives on top of [`coupon_discount`].
pub fn price_order(
    lines: &[PricingLine],
    taxes: &[Tax],
    coupon: Option<&Coupon>,
    delivery_charge: Money,
    now: DateTime<Utc>,
) -> PriceBreakdown {
    // Stage 1: subtotal over item lines and addon charges.
    let mut subtotal = Money::zero();
    for line in lines {
        subtotal += line.line_total();
        subtotal += line.addon_total();
    }

    // Stage 2: category taxes, per line, against the item line total.
    let mut category_tax_total = Money::zero();
    for line in lines {
        for tax in taxes {
            if tax.is_active
                && tax.tax_type == TaxType::Category
                && tax.covers_category(&line.category)
            {
                category_tax_total += line.line_total().apply_rate(tax.rate());
            }
        }
    }

    // Stage 3: coupon discount. Invalid coupons are silently ignored here.
    let discount = coupon
        .and_then(|c| coupon_discount(c, subtotal, now).ok())
        .unwrap_or_else(Money::zero);

    // Stage 4 is the delivery charge, supplied by the zone table.

    // Stage 5: taxable amount folds in category tax, discount and delivery.
    let taxable_amount = subtotal + category_tax_total - discount + delivery_charge;

    // Stage 6: full-bill taxes over the taxable amount.
    let mut full_bill_tax_total = Money::zero();
    for tax in taxes {
        if tax.is_active && tax.tax_type == TaxType::FullBill {
            full_bill_tax_total += taxable_amount.apply_rate(tax.rate());
        }
    }

    // Stage 7: the grand total.
    let total = subtotal + category_tax_total + full_bill_tax_total - discount + delivery_charge;

    PriceBreakdown {
        subtotal,
        category_tax_total,
        full_bill_tax_total,
        discount,
        delivery_charge,
        total,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::types::DiscountType;

    fn line(category: &str, unit_cents: i64, qty: i64) -> PricingLine {
        PricingLine {
            label: format!("{}-item", category),
            category: category.to_string(),
            unit_price: Money::from_cents(unit_cents),
            quantity: qty,
            addon_unit_price: Money::zero(),
        }
    }

    fn category_tax(rate_bps: u32, categories: &[&str]) -> Tax {
        Tax {
            id: "tax-cat".to_string(),
            name: "Category Tax".to_string(),
            rate_bps,
            tax_type: TaxType::Category,
            applicable_categories: categories.iter().map(|s| s.to_string()).collect(),
            is_active: true,
        }
    }

    fn full_bill_tax(rate_bps: u32) -> Tax {
        Tax {
            id: "tax-bill".to_string(),
            name: "GST".to_string(),
            rate_bps,
            tax_type: TaxType::FullBill,
            applicable_categories: vec![],
            is_active: true,
        }
    }

    fn percentage_coupon(percent_bps: u32, max_discount: Option<i64>) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: "c1".to_string(),
            code: "SAVE".to_string(),
            discount_type: DiscountType::Percentage,
            percent_bps: Some(percent_bps),
            amount_cents: None,
            minimum_amount_cents: 0,
            max_discount_cents: max_discount,
            usage_limit: None,
            used_count: 0,
            valid_from: now - Duration::days(1),
            valid_to: now + Duration::days(1),
            is_active: true,
            created_at: now,
        }
    }

    fn fixed_coupon(amount_cents: i64, minimum_cents: i64) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: "c2".to_string(),
            code: "FLAT".to_string(),
            discount_type: DiscountType::Fixed,
            percent_bps: None,
            amount_cents: Some(amount_cents),
            minimum_amount_cents: minimum_cents,
            max_discount_cents: None,
            usage_limit: None,
            used_count: 0,
            valid_from: now - Duration::days(1),
            valid_to: now + Duration::days(1),
            is_active: true,
            created_at: now,
        }
    }

    #[test]
    fn test_subtotal_includes_addons() {
        let mut l = line("Sofas", 10000, 2);
        l.addon_unit_price = Money::from_cents(500);

        let breakdown = price_order(&[l], &[], None, Money::zero(), Utc::now());
        // 2 × $100 + 2 × $5 = $210
        assert_eq!(breakdown.subtotal.cents(), 21000);
        assert_eq!(breakdown.total.cents(), 21000);
    }

    #[test]
    fn test_category_tax_only_matching_lines() {
        // 5% on Tables only: Tables line 1000.00, Chairs line 500.00
        // category tax = 50.00, not 75.00
        let lines = vec![line("Tables", 100000, 1), line("Chairs", 50000, 1)];
        let taxes = vec![category_tax(500, &["Tables"])];

        let breakdown = price_order(&lines, &taxes, None, Money::zero(), Utc::now());
        assert_eq!(breakdown.category_tax_total.cents(), 5000);
        assert_eq!(breakdown.total.cents(), 155000);
    }

    #[test]
    fn test_inactive_tax_skipped() {
        let lines = vec![line("Tables", 100000, 1)];
        let mut tax = category_tax(500, &["Tables"]);
        tax.is_active = false;

        let breakdown = price_order(&lines, &[tax], None, Money::zero(), Utc::now());
        assert_eq!(breakdown.category_tax_total.cents(), 0);
    }

    #[test]
    fn test_percentage_discount_capped() {
        // subtotal 1000.00, 20% = 200.00, cap 150.00 => 150.00
        let lines = vec![line("Sofas", 100000, 1)];
        let coupon = percentage_coupon(2000, Some(15000));

        let breakdown = price_order(&lines, &[], Some(&coupon), Money::zero(), Utc::now());
        assert_eq!(breakdown.discount.cents(), 15000);
        assert_eq!(breakdown.total.cents(), 85000);
    }

    #[test]
    fn test_percentage_discount_uncapped() {
        let lines = vec![line("Sofas", 100000, 1)];
        let coupon = percentage_coupon(2000, None);

        let breakdown = price_order(&lines, &[], Some(&coupon), Money::zero(), Utc::now());
        assert_eq!(breakdown.discount.cents(), 20000);
    }

    #[test]
    fn test_fixed_coupon_below_minimum_is_rejected() {
        // fixed 50.00 on subtotal 30.00 with minimum 100.00
        let coupon = fixed_coupon(5000, 10000);
        let result = coupon_discount(&coupon, Money::from_cents(3000), Utc::now());
        assert_eq!(
            result,
            Err(CouponRejection::BelowMinimum {
                subtotal_cents: 3000,
                minimum_cents: 10000,
            })
        );
    }

    #[test]
    fn test_checkout_silently_ignores_invalid_coupon() {
        // Same coupon, same subtotal: the pipeline prices with discount 0
        // instead of failing. The validate path above rejects.
        let lines = vec![line("Chairs", 3000, 1)];
        let coupon = fixed_coupon(5000, 10000);

        let breakdown = price_order(&lines, &[], Some(&coupon), Money::zero(), Utc::now());
        assert_eq!(breakdown.discount.cents(), 0);
        assert_eq!(breakdown.total.cents(), 3000);
    }

    #[test]
    fn test_fixed_discount_not_capped_by_subtotal() {
        let lines = vec![line("Chairs", 3000, 1)];
        let coupon = fixed_coupon(5000, 0);

        let breakdown = price_order(&lines, &[], Some(&coupon), Money::zero(), Utc::now());
        assert_eq!(breakdown.discount.cents(), 5000);
        assert_eq!(breakdown.total.cents(), -2000);
        assert!(breakdown.reconstructs());
    }

    #[test]
    fn test_expired_coupon_rejected() {
        let now = Utc::now();
        let mut coupon = percentage_coupon(1000, None);
        coupon.valid_to = now - Duration::days(1);
        coupon.valid_from = now - Duration::days(2);

        let result = validate_coupon(&coupon, Money::from_cents(100000), now);
        assert_eq!(result, Err(CouponRejection::Expired));
    }

    #[test]
    fn test_usage_exhausted_coupon_rejected() {
        let mut coupon = percentage_coupon(1000, None);
        coupon.usage_limit = Some(5);
        coupon.used_count = 5;

        let result = validate_coupon(&coupon, Money::from_cents(100000), Utc::now());
        assert_eq!(result, Err(CouponRejection::UsageExhausted));
    }

    #[test]
    fn test_full_bill_tax_sees_discount_and_delivery() {
        // subtotal 100.00, category tax 5.00 (5% Tables), discount 10.00
        // fixed, delivery 20.00 => taxable = 115.00, full-bill 10% = 11.50
        // total = 100 + 5 + 11.50 - 10 + 20 = 126.50
        let lines = vec![line("Tables", 10000, 1)];
        let taxes = vec![category_tax(500, &["Tables"]), full_bill_tax(1000)];
        let coupon = fixed_coupon(1000, 0);

        let breakdown = price_order(
            &lines,
            &taxes,
            Some(&coupon),
            Money::from_cents(2000),
            Utc::now(),
        );
        assert_eq!(breakdown.subtotal.cents(), 10000);
        assert_eq!(breakdown.category_tax_total.cents(), 500);
        assert_eq!(breakdown.discount.cents(), 1000);
        assert_eq!(breakdown.full_bill_tax_total.cents(), 1150);
        assert_eq!(breakdown.total.cents(), 12650);
        assert!(breakdown.reconstructs());
    }

    #[test]
    fn test_breakdown_round_trips_to_the_cent() {
        // Awkward numbers: the persisted fields alone must rebuild the total.
        let mut l1 = line("Tables", 10999, 3);
        l1.addon_unit_price = Money::from_cents(333);
        let l2 = line("Chairs", 7499, 7);
        let taxes = vec![category_tax(825, &["Tables"]), full_bill_tax(1700)];
        let coupon = percentage_coupon(1250, Some(9999));

        let breakdown = price_order(
            &[l1, l2],
            &taxes,
            Some(&coupon),
            Money::from_cents(1599),
            Utc::now(),
        );
        assert!(breakdown.reconstructs());
    }

    #[test]
    fn test_empty_order_prices_to_delivery_only() {
        let breakdown = price_order(&[], &[], None, Money::from_cents(2000), Utc::now());
        assert_eq!(breakdown.subtotal.cents(), 0);
        assert_eq!(breakdown.total.cents(), 2000);
    }
}
