//! Discount evaluation and price quoting.
//!
//! Pure functions, no I/O. Checkout uses them to quote; the reconciler uses
//! the exact same math at settlement time to verify what the gateway claims
//! was paid. All amounts are integer rupiah.

use serde::Serialize;

use crate::models::{Discount, DiscountKind};

/// Why a discount code does not apply. All failing conditions are collected
/// so the payer can be shown every problem at once, not just the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountInvalidReason {
    Inactive,
    NotStarted,
    Expired,
    BelowMinimum,
    UsageExhausted,
}

impl DiscountInvalidReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Inactive => "This discount code is no longer active",
            Self::NotStarted => "This discount code is not valid yet",
            Self::Expired => "This discount code has expired",
            Self::BelowMinimum => "Order total is below the minimum for this code",
            Self::UsageExhausted => "This discount code has reached its usage limit",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscountEvaluation {
    pub valid: bool,
    pub reasons: Vec<DiscountInvalidReason>,
    /// The discount amount the code yields against the subtotal. Computed
    /// even when invalid, so advisory endpoints can show what the payer
    /// would have saved.
    pub amount: i64,
}

/// Evaluate a discount against a subtotal at a point in time.
pub fn evaluate(discount: &Discount, subtotal: i64, now: i64) -> DiscountEvaluation {
    let mut reasons = Vec::new();

    if !discount.is_active {
        reasons.push(DiscountInvalidReason::Inactive);
    }
    if let Some(start) = discount.start_date {
        if now < start {
            reasons.push(DiscountInvalidReason::NotStarted);
        }
    }
    if let Some(end) = discount.end_date {
        if now > end {
            reasons.push(DiscountInvalidReason::Expired);
        }
    }
    if let Some(minimum) = discount.minimum_amount {
        if subtotal < minimum {
            reasons.push(DiscountInvalidReason::BelowMinimum);
        }
    }
    if let Some(limit) = discount.usage_limit {
        if discount.used_count >= limit {
            reasons.push(DiscountInvalidReason::UsageExhausted);
        }
    }

    DiscountEvaluation {
        valid: reasons.is_empty(),
        reasons,
        amount: discount_amount(
            discount.kind,
            discount.value,
            discount.maximum_discount,
            subtotal,
        ),
    }
}

/// The amount a discount yields against a subtotal.
///
/// Percentage: floor(subtotal * value / 100), clamped to the cap when set.
/// Fixed: min(value, subtotal). Never negative, never exceeds the subtotal.
pub fn discount_amount(
    kind: DiscountKind,
    value: i64,
    maximum_discount: Option<i64>,
    subtotal: i64,
) -> i64 {
    let raw = match kind {
        DiscountKind::Percentage => {
            let amount = subtotal * value / 100;
            match maximum_discount {
                Some(cap) => amount.min(cap),
                None => amount,
            }
        }
        DiscountKind::Fixed => value.min(subtotal),
    };
    raw.clamp(0, subtotal)
}

/// Grand total for a checkout, clamped at zero.
pub fn quote(subtotal: i64, admin_fee: i64, discount_amount: i64) -> i64 {
    (subtotal + admin_fee - discount_amount).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntityType;

    fn discount(kind: DiscountKind, value: i64) -> Discount {
        Discount {
            id: EntityType::Discount.gen_id(),
            code: "TEST".to_string(),
            kind,
            value,
            minimum_amount: None,
            maximum_discount: None,
            usage_limit: None,
            used_count: 0,
            start_date: None,
            end_date: None,
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_percentage_with_cap() {
        // 50% of 299000 = 149500, capped at 100000
        let mut d = discount(DiscountKind::Percentage, 50);
        d.maximum_discount = Some(100_000);
        let eval = evaluate(&d, 299_000, 1000);
        assert!(eval.valid);
        assert_eq!(eval.amount, 100_000);
        assert_eq!(quote(299_000, 5_000, eval.amount), 204_000);
    }

    #[test]
    fn test_percentage_without_cap_floors() {
        let d = discount(DiscountKind::Percentage, 33);
        let eval = evaluate(&d, 100, 1000);
        assert_eq!(eval.amount, 33);
        let eval = evaluate(&d, 101, 1000);
        // floor(101 * 33 / 100) = 33
        assert_eq!(eval.amount, 33);
    }

    #[test]
    fn test_fixed_never_exceeds_subtotal() {
        let d = discount(DiscountKind::Fixed, 500_000);
        let eval = evaluate(&d, 150_000, 1000);
        assert_eq!(eval.amount, 150_000);
    }

    #[test]
    fn test_amount_never_negative() {
        let d = discount(DiscountKind::Fixed, -100);
        assert_eq!(evaluate(&d, 150_000, 1000).amount, 0);
        let d = discount(DiscountKind::Percentage, -10);
        assert_eq!(evaluate(&d, 150_000, 1000).amount, 0);
    }

    #[test]
    fn test_expired_discount_invalid_regardless_of_amount() {
        let mut d = discount(DiscountKind::Percentage, 50);
        d.end_date = Some(500);
        let eval = evaluate(&d, 1_000_000, 1000);
        assert!(!eval.valid);
        assert_eq!(eval.reasons, vec![DiscountInvalidReason::Expired]);
    }

    #[test]
    fn test_not_started_discount_invalid() {
        let mut d = discount(DiscountKind::Fixed, 10_000);
        d.start_date = Some(2000);
        let eval = evaluate(&d, 100_000, 1000);
        assert!(!eval.valid);
        assert_eq!(eval.reasons, vec![DiscountInvalidReason::NotStarted]);
    }

    #[test]
    fn test_usage_exhausted() {
        let mut d = discount(DiscountKind::Fixed, 10_000);
        d.usage_limit = Some(1);
        d.used_count = 1;
        let eval = evaluate(&d, 100_000, 1000);
        assert!(!eval.valid);
        assert_eq!(eval.reasons, vec![DiscountInvalidReason::UsageExhausted]);
    }

    #[test]
    fn test_reasons_are_collected_not_short_circuited() {
        let mut d = discount(DiscountKind::Percentage, 10);
        d.is_active = false;
        d.end_date = Some(500);
        d.minimum_amount = Some(1_000_000);
        d.usage_limit = Some(5);
        d.used_count = 5;
        let eval = evaluate(&d, 100_000, 1000);
        assert!(!eval.valid);
        assert_eq!(
            eval.reasons,
            vec![
                DiscountInvalidReason::Inactive,
                DiscountInvalidReason::Expired,
                DiscountInvalidReason::BelowMinimum,
                DiscountInvalidReason::UsageExhausted,
            ]
        );
    }

    #[test]
    fn test_below_minimum() {
        let mut d = discount(DiscountKind::Fixed, 10_000);
        d.minimum_amount = Some(200_000);
        assert!(!evaluate(&d, 199_999, 1000).valid);
        assert!(evaluate(&d, 200_000, 1000).valid);
    }

    #[test]
    fn test_quote_clamps_at_zero() {
        assert_eq!(quote(100, 0, 500), 0);
        assert_eq!(quote(100_000, 5_000, 20_000), 85_000);
        assert_eq!(quote(0, 0, 0), 0);
    }
}
