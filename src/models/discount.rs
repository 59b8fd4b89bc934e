use serde::{Deserialize, Serialize};

/// A discount code.
///
/// Codes are stored uppercase and looked up case-insensitively. `used_count`
/// only ever moves as a side effect of a newly created transaction, via the
/// guarded increment in `db::queries` - never speculatively at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discount {
    pub id: String,
    pub code: String,
    pub kind: DiscountKind,
    /// Percentage 0-100 for `Percentage`, rupiah amount for `Fixed`.
    pub value: i64,
    /// Optional floor on the subtotal for the code to apply.
    pub minimum_amount: Option<i64>,
    /// Optional cap on the computed amount (meaningful for percentage codes).
    pub maximum_discount: Option<i64>,
    pub usage_limit: Option<i64>,
    pub used_count: i64,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDiscount {
    pub code: String,
    pub kind: DiscountKind,
    pub value: i64,
    #[serde(default)]
    pub minimum_amount: Option<i64>,
    #[serde(default)]
    pub maximum_discount: Option<i64>,
    #[serde(default)]
    pub usage_limit: Option<i64>,
    #[serde(default)]
    pub start_date: Option<i64>,
    #[serde(default)]
    pub end_date: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percentage,
    Fixed,
}

impl DiscountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

impl std::str::FromStr for DiscountKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The discount terms as applied at checkout time, frozen onto the pending
/// payment as JSON. Settlement recomputes the quoted amount from this
/// snapshot instead of re-trusting a live, possibly-since-edited row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountSnapshot {
    pub code: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub maximum_discount: Option<i64>,
}

impl DiscountSnapshot {
    pub fn of(discount: &Discount) -> Self {
        Self {
            code: discount.code.clone(),
            kind: discount.kind,
            value: discount.value,
            maximum_discount: discount.maximum_discount,
        }
    }

    /// The amount these frozen terms yield against a subtotal.
    pub fn amount_for(&self, subtotal: i64) -> i64 {
        crate::pricing::discount_amount(self.kind, self.value, self.maximum_discount, subtotal)
    }
}
