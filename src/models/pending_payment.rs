use serde::{Deserialize, Serialize};

use super::DiscountSnapshot;
use crate::gateways::Gateway;

/// A checkout intent, keyed by order reference.
///
/// Created before the outbound gateway call and consulted again at webhook
/// time so the reconciler can compare what was quoted to the payer against
/// what the gateway claims was paid. `grand_total` is immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingPayment {
    pub order_reference: String,
    pub user_id: String,
    pub course_id: String,
    pub sub_total: i64,
    pub admin_fee: i64,
    pub discount_amount: i64,
    pub discount_id: Option<String>,
    pub grand_total: i64,
    pub gateway: Gateway,
    /// Snap token or Tripay reference, set after the session is minted.
    pub gateway_session_token: Option<String>,
    pub discount_snapshot: Option<DiscountSnapshot>,
    pub status: PendingStatus,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct CreatePendingPayment {
    pub order_reference: String,
    pub user_id: String,
    pub course_id: String,
    pub sub_total: i64,
    pub admin_fee: i64,
    pub discount_amount: i64,
    pub discount_id: Option<String>,
    pub grand_total: i64,
    pub gateway: Gateway,
    pub discount_snapshot: Option<DiscountSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    Pending,
    Completed,
    /// Paid amount differed from the recomputed expected total.
    /// Kept for manual review, never settled.
    FlaggedAmountMismatch,
    /// Declared user/course identities differed from the checkout intent.
    FlaggedPayloadMismatch,
}

impl PendingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::FlaggedAmountMismatch => "flagged_amount_mismatch",
            Self::FlaggedPayloadMismatch => "flagged_payload_mismatch",
        }
    }
}

impl std::str::FromStr for PendingStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "flagged_amount_mismatch" => Ok(Self::FlaggedAmountMismatch),
            "flagged_payload_mismatch" => Ok(Self::FlaggedPayloadMismatch),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
