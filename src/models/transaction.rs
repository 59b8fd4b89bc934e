use serde::{Deserialize, Serialize};

/// A settled purchase - the financial source of truth.
///
/// At most one row per `booking_id`, enforced by a UNIQUE constraint at the
/// storage layer. Rows are append-only and never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Equals the checkout order reference; the idempotency key.
    pub booking_id: String,
    pub user_id: String,
    pub course_id: String,
    pub sub_total: i64,
    pub admin_fee: i64,
    pub discount_amount: i64,
    pub discount_id: Option<String>,
    /// The amount actually paid, which the reconciler has verified against
    /// the recomputed expected total.
    pub grand_total: i64,
    /// Gateway name ("midtrans" or "tripay").
    pub payment_type: String,
    pub is_paid: bool,
    pub started_at: i64,
    /// NULL means lifetime access.
    pub ended_at: Option<i64>,
    pub created_at: i64,
}

/// Data required to create a new transaction.
#[derive(Debug, Clone)]
pub struct CreateTransaction {
    pub booking_id: String,
    pub user_id: String,
    pub course_id: String,
    pub sub_total: i64,
    pub admin_fee: i64,
    pub discount_amount: i64,
    pub discount_id: Option<String>,
    pub grand_total: i64,
    pub payment_type: String,
}
