//! Prefixed ID generation for Coursepay entities.
//!
//! Internal IDs use a `cp_` brand prefix so they can never collide with
//! gateway-issued references (Midtrans transaction IDs, Tripay `T…` refs).
//!
//! Format: `cp_{entity}_{uuid_simple}` (32 hex chars, no hyphens)
//!
//! Order references are a separate namespace: they are sent verbatim to the
//! gateways as `order_id` / `merchant_ref` and come back on every webhook as
//! the correlation key, so they are kept short and uppercase.

use uuid::Uuid;

/// Entity types that have prefixed IDs in Coursepay.
#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    Course,
    Discount,
    Transaction,
}

impl EntityType {
    /// Returns the prefix for this entity type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Course => "cp_crs",
            Self::Discount => "cp_dsc",
            Self::Transaction => "cp_txn",
        }
    }

    /// Generates a new prefixed ID for this entity type.
    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}

/// Generate an order reference for a checkout attempt.
///
/// This becomes the gateway `order_id` / `merchant_ref` and the transaction
/// `booking_id`, i.e. the single idempotency key for the whole payment flow.
/// Generated exactly once per checkout attempt, before any outbound call.
pub fn gen_order_reference() -> String {
    format!("CP-{}", Uuid::new_v4().as_simple().to_string().to_uppercase())
}
