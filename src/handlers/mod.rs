pub mod checkout;
pub mod discounts;
pub mod webhooks;

pub use checkout::initiate_checkout;
pub use discounts::validate_discount;

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}
