//! Webhook endpoints for the payment gateways.
//!
//! One endpoint per gateway, each accepting that gateway's native payload
//! shape and signature convention. Both always answer 200 for anything that
//! parsed - processed, ignored, or rejected - so the gateway never
//! retry-storms us; non-2xx is reserved for transport-level parse failures.
//! Reconciliation outcomes are reported through the reconciler's structured
//! audit event, not the HTTP response.

mod midtrans;
mod tripay;

pub use midtrans::handle_midtrans_webhook;
pub use tripay::handle_tripay_webhook;
