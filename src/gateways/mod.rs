//! Payment gateway adapters.
//!
//! Two independent integrations: Midtrans Snap (redirect/token style - the
//! client gets an opaque token, pays in the hosted widget, Midtrans posts a
//! signed notification) and Tripay (close-API style - we create the
//! transaction server-side with a signed call, get a payment URL, Tripay
//! posts a signed callback). Each adapter exposes create-session,
//! verify-signature, and parse-notification; the reconciler only ever sees
//! the normalized `GatewayNotification`.

mod midtrans;
mod tripay;

pub use midtrans::*;
pub use tripay::*;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gateway {
    Midtrans,
    Tripay,
}

impl Gateway {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Midtrans => "midtrans",
            Self::Tripay => "tripay",
        }
    }
}

impl std::str::FromStr for Gateway {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "midtrans" => Ok(Self::Midtrans),
            "tripay" => Ok(Self::Tripay),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment status after normalization. Only `Settled` ever reaches the
/// commit path; everything else is ignored or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Final success - funds captured/settled.
    Settled,
    /// Not final yet; the gateway may deliver a final status later.
    Pending,
    /// Final failure (denied, cancelled, expired).
    Failed,
}

/// Normalized request for minting a gateway session at checkout time.
#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub order_reference: String,
    /// Grand total in rupiah.
    pub amount: i64,
    pub item_name: String,
    pub user_id: String,
    pub course_id: String,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
}

/// Client-facing handle returned from session creation.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    /// The gateway's own reference for the session.
    pub gateway_reference: String,
    /// Snap token (Midtrans).
    pub token: Option<String>,
    /// Hosted payment page URL.
    pub pay_url: Option<String>,
}

/// Gateway-agnostic notification shape consumed by the reconciler.
///
/// Strict struct with explicit optionals - a missing field is a compile-time
/// concern here, not a runtime map lookup.
#[derive(Debug, Clone)]
pub struct GatewayNotification {
    pub gateway: Gateway,
    pub order_reference: String,
    /// Amount the gateway claims was paid, in rupiah.
    pub paid_amount: i64,
    pub status: PaymentStatus,
    /// Declared payer identity, when the gateway payload carries one.
    pub user_id: Option<String>,
    /// Declared course, when the gateway payload carries one.
    pub course_id: Option<String>,
}

/// Parse a gateway amount string like `"204000.00"` into whole rupiah.
///
/// Rejects non-zero fractional parts rather than rounding: a paid amount we
/// cannot represent exactly must never compare equal to an expected total.
pub(crate) fn parse_amount_string(raw: &str) -> Option<i64> {
    let (whole, fraction) = match raw.split_once('.') {
        Some((w, f)) => (w, f),
        None => (raw, ""),
    };
    if !fraction.is_empty() && !fraction.chars().all(|c| c == '0') {
        return None;
    }
    let value: i64 = whole.parse().ok()?;
    if value < 0 {
        return None;
    }
    Some(value)
}
