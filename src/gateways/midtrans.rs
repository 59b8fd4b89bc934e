use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::models::MidtransConfig;

use super::{
    parse_amount_string, CreateSessionRequest, Gateway, GatewayNotification, PaymentStatus,
    SessionHandle,
};

/// Bounded timeout for the one externally-latent call on the checkout happy
/// path. No retries: a retry here must never mint a second session.
const SESSION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SnapTransactionDetails {
    order_id: String,
    gross_amount: i64,
}

#[derive(Debug, Serialize)]
struct SnapItemDetail {
    id: String,
    price: i64,
    quantity: u32,
    name: String,
}

#[derive(Debug, Serialize)]
struct SnapCustomerDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateSnapRequest {
    transaction_details: SnapTransactionDetails,
    item_details: Vec<SnapItemDetail>,
    customer_details: SnapCustomerDetails,
    /// Echoed back on every notification; carries the payer identity.
    custom_field1: String,
    /// Echoed back on every notification; carries the course.
    custom_field2: String,
}

#[derive(Debug, Deserialize)]
struct CreateSnapResponse {
    token: String,
    redirect_url: String,
}

#[derive(Debug, Clone)]
pub struct MidtransClient {
    client: Client,
    server_key: String,
    base_url: String,
}

impl MidtransClient {
    pub fn new(config: &MidtransConfig) -> Self {
        Self {
            client: Client::new(),
            server_key: config.server_key.clone(),
            base_url: config.snap_base_url().to_string(),
        }
    }

    /// Create a Snap session for a checkout.
    ///
    /// The payer completes payment in Midtrans' hosted widget using the
    /// returned token; Midtrans later posts a signed notification to our
    /// webhook endpoint.
    pub async fn create_snap_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<SessionHandle> {
        let body = CreateSnapRequest {
            transaction_details: SnapTransactionDetails {
                order_id: request.order_reference.clone(),
                gross_amount: request.amount,
            },
            item_details: vec![SnapItemDetail {
                id: request.course_id.clone(),
                price: request.amount,
                quantity: 1,
                name: request.item_name.clone(),
            }],
            customer_details: SnapCustomerDetails {
                first_name: request.customer_name.clone(),
                email: request.customer_email.clone(),
            },
            custom_field1: request.user_id.clone(),
            custom_field2: request.course_id.clone(),
        };

        let response = self
            .client
            .post(format!("{}/snap/v1/transactions", self.base_url))
            .basic_auth(&self.server_key, None::<&str>)
            .timeout(SESSION_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::GatewayUnavailable(format!("Midtrans API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::GatewayUnavailable(format!(
                "Midtrans API error: {}",
                error_text
            )));
        }

        let snap: CreateSnapResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Midtrans response: {}", e)))?;

        Ok(SessionHandle {
            gateway_reference: snap.token.clone(),
            token: Some(snap.token),
            pay_url: Some(snap.redirect_url),
        })
    }

    /// Verify the `signature_key` field of a notification.
    ///
    /// Midtrans signs sha512(order_id + status_code + gross_amount +
    /// server_key) and delivers it hex-encoded inside the payload itself.
    pub fn verify_signature(&self, notification: &MidtransNotification) -> bool {
        let canonical = format!(
            "{}{}{}{}",
            notification.order_id,
            notification.status_code,
            notification.gross_amount,
            self.server_key
        );
        let expected = hex::encode(Sha512::digest(canonical.as_bytes()));

        let expected_bytes = expected.as_bytes();
        let provided_bytes = notification.signature_key.as_bytes();

        // Length is not secret (always 128 hex chars for SHA-512), so the
        // non-constant-time length check is fine.
        if expected_bytes.len() != provided_bytes.len() {
            return false;
        }
        expected_bytes.ct_eq(provided_bytes).into()
    }

    /// Map the native payload into the normalized notification shape.
    ///
    /// Returns None when the gross amount cannot be represented exactly in
    /// whole rupiah; the caller treats that as an unsupported payload.
    pub fn parse_notification(
        &self,
        notification: &MidtransNotification,
    ) -> Option<GatewayNotification> {
        let paid_amount = parse_amount_string(&notification.gross_amount)?;
        Some(GatewayNotification {
            gateway: Gateway::Midtrans,
            order_reference: notification.order_id.clone(),
            paid_amount,
            status: notification.payment_status(),
            user_id: notification.custom_field1.clone(),
            course_id: notification.custom_field2.clone(),
        })
    }
}

/// Native Midtrans HTTP(S) notification payload.
#[derive(Debug, Deserialize)]
pub struct MidtransNotification {
    pub order_id: String,
    pub status_code: String,
    /// Decimal string, e.g. "204000.00".
    pub gross_amount: String,
    pub signature_key: String,
    pub transaction_status: String,
    /// Present for card transactions; "accept" is required for `capture` to
    /// count as final.
    pub fraud_status: Option<String>,
    pub payment_type: Option<String>,
    pub custom_field1: Option<String>,
    pub custom_field2: Option<String>,
}

impl MidtransNotification {
    pub fn payment_status(&self) -> PaymentStatus {
        match self.transaction_status.as_str() {
            "settlement" => PaymentStatus::Settled,
            // A capture is final only once the fraud check accepted it. An
            // undeclared fraud outcome stays pending; Midtrans redelivers
            // when it resolves.
            "capture" => match self.fraud_status.as_deref() {
                Some("accept") => PaymentStatus::Settled,
                _ => PaymentStatus::Pending,
            },
            "pending" | "authorize" => PaymentStatus::Pending,
            _ => PaymentStatus::Failed,
        }
    }
}
