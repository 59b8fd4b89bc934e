use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result, msg};
use crate::models::TripayConfig;

use super::{CreateSessionRequest, Gateway, GatewayNotification, PaymentStatus, SessionHandle};

type HmacSha256 = Hmac<Sha256>;

const SESSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Payment channel used for closed transactions. Kept fixed for now; the
/// checkout surface does not expose channel selection.
const PAYMENT_METHOD: &str = "BRIVA";

#[derive(Debug, Serialize)]
struct CreateTransactionRequest {
    method: String,
    merchant_ref: String,
    amount: i64,
    customer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_email: Option<String>,
    order_items: Vec<TripayOrderItem>,
    signature: String,
}

#[derive(Debug, Serialize)]
struct TripayOrderItem {
    sku: String,
    name: String,
    price: i64,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct CreateTransactionResponse {
    success: bool,
    #[serde(default)]
    message: String,
    data: Option<TripayTransactionData>,
}

#[derive(Debug, Deserialize)]
struct TripayTransactionData {
    reference: String,
    checkout_url: String,
}

#[derive(Debug, Clone)]
pub struct TripayClient {
    client: Client,
    api_key: String,
    private_key: String,
    merchant_code: String,
    base_url: String,
}

impl TripayClient {
    pub fn new(config: &TripayConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            private_key: config.private_key.clone(),
            merchant_code: config.merchant_code.clone(),
            base_url: config.api_base_url().to_string(),
        }
    }

    /// Signature for the create-transaction call:
    /// HMAC-SHA256(private_key, merchant_code + merchant_ref + amount).
    fn create_signature(&self, merchant_ref: &str, amount: i64) -> Result<String> {
        let canonical = format!("{}{}{}", self.merchant_code, merchant_ref, amount);
        let mut mac = HmacSha256::new_from_slice(self.private_key.as_bytes())
            .map_err(|_| AppError::Internal(msg::INVALID_WEBHOOK_SECRET.into()))?;
        mac.update(canonical.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Create a closed transaction and return the hosted payment URL.
    pub async fn create_transaction(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<SessionHandle> {
        let signature = self.create_signature(&request.order_reference, request.amount)?;
        let body = CreateTransactionRequest {
            method: PAYMENT_METHOD.to_string(),
            merchant_ref: request.order_reference.clone(),
            amount: request.amount,
            customer_name: request
                .customer_name
                .clone()
                .unwrap_or_else(|| "Customer".to_string()),
            customer_email: request.customer_email.clone(),
            order_items: vec![TripayOrderItem {
                sku: request.course_id.clone(),
                name: request.item_name.clone(),
                price: request.amount,
                quantity: 1,
            }],
            signature,
        };

        let response = self
            .client
            .post(format!("{}/transaction/create", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(SESSION_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::GatewayUnavailable(format!("Tripay API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::GatewayUnavailable(format!(
                "Tripay API error: {}",
                error_text
            )));
        }

        let payload: CreateTransactionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Tripay response: {}", e)))?;

        let data = if payload.success {
            payload.data
        } else {
            None
        };
        let data = data.ok_or_else(|| {
            AppError::GatewayUnavailable(format!("Tripay rejected transaction: {}", payload.message))
        })?;

        Ok(SessionHandle {
            gateway_reference: data.reference,
            token: None,
            pay_url: Some(data.checkout_url),
        })
    }

    /// Verify the `X-Callback-Signature` header: HMAC-SHA256 over the raw
    /// request body with the merchant private key, hex-encoded.
    pub fn verify_callback_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        let mut mac = HmacSha256::new_from_slice(self.private_key.as_bytes())
            .map_err(|_| AppError::Internal(msg::INVALID_WEBHOOK_SECRET.into()))?;
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        let expected_bytes = expected.as_bytes();
        let provided_bytes = signature.as_bytes();

        // Length is not secret (always 64 hex chars for SHA-256).
        if expected_bytes.len() != provided_bytes.len() {
            return Ok(false);
        }
        Ok(expected_bytes.ct_eq(provided_bytes).into())
    }

    /// Map the native callback into the normalized notification shape.
    ///
    /// Tripay callbacks carry no customer identity; the reconciler falls
    /// back to the pending payment for those fields.
    pub fn parse_notification(&self, callback: &TripayCallback) -> GatewayNotification {
        GatewayNotification {
            gateway: Gateway::Tripay,
            order_reference: callback.merchant_ref.clone(),
            paid_amount: callback.total_amount,
            status: callback.payment_status(),
            user_id: None,
            course_id: None,
        }
    }
}

/// Native Tripay callback payload (event `payment_status`).
#[derive(Debug, Deserialize)]
pub struct TripayCallback {
    /// Tripay's own reference (T…).
    pub reference: String,
    /// Our order reference.
    pub merchant_ref: String,
    pub total_amount: i64,
    /// "PAID", "UNPAID", "EXPIRED", "FAILED", "REFUND".
    pub status: String,
}

impl TripayCallback {
    pub fn payment_status(&self) -> PaymentStatus {
        match self.status.as_str() {
            "PAID" => PaymentStatus::Settled,
            "UNPAID" => PaymentStatus::Pending,
            _ => PaymentStatus::Failed,
        }
    }
}
