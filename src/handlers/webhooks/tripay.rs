use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use serde::Deserialize;

use crate::db::AppState;
use crate::gateways::{Gateway, TripayCallback, TripayClient};
use crate::reconcile::{self, RejectReason, ReconcileOutcome};

/// Pull the merchant_ref out of an otherwise-unhandled callback payload, for
/// log correlation only. Non-payment events share no schema beyond this field.
fn merchant_ref_best_effort(body: &[u8]) -> String {
    #[derive(Deserialize)]
    struct EventRef {
        #[serde(default)]
        merchant_ref: String,
    }
    serde_json::from_slice::<EventRef>(body)
        .map(|e| e.merchant_ref)
        .unwrap_or_default()
}

/// Tripay callback endpoint.
///
/// Signature is HMAC-SHA256 over the raw body, delivered in
/// `X-Callback-Signature`; verification happens before any parsing beyond
/// the transport level.
pub async fn handle_tripay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = match headers.get("x-callback-signature").and_then(|v| v.to_str().ok()) {
        Some(s) => s.to_string(),
        None => return (StatusCode::BAD_REQUEST, "Missing callback signature header"),
    };

    let client = TripayClient::new(&state.tripay);

    match client.verify_callback_signature(&body, &signature) {
        Ok(true) => {}
        Ok(false) => {
            reconcile::log_rejection(Gateway::Tripay, "", RejectReason::InvalidSignature);
            return (StatusCode::OK, "Ignored");
        }
        Err(e) => {
            tracing::error!("Signature verification error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Signature verification failed");
        }
    }

    // Only payment_status events describe settlements. The signature is
    // already verified here, so the payload's merchant_ref is trustworthy
    // enough to use as the correlation key in the audit event.
    let event = headers
        .get("x-callback-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if event != "payment_status" {
        let order_reference = merchant_ref_best_effort(&body);
        reconcile::log_rejection(Gateway::Tripay, &order_reference, RejectReason::Unsupported);
        return (StatusCode::OK, "Event ignored");
    }

    let callback: TripayCallback = match serde_json::from_slice(&body) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to parse Tripay callback: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    let normalized = client.parse_notification(&callback);

    match reconcile::process_notification(&state, &normalized) {
        Ok(ReconcileOutcome::Committed { .. }) => (StatusCode::OK, "OK"),
        Ok(ReconcileOutcome::Rejected(_)) => (StatusCode::OK, "Ignored"),
        Err(e) => {
            tracing::error!("Reconciliation error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Processing error")
        }
    }
}
