use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::db::AppState;
use crate::gateways::{Gateway, MidtransClient, MidtransNotification};
use crate::reconcile::{self, RejectReason, ReconcileOutcome};

/// Midtrans HTTP(S) notification endpoint.
///
/// The signature is a payload field (`signature_key`), not a header, so the
/// body is parsed first and verified second.
pub async fn handle_midtrans_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> impl IntoResponse {
    let notification: MidtransNotification = match serde_json::from_slice(&body) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!("Failed to parse Midtrans notification: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    let client = MidtransClient::new(&state.midtrans);

    if !client.verify_signature(&notification) {
        // Hard stop: treated as if never received, logged for audit only.
        reconcile::log_rejection(
            Gateway::Midtrans,
            &notification.order_id,
            RejectReason::InvalidSignature,
        );
        return (StatusCode::OK, "Ignored");
    }

    let Some(normalized) = client.parse_notification(&notification) else {
        reconcile::log_rejection(
            Gateway::Midtrans,
            &notification.order_id,
            RejectReason::Unsupported,
        );
        return (StatusCode::OK, "Ignored");
    };

    match reconcile::process_notification(&state, &normalized) {
        Ok(ReconcileOutcome::Committed { .. }) => (StatusCode::OK, "OK"),
        Ok(ReconcileOutcome::Rejected(_)) => (StatusCode::OK, "Ignored"),
        Err(e) => {
            tracing::error!("Reconciliation error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Processing error")
        }
    }
}
