//! Webhook handler tests: signature verification and end-to-end settlement
//! through the HTTP surface.

mod common;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::{Digest, Sha256, Sha512};

use common::*;
use coursepay::gateways::{MidtransClient, MidtransNotification, TripayClient};
use coursepay::handlers::webhooks::{handle_midtrans_webhook, handle_tripay_webhook};

/// Build the signature Midtrans would attach to a notification.
fn midtrans_signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let canonical = format!("{}{}{}{}", order_id, status_code, gross_amount, server_key);
    hex::encode(Sha512::digest(canonical.as_bytes()))
}

fn tripay_signature(body: &[u8], private_key: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(private_key.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

fn midtrans_settlement_body(order_id: &str, gross_amount: &str, server_key: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "order_id": order_id,
        "status_code": "200",
        "gross_amount": gross_amount,
        "signature_key": midtrans_signature(order_id, "200", gross_amount, server_key),
        "transaction_status": "settlement",
        "payment_type": "qris",
    }))
    .unwrap()
}

#[test]
fn test_midtrans_signature_accepts_genuine_payload() {
    let config = test_midtrans_config();
    let client = MidtransClient::new(&config);

    let body = midtrans_settlement_body("CP-SIG-1", "204000.00", &config.server_key);
    let note: MidtransNotification = serde_json::from_slice(&body).unwrap();
    assert!(client.verify_signature(&note));
}

#[test]
fn test_midtrans_signature_rejects_wrong_key_and_tampering() {
    let config = test_midtrans_config();
    let client = MidtransClient::new(&config);

    // Signed with a different server key
    let body = midtrans_settlement_body("CP-SIG-2", "204000.00", "some-other-key");
    let note: MidtransNotification = serde_json::from_slice(&body).unwrap();
    assert!(!client.verify_signature(&note));

    // Genuine signature, but the amount was tampered with afterwards
    let body = midtrans_settlement_body("CP-SIG-3", "204000.00", &config.server_key);
    let mut note: MidtransNotification = serde_json::from_slice(&body).unwrap();
    note.gross_amount = "1.00".to_string();
    assert!(!client.verify_signature(&note));

    // Garbage signature of the wrong length
    note.signature_key = "deadbeef".to_string();
    assert!(!client.verify_signature(&note));
}

#[test]
fn test_tripay_callback_signature_over_raw_body() {
    let config = test_tripay_config();
    let client = TripayClient::new(&config);

    let body = br#"{"reference":"T123","merchant_ref":"CP-SIG-4","total_amount":154000,"status":"PAID"}"#;
    let good = tripay_signature(body, &config.private_key);
    assert!(client.verify_callback_signature(body, &good).unwrap());

    // Any byte change in the body invalidates the signature
    let tampered = br#"{"reference":"T123","merchant_ref":"CP-SIG-4","total_amount":954000,"status":"PAID"}"#;
    assert!(!client.verify_callback_signature(tampered, &good).unwrap());

    assert!(!client.verify_callback_signature(body, "deadbeef").unwrap());
}

#[tokio::test]
async fn test_midtrans_webhook_settles_end_to_end() {
    let (state, _dir) = test_state();
    let course;
    {
        let conn = state.db.get().unwrap();
        course = create_test_course(&conn, "fullstack", 299_000);
        create_test_pending(&conn, "CP-WH-1", "user-1", &course, Gateway::Midtrans, None);
    }

    let body = midtrans_settlement_body("CP-WH-1", "304000.00", &state.midtrans.server_key);
    let response = handle_midtrans_webhook(State(state.clone()), Bytes::from(body))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let conn = state.db.get().unwrap();
    let txn = queries::get_transaction_by_booking_id(&conn, "CP-WH-1")
        .unwrap()
        .expect("transaction should exist after settlement");
    assert_eq!(txn.grand_total, 304_000);
    assert_eq!(txn.payment_type, "midtrans");
}

#[tokio::test]
async fn test_midtrans_webhook_invalid_signature_acknowledged_but_ignored() {
    let (state, _dir) = test_state();
    {
        let conn = state.db.get().unwrap();
        let course = create_test_course(&conn, "fullstack", 299_000);
        create_test_pending(&conn, "CP-WH-2", "user-1", &course, Gateway::Midtrans, None);
    }

    let body = midtrans_settlement_body("CP-WH-2", "304000.00", "attacker-key");
    let response = handle_midtrans_webhook(State(state.clone()), Bytes::from(body))
        .await
        .into_response();
    // Acknowledged so the gateway stops retrying, but nothing was settled.
    assert_eq!(response.status(), StatusCode::OK);

    let conn = state.db.get().unwrap();
    assert!(queries::get_transaction_by_booking_id(&conn, "CP-WH-2")
        .unwrap()
        .is_none());
    // The intent was not touched either
    let pending = queries::get_pending_payment(&conn, "CP-WH-2").unwrap().unwrap();
    assert_eq!(pending.status, PendingStatus::Pending);
}

#[tokio::test]
async fn test_midtrans_webhook_bad_json_is_client_error() {
    let (state, _dir) = test_state();
    let response = handle_midtrans_webhook(State(state), Bytes::from_static(b"not json"))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tripay_webhook_settles_end_to_end() {
    let (state, _dir) = test_state();
    {
        let conn = state.db.get().unwrap();
        let course = create_test_course(&conn, "ui-design", 149_000);
        create_test_pending(&conn, "CP-WH-3", "user-2", &course, Gateway::Tripay, None);
    }

    let body = serde_json::to_vec(&json!({
        "reference": "T0001234",
        "merchant_ref": "CP-WH-3",
        "total_amount": 154_000,
        "status": "PAID",
    }))
    .unwrap();

    let mut headers = HeaderMap::new();
    headers.insert(
        "x-callback-signature",
        HeaderValue::from_str(&tripay_signature(&body, &state.tripay.private_key)).unwrap(),
    );
    headers.insert("x-callback-event", HeaderValue::from_static("payment_status"));

    let response = handle_tripay_webhook(State(state.clone()), headers, Bytes::from(body))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let conn = state.db.get().unwrap();
    let txn = queries::get_transaction_by_booking_id(&conn, "CP-WH-3")
        .unwrap()
        .expect("transaction should exist after settlement");
    assert_eq!(txn.grand_total, 154_000);
    assert_eq!(txn.payment_type, "tripay");
}

#[tokio::test]
async fn test_tripay_webhook_missing_signature_header_is_client_error() {
    let (state, _dir) = test_state();
    let response = handle_tripay_webhook(State(state), HeaderMap::new(), Bytes::from_static(b"{}"))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tripay_webhook_non_payment_event_ignored() {
    let (state, _dir) = test_state();

    // One payload that carries a merchant_ref and one that shares no schema
    // at all; both are acknowledged without reconciliation.
    let bodies: [&[u8]; 2] = [
        br#"{"merchant_ref":"CP-WH-EVT","open_payment":true}"#,
        br#"{"anything":true}"#,
    ];
    for body in bodies {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-callback-signature",
            HeaderValue::from_str(&tripay_signature(body, &state.tripay.private_key)).unwrap(),
        );
        headers.insert("x-callback-event", HeaderValue::from_static("merchant_balance"));

        let response = handle_tripay_webhook(State(state.clone()), headers, Bytes::from(body.to_vec()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let conn = state.db.get().unwrap();
    assert_eq!(queries::count_transactions(&conn).unwrap(), 0);
}

#[tokio::test]
async fn test_tripay_webhook_unpaid_status_leaves_pending_untouched() {
    let (state, _dir) = test_state();
    {
        let conn = state.db.get().unwrap();
        let course = create_test_course(&conn, "ui-design", 149_000);
        create_test_pending(&conn, "CP-WH-4", "user-2", &course, Gateway::Tripay, None);
    }

    let body = serde_json::to_vec(&json!({
        "reference": "T0001235",
        "merchant_ref": "CP-WH-4",
        "total_amount": 154_000,
        "status": "UNPAID",
    }))
    .unwrap();

    let mut headers = HeaderMap::new();
    headers.insert(
        "x-callback-signature",
        HeaderValue::from_str(&tripay_signature(&body, &state.tripay.private_key)).unwrap(),
    );
    headers.insert("x-callback-event", HeaderValue::from_static("payment_status"));

    let response = handle_tripay_webhook(State(state.clone()), headers, Bytes::from(body))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let conn = state.db.get().unwrap();
    assert!(queries::get_transaction_by_booking_id(&conn, "CP-WH-4")
        .unwrap()
        .is_none());
    let pending = queries::get_pending_payment(&conn, "CP-WH-4").unwrap().unwrap();
    assert_eq!(pending.status, PendingStatus::Pending);
}
