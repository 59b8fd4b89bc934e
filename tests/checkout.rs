//! Checkout handler tests for the paths that resolve before any outbound
//! gateway call, plus the advisory discount validation endpoint.

mod common;

use axum::extract::State;
use axum::Json;

use common::*;
use coursepay::error::AppError;
use coursepay::handlers::checkout::{initiate_checkout, CheckoutRequest};
use coursepay::handlers::discounts::{validate_discount, ValidateDiscountRequest};

fn checkout_request(course_id: &str, gateway: &str, code: Option<&str>) -> CheckoutRequest {
    CheckoutRequest {
        user_id: "user-1".to_string(),
        course_id: course_id.to_string(),
        gateway: gateway.to_string(),
        discount_code: code.map(str::to_string),
        customer_name: None,
        customer_email: None,
    }
}

fn pending_count(conn: &rusqlite::Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM pending_payments", [], |row| row.get(0))
        .unwrap()
}

#[tokio::test]
async fn test_checkout_rejects_unknown_gateway() {
    let (state, _dir) = test_state();
    let course;
    {
        let conn = state.db.get().unwrap();
        course = create_test_course(&conn, "fullstack", 299_000);
    }

    let result = initiate_checkout(
        State(state.clone()),
        Json(checkout_request(&course.id, "paypal", None)),
    )
    .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(pending_count(&state.db.get().unwrap()), 0);
}

#[tokio::test]
async fn test_checkout_rejects_unknown_course() {
    let (state, _dir) = test_state();
    let result = initiate_checkout(
        State(state),
        Json(checkout_request("cp_crs_missing", "midtrans", None)),
    )
    .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_checkout_rejects_inactive_course() {
    let (state, _dir) = test_state();
    let course;
    {
        let conn = state.db.get().unwrap();
        course = create_test_course(&conn, "retired", 99_000);
        conn.execute(
            "UPDATE courses SET is_active = 0 WHERE id = ?1",
            rusqlite::params![course.id],
        )
        .unwrap();
    }

    let result = initiate_checkout(
        State(state),
        Json(checkout_request(&course.id, "midtrans", None)),
    )
    .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_checkout_unknown_discount_code_is_a_hard_error() {
    let (state, _dir) = test_state();
    let course;
    {
        let conn = state.db.get().unwrap();
        course = create_test_course(&conn, "fullstack", 299_000);
    }

    // An unknown code must fail the checkout rather than silently charging
    // full price.
    let result = initiate_checkout(
        State(state.clone()),
        Json(checkout_request(&course.id, "midtrans", Some("NOPE"))),
    )
    .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(pending_count(&state.db.get().unwrap()), 0);
}

#[tokio::test]
async fn test_checkout_expired_discount_reports_reason() {
    let (state, _dir) = test_state();
    let course;
    {
        let conn = state.db.get().unwrap();
        course = create_test_course(&conn, "fullstack", 299_000);
        let mut input = fixed_discount("OLD", 20_000);
        input.end_date = Some(chrono::Utc::now().timestamp() - 3600);
        queries::create_discount(&conn, &input).unwrap();
    }

    let result = initiate_checkout(
        State(state.clone()),
        Json(checkout_request(&course.id, "tripay", Some("OLD"))),
    )
    .await;
    match result {
        Err(AppError::BadRequest(message)) => {
            assert!(message.contains("expired"), "unexpected message: {}", message);
        }
        other => panic!("expected bad request, got {:?}", other.map(|_| ())),
    }
    assert_eq!(pending_count(&state.db.get().unwrap()), 0);
}

#[tokio::test]
async fn test_validate_discount_happy_path() {
    let (state, _dir) = test_state();
    let course;
    {
        let conn = state.db.get().unwrap();
        course = create_test_course(&conn, "fullstack", 299_000);
        queries::create_discount(&conn, &percentage_discount("FLASH50", 50, Some(100_000)))
            .unwrap();
    }

    let Json(response) = validate_discount(
        State(state),
        Json(ValidateDiscountRequest {
            discount_code: "flash50".to_string(),
            course_id: course.id.clone(),
        }),
    )
    .await
    .unwrap();

    assert!(response.valid);
    assert_eq!(response.amount, 100_000);
    // 299000 + 5000 - 100000
    assert_eq!(response.final_price, 204_000);
}

#[tokio::test]
async fn test_validate_discount_unknown_code_is_soft() {
    let (state, _dir) = test_state();
    let course;
    {
        let conn = state.db.get().unwrap();
        course = create_test_course(&conn, "fullstack", 299_000);
    }

    let Json(response) = validate_discount(
        State(state),
        Json(ValidateDiscountRequest {
            discount_code: "NOPE".to_string(),
            course_id: course.id.clone(),
        }),
    )
    .await
    .unwrap();

    assert!(!response.valid);
    assert_eq!(response.amount, 0);
    assert_eq!(response.final_price, 304_000);
}

#[tokio::test]
async fn test_validate_discount_reports_every_failing_condition() {
    let (state, _dir) = test_state();
    let course;
    {
        let conn = state.db.get().unwrap();
        course = create_test_course(&conn, "fullstack", 299_000);
        let mut input = fixed_discount("BROKEN", 20_000);
        input.end_date = Some(chrono::Utc::now().timestamp() - 3600);
        input.minimum_amount = Some(500_000);
        queries::create_discount(&conn, &input).unwrap();
    }

    let Json(response) = validate_discount(
        State(state),
        Json(ValidateDiscountRequest {
            discount_code: "BROKEN".to_string(),
            course_id: course.id.clone(),
        }),
    )
    .await
    .unwrap();

    assert!(!response.valid);
    // Both independent failures show up, joined in one message
    assert!(response.message.contains("expired"), "{}", response.message);
    assert!(response.message.contains("minimum"), "{}", response.message);
}
