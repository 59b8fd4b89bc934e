//! Test utilities and fixtures for Coursepay integration tests

#![allow(dead_code)]

use rusqlite::Connection;

pub use coursepay::db::{create_pool, init_db, queries, AppState, DbPool};
pub use coursepay::gateways::{Gateway, GatewayNotification, PaymentStatus};
pub use coursepay::models::*;
pub use coursepay::pricing;

/// Flat admin fee used across the fixtures, in rupiah.
pub const TEST_ADMIN_FEE: i64 = 5_000;

/// Create an in-memory test database with schema initialized.
/// Suitable for query-level tests that only need one connection.
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

pub fn test_midtrans_config() -> MidtransConfig {
    MidtransConfig {
        server_key: "SB-Mid-server-testkey".to_string(),
        client_key: "SB-Mid-client-testkey".to_string(),
        production: false,
    }
}

pub fn test_tripay_config() -> TripayConfig {
    TripayConfig {
        api_key: "tripay-test-api-key".to_string(),
        private_key: "tripay-test-private-key".to_string(),
        merchant_code: "T0001".to_string(),
        production: false,
    }
}

/// Full application state over a temp-file database.
///
/// File-backed (not in-memory) so multiple pooled connections see the same
/// data, which the reconciler and the concurrency tests rely on. The
/// returned TempDir must be kept alive for the duration of the test.
pub fn test_state() -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("coursepay-test.db");
    let pool = create_pool(path.to_str().expect("utf8 path")).expect("Failed to create pool");
    {
        let conn = pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize schema");
    }
    let state = AppState {
        db: pool,
        base_url: "http://127.0.0.1:3000".to_string(),
        admin_fee: TEST_ADMIN_FEE,
        midtrans: test_midtrans_config(),
        tripay: test_tripay_config(),
        notify_url: None,
        http: reqwest::Client::new(),
    };
    (state, dir)
}

pub fn create_test_course(conn: &Connection, slug: &str, price: i64) -> Course {
    queries::create_course(
        conn,
        &CreateCourse {
            name: format!("Course {}", slug),
            slug: slug.to_string(),
            price,
        },
    )
    .expect("Failed to create test course")
}

pub fn percentage_discount(code: &str, value: i64, cap: Option<i64>) -> CreateDiscount {
    CreateDiscount {
        code: code.to_string(),
        kind: DiscountKind::Percentage,
        value,
        minimum_amount: None,
        maximum_discount: cap,
        usage_limit: None,
        start_date: None,
        end_date: None,
    }
}

pub fn fixed_discount(code: &str, value: i64) -> CreateDiscount {
    CreateDiscount {
        code: code.to_string(),
        kind: DiscountKind::Fixed,
        value,
        minimum_amount: None,
        maximum_discount: None,
        usage_limit: None,
        start_date: None,
        end_date: None,
    }
}

/// Persist a checkout intent the way the checkout handler would, including
/// the frozen discount snapshot.
pub fn create_test_pending(
    conn: &Connection,
    order_reference: &str,
    user_id: &str,
    course: &Course,
    gateway: Gateway,
    discount: Option<&Discount>,
) -> PendingPayment {
    let discount_amount = discount
        .map(|d| pricing::evaluate(d, course.price, chrono::Utc::now().timestamp()).amount)
        .unwrap_or(0);
    queries::create_pending_payment(
        conn,
        &CreatePendingPayment {
            order_reference: order_reference.to_string(),
            user_id: user_id.to_string(),
            course_id: course.id.clone(),
            sub_total: course.price,
            admin_fee: TEST_ADMIN_FEE,
            discount_amount,
            discount_id: discount.map(|d| d.id.clone()),
            grand_total: pricing::quote(course.price, TEST_ADMIN_FEE, discount_amount),
            gateway,
            discount_snapshot: discount.map(DiscountSnapshot::of),
        },
    )
    .expect("Failed to create test pending payment")
}

/// A final-status notification for an order, the way a gateway adapter
/// would normalize it.
pub fn settled_note(gateway: Gateway, order_reference: &str, paid_amount: i64) -> GatewayNotification {
    GatewayNotification {
        gateway,
        order_reference: order_reference.to_string(),
        paid_amount,
        status: PaymentStatus::Settled,
        user_id: None,
        course_id: None,
    }
}
