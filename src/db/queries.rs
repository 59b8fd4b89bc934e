use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::Result;
use crate::id::EntityType;
use crate::models::*;

use super::from_row::{
    query_one, COURSE_COLS, DISCOUNT_COLS, PENDING_PAYMENT_COLS, TRANSACTION_COLS,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

// ============ Courses ============

pub fn create_course(conn: &Connection, input: &CreateCourse) -> Result<Course> {
    let id = EntityType::Course.gen_id();
    let ts = now();
    conn.execute(
        "INSERT INTO courses (id, name, slug, price, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, 1, ?5)",
        params![id, input.name, input.slug, input.price, ts],
    )?;
    Ok(Course {
        id,
        name: input.name.clone(),
        slug: input.slug.clone(),
        price: input.price,
        is_active: true,
        created_at: ts,
    })
}

pub fn get_course_by_id(conn: &Connection, id: &str) -> Result<Option<Course>> {
    query_one(
        conn,
        &format!("SELECT {} FROM courses WHERE id = ?1", COURSE_COLS),
        &[&id],
    )
}

pub fn count_courses(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))?;
    Ok(count)
}

// ============ Discounts ============

pub fn create_discount(conn: &Connection, input: &CreateDiscount) -> Result<Discount> {
    let id = EntityType::Discount.gen_id();
    let code = input.code.trim().to_uppercase();
    let ts = now();
    conn.execute(
        "INSERT INTO discounts (id, code, kind, value, minimum_amount, maximum_discount,
                                usage_limit, used_count, start_date, end_date, is_active,
                                created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, 1, ?10, ?10)",
        params![
            id,
            code,
            input.kind.as_str(),
            input.value,
            input.minimum_amount,
            input.maximum_discount,
            input.usage_limit,
            input.start_date,
            input.end_date,
            ts
        ],
    )?;
    Ok(Discount {
        id,
        code,
        kind: input.kind,
        value: input.value,
        minimum_amount: input.minimum_amount,
        maximum_discount: input.maximum_discount,
        usage_limit: input.usage_limit,
        used_count: 0,
        start_date: input.start_date,
        end_date: input.end_date,
        is_active: true,
        created_at: ts,
        updated_at: ts,
    })
}

/// Case-insensitive code lookup. Codes are stored uppercase.
pub fn get_discount_by_code(conn: &Connection, code: &str) -> Result<Option<Discount>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM discounts WHERE code = UPPER(TRIM(?1))",
            DISCOUNT_COLS
        ),
        &[&code],
    )
}

pub fn get_discount_by_id(conn: &Connection, id: &str) -> Result<Option<Discount>> {
    query_one(
        conn,
        &format!("SELECT {} FROM discounts WHERE id = ?1", DISCOUNT_COLS),
        &[&id],
    )
}

/// Atomically consume one use of a discount.
///
/// The guard in the WHERE clause keeps `used_count` from ever passing
/// `usage_limit`, no matter how many callers race. Returns whether a use was
/// actually consumed. Must only be called by the caller that observed
/// "newly created" from `create_or_get_transaction`.
pub fn increment_discount_usage(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE discounts
         SET used_count = used_count + 1, updated_at = ?2
         WHERE id = ?1
           AND (usage_limit IS NULL OR used_count < usage_limit)",
        params![id, now()],
    )?;
    Ok(affected > 0)
}

// ============ Pending payments ============

pub fn create_pending_payment(
    conn: &Connection,
    input: &CreatePendingPayment,
) -> Result<PendingPayment> {
    let snapshot_json = input
        .discount_snapshot
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let ts = now();
    conn.execute(
        "INSERT INTO pending_payments (order_reference, user_id, course_id, sub_total,
                                       admin_fee, discount_amount, discount_id, grand_total,
                                       gateway, gateway_session_token, discount_snapshot,
                                       status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, ?10, 'pending', ?11)",
        params![
            input.order_reference,
            input.user_id,
            input.course_id,
            input.sub_total,
            input.admin_fee,
            input.discount_amount,
            input.discount_id,
            input.grand_total,
            input.gateway.as_str(),
            snapshot_json,
            ts
        ],
    )?;
    Ok(PendingPayment {
        order_reference: input.order_reference.clone(),
        user_id: input.user_id.clone(),
        course_id: input.course_id.clone(),
        sub_total: input.sub_total,
        admin_fee: input.admin_fee,
        discount_amount: input.discount_amount,
        discount_id: input.discount_id.clone(),
        grand_total: input.grand_total,
        gateway: input.gateway,
        gateway_session_token: None,
        discount_snapshot: input.discount_snapshot.clone(),
        status: PendingStatus::Pending,
        created_at: ts,
    })
}

pub fn get_pending_payment(
    conn: &Connection,
    order_reference: &str,
) -> Result<Option<PendingPayment>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM pending_payments WHERE order_reference = ?1",
            PENDING_PAYMENT_COLS
        ),
        &[&order_reference],
    )
}

pub fn set_pending_session_token(
    conn: &Connection,
    order_reference: &str,
    token: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE pending_payments SET gateway_session_token = ?2 WHERE order_reference = ?1",
        params![order_reference, token],
    )?;
    Ok(affected > 0)
}

pub fn mark_pending_status(
    conn: &Connection,
    order_reference: &str,
    status: PendingStatus,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE pending_payments SET status = ?2 WHERE order_reference = ?1",
        params![order_reference, status.as_str()],
    )?;
    Ok(affected > 0)
}

pub fn delete_pending_payment(conn: &Connection, order_reference: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM pending_payments WHERE order_reference = ?1",
        params![order_reference],
    )?;
    Ok(affected > 0)
}

// ============ Transactions ============

/// Atomic create-or-fetch keyed by booking_id.
///
/// The insert races on the UNIQUE constraint; ON CONFLICT DO NOTHING means
/// exactly one concurrent caller observes `true` (newly created) and everyone
/// else observes `false` with the existing row. This is the storage-level
/// idempotency primitive - callers must not pre-check existence and branch.
pub fn create_or_get_transaction(
    conn: &Connection,
    input: &CreateTransaction,
) -> Result<(Transaction, bool)> {
    let id = EntityType::Transaction.gen_id();
    let ts = now();
    let affected = conn.execute(
        "INSERT INTO transactions (id, booking_id, user_id, course_id, sub_total, admin_fee,
                                   discount_amount, discount_id, grand_total, payment_type,
                                   is_paid, started_at, ended_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, ?11, NULL, ?11)
         ON CONFLICT(booking_id) DO NOTHING",
        params![
            id,
            input.booking_id,
            input.user_id,
            input.course_id,
            input.sub_total,
            input.admin_fee,
            input.discount_amount,
            input.discount_id,
            input.grand_total,
            input.payment_type,
            ts
        ],
    )?;
    let created = affected > 0;

    let transaction = get_transaction_by_booking_id(conn, &input.booking_id)?.ok_or_else(|| {
        crate::error::AppError::Internal(format!(
            "transaction missing after create-or-get for booking {}",
            input.booking_id
        ))
    })?;
    Ok((transaction, created))
}

pub fn get_transaction_by_booking_id(
    conn: &Connection,
    booking_id: &str,
) -> Result<Option<Transaction>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM transactions WHERE booking_id = ?1",
            TRANSACTION_COLS
        ),
        &[&booking_id],
    )
}

pub fn count_transactions(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
    Ok(count)
}
