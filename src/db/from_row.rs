//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::gateways::Gateway;
use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on corrupt data.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const COURSE_COLS: &str = "id, name, slug, price, is_active, created_at";

pub const DISCOUNT_COLS: &str = "id, code, kind, value, minimum_amount, maximum_discount, usage_limit, used_count, start_date, end_date, is_active, created_at, updated_at";

pub const PENDING_PAYMENT_COLS: &str = "order_reference, user_id, course_id, sub_total, admin_fee, discount_amount, discount_id, grand_total, gateway, gateway_session_token, discount_snapshot, status, created_at";

pub const TRANSACTION_COLS: &str = "id, booking_id, user_id, course_id, sub_total, admin_fee, discount_amount, discount_id, grand_total, payment_type, is_paid, started_at, ended_at, created_at";

// ============ FromRow Implementations ============

impl FromRow for Course {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Course {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
            price: row.get(3)?,
            is_active: row.get::<_, i64>(4)? != 0,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for Discount {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Discount {
            id: row.get(0)?,
            code: row.get(1)?,
            kind: parse_enum(row, 2, "kind")?,
            value: row.get(3)?,
            minimum_amount: row.get(4)?,
            maximum_discount: row.get(5)?,
            usage_limit: row.get(6)?,
            used_count: row.get(7)?,
            start_date: row.get(8)?,
            end_date: row.get(9)?,
            is_active: row.get::<_, i64>(10)? != 0,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }
}

impl FromRow for PendingPayment {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        // The snapshot column holds JSON written by us; treat malformed
        // content as a type error rather than silently dropping it.
        let snapshot: Option<DiscountSnapshot> = match row.get::<_, Option<String>>(10)? {
            Some(json) => Some(serde_json::from_str(&json).map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    10,
                    "discount_snapshot".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?),
            None => None,
        };
        Ok(PendingPayment {
            order_reference: row.get(0)?,
            user_id: row.get(1)?,
            course_id: row.get(2)?,
            sub_total: row.get(3)?,
            admin_fee: row.get(4)?,
            discount_amount: row.get(5)?,
            discount_id: row.get(6)?,
            grand_total: row.get(7)?,
            gateway: parse_enum::<Gateway>(row, 8, "gateway")?,
            gateway_session_token: row.get(9)?,
            discount_snapshot: snapshot,
            status: parse_enum(row, 11, "status")?,
            created_at: row.get(12)?,
        })
    }
}

impl FromRow for Transaction {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Transaction {
            id: row.get(0)?,
            booking_id: row.get(1)?,
            user_id: row.get(2)?,
            course_id: row.get(3)?,
            sub_total: row.get(4)?,
            admin_fee: row.get(5)?,
            discount_amount: row.get(6)?,
            discount_id: row.get(7)?,
            grand_total: row.get(8)?,
            payment_type: row.get(9)?,
            is_paid: row.get::<_, i64>(10)? != 0,
            started_at: row.get(11)?,
            ended_at: row.get(12)?,
            created_at: row.get(13)?,
        })
    }
}
