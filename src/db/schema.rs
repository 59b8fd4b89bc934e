use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Courses (catalog, read-only from this service's point of view)
        CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            price INTEGER NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_courses_slug ON courses(slug);

        -- Discounts. Codes are stored uppercase; lookups go through UPPER().
        -- used_count moves only via the guarded increment in queries.rs, so
        -- it can never pass usage_limit.
        CREATE TABLE IF NOT EXISTS discounts (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            kind TEXT NOT NULL CHECK (kind IN ('percentage', 'fixed')),
            value INTEGER NOT NULL,
            minimum_amount INTEGER,
            maximum_discount INTEGER,
            usage_limit INTEGER,
            used_count INTEGER NOT NULL DEFAULT 0,
            start_date INTEGER,
            end_date INTEGER,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_discounts_code ON discounts(code);

        -- Pending payments (checkout intents; ephemeral, deleted or flagged
        -- once settled). One row per order reference; grand_total is written
        -- once at checkout and never updated.
        CREATE TABLE IF NOT EXISTS pending_payments (
            order_reference TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            course_id TEXT NOT NULL REFERENCES courses(id),
            sub_total INTEGER NOT NULL,
            admin_fee INTEGER NOT NULL,
            discount_amount INTEGER NOT NULL DEFAULT 0,
            discount_id TEXT REFERENCES discounts(id),
            grand_total INTEGER NOT NULL,
            gateway TEXT NOT NULL CHECK (gateway IN ('midtrans', 'tripay')),
            gateway_session_token TEXT,
            discount_snapshot TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'completed', 'flagged_amount_mismatch', 'flagged_payload_mismatch')),
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_pending_payments_user ON pending_payments(user_id);
        CREATE INDEX IF NOT EXISTS idx_pending_payments_status ON pending_payments(status);

        -- Transactions (append-only purchase records). The UNIQUE constraint
        -- on booking_id is the idempotency guarantee: concurrent webhook
        -- deliveries race on the insert and exactly one wins.
        CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            booking_id TEXT NOT NULL UNIQUE,
            user_id TEXT NOT NULL,
            course_id TEXT NOT NULL REFERENCES courses(id),
            sub_total INTEGER NOT NULL,
            admin_fee INTEGER NOT NULL,
            discount_amount INTEGER NOT NULL DEFAULT 0,
            discount_id TEXT REFERENCES discounts(id),
            grand_total INTEGER NOT NULL,
            payment_type TEXT NOT NULL,
            is_paid INTEGER NOT NULL DEFAULT 1,
            started_at INTEGER NOT NULL,
            ended_at INTEGER,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_transactions_user ON transactions(user_id);
        CREATE INDEX IF NOT EXISTS idx_transactions_course ON transactions(course_id);
        "#,
    )?;
    Ok(())
}
