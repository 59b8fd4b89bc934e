mod schema;
pub mod from_row;
pub mod queries;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::models::{MidtransConfig, TripayConfig};

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state holding the database pool and injected configuration.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Base URL for gateway redirects back to us.
    pub base_url: String,
    /// Flat admin fee in rupiah, added to every checkout.
    pub admin_fee: i64,
    pub midtrans: MidtransConfig,
    pub tripay: TripayConfig,
    /// Endpoint for fire-and-forget purchase notifications, if configured.
    pub notify_url: Option<String>,
    /// Shared HTTP client for outbound notification posts.
    pub http: reqwest::Client,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    // WAL lets concurrent webhook deliveries write without serializing the
    // whole database; busy_timeout covers the brief writer overlap window.
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
    });
    Pool::builder().max_size(10).build(manager)
}
