use std::env;

use crate::models::{MidtransConfig, TripayConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    /// Flat admin fee added to every checkout, in rupiah.
    pub admin_fee: i64,
    pub midtrans: MidtransConfig,
    pub tripay: TripayConfig,
    /// Optional endpoint for fire-and-forget purchase notifications.
    pub notify_webhook_url: Option<String>,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("COURSEPAY_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        // Each gateway gets its own config value, loaded once here and
        // injected at client construction. Settings never leak between
        // gateways mid-request.
        let midtrans = MidtransConfig {
            server_key: env::var("MIDTRANS_SERVER_KEY").unwrap_or_default(),
            client_key: env::var("MIDTRANS_CLIENT_KEY").unwrap_or_default(),
            production: env::var("MIDTRANS_PRODUCTION")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };

        let tripay = TripayConfig {
            api_key: env::var("TRIPAY_API_KEY").unwrap_or_default(),
            private_key: env::var("TRIPAY_PRIVATE_KEY").unwrap_or_default(),
            merchant_code: env::var("TRIPAY_MERCHANT_CODE").unwrap_or_default(),
            production: env::var("TRIPAY_PRODUCTION")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "coursepay.db".to_string()),
            base_url,
            admin_fee: env::var("ADMIN_FEE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            midtrans,
            tripay,
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL").ok(),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
