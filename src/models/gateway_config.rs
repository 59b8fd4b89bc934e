use serde::Deserialize;

/// Midtrans Snap credentials (redirect/token gateway).
#[derive(Debug, Clone, Deserialize)]
pub struct MidtransConfig {
    pub server_key: String,
    pub client_key: String,
    pub production: bool,
}

impl MidtransConfig {
    pub fn snap_base_url(&self) -> &'static str {
        if self.production {
            "https://app.midtrans.com"
        } else {
            "https://app.sandbox.midtrans.com"
        }
    }
}

/// Tripay credentials (close-API gateway).
#[derive(Debug, Clone, Deserialize)]
pub struct TripayConfig {
    pub api_key: String,
    pub private_key: String,
    pub merchant_code: String,
    pub production: bool,
}

impl TripayConfig {
    pub fn api_base_url(&self) -> &'static str {
        if self.production {
            "https://tripay.co.id/api"
        } else {
            "https://tripay.co.id/api-sandbox"
        }
    }
}
