//! Purchase notification dispatch.
//!
//! When `NOTIFY_WEBHOOK_URL` is configured, a settled purchase emits one
//! event toward the external notification collaborator (which handles
//! template formatting and delivery). The post is fire-and-forget: it runs
//! in a background task after the transaction commit, and no failure here
//! ever unwinds the financial write.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use reqwest::Client;
use serde::Serialize;

/// Retry delays in milliseconds. Quick retries only; the dispatcher is
/// best-effort and the commit has already happened.
const NOTIFY_RETRY_DELAYS: &[u64] = &[100, 200];

/// Purchase notification payload (owned version for async spawning).
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseNotification {
    pub user_id: String,
    pub course_id: String,
    /// Serves as the idempotency key for the receiving collaborator.
    pub transaction_id: String,
    pub booking_id: String,
    pub grand_total: i64,
    pub timestamp: i64,
}

/// Spawn a fire-and-forget purchase notification.
///
/// No-op when no dispatcher URL is configured. Panics in the spawned task
/// are logged rather than silently swallowed.
pub fn spawn_purchase_notification(
    client: Client,
    notify_url: Option<String>,
    event: PurchaseNotification,
) {
    if let Some(url) = notify_url {
        let transaction_id = event.transaction_id.clone();
        tokio::spawn(
            AssertUnwindSafe(async move {
                send_notification(&client, &url, &event).await;
            })
            .catch_unwind()
            .map(move |result| {
                if let Err(panic) = result {
                    let panic_msg = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(
                        "Notification task panicked for transaction '{}': {}",
                        transaction_id,
                        panic_msg
                    );
                }
            }),
        );
    }
}

async fn send_notification(client: &Client, url: &str, event: &PurchaseNotification) {
    let mut attempts = NOTIFY_RETRY_DELAYS.iter();
    loop {
        let result = client
            .post(url)
            .timeout(Duration::from_secs(5))
            .json(event)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(
                    "Purchase notification delivered for transaction {}",
                    event.transaction_id
                );
                return;
            }
            Ok(response) => {
                tracing::warn!(
                    "Purchase notification rejected ({}) for transaction {}",
                    response.status(),
                    event.transaction_id
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Purchase notification failed for transaction {}: {}",
                    event.transaction_id,
                    e
                );
            }
        }

        match attempts.next() {
            Some(delay_ms) => tokio::time::sleep(Duration::from_millis(*delay_ms)).await,
            None => {
                tracing::warn!(
                    "Giving up on purchase notification for transaction {}",
                    event.transaction_id
                );
                return;
            }
        }
    }
}
