//! Transaction reconciliation.
//!
//! Consumes a verified gateway notification and produces at most one
//! transaction plus at most one discount-usage increment. One reconciliation
//! attempt walks received -> signature_checked -> payload_checked ->
//! amount_checked -> committed | rejected(reason); parsing and signature
//! verification happen in the webhook handlers (they own the raw body), and
//! every terminal state - including handler-side rejections - is reported
//! through the single structured event emitted here.

use rusqlite::TransactionBehavior;

use crate::db::{queries, AppState};
use crate::error::Result;
use crate::gateways::{Gateway, GatewayNotification, PaymentStatus};
use crate::models::{CreateTransaction, PendingStatus, Transaction};
use crate::notify::{spawn_purchase_notification, PurchaseNotification};
use crate::pricing;

/// Why a notification was rejected. Most of these are routine control flow;
/// only the two mismatch variants indicate something a human should look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Unparseable payload or a purchase kind we do not recognize.
    Unsupported,
    InvalidSignature,
    /// Non-final status; the gateway may deliver a final one later.
    StatusNotFinal,
    UnknownOrderReference,
    UnknownCourse,
    /// Declared identities differ from the checkout intent.
    PayloadMismatch,
    /// Paid amount differs from the recomputed expected total.
    AmountMismatch,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsupported => "unsupported",
            Self::InvalidSignature => "invalid_signature",
            Self::StatusNotFinal => "status_not_final",
            Self::UnknownOrderReference => "unknown_order_reference",
            Self::UnknownCourse => "unknown_course",
            Self::PayloadMismatch => "payload_mismatch",
            Self::AmountMismatch => "amount_mismatch",
        }
    }
}

#[derive(Debug)]
pub enum ReconcileOutcome {
    Committed {
        transaction: Transaction,
        /// Whether this call actually created the row. Duplicate deliveries
        /// observe `false` and cause no side effects.
        newly_created: bool,
    },
    Rejected(RejectReason),
}

/// Audit event for a terminal reconciliation state.
///
/// Mismatches log at error level because they are the fraud signal worth
/// alerting on; unknown references are data-integrity warnings; invalid
/// signatures are expected adversarial traffic; the rest is routine.
pub fn log_rejection(gateway: Gateway, order_reference: &str, reason: RejectReason) {
    match reason {
        RejectReason::AmountMismatch | RejectReason::PayloadMismatch => {
            tracing::error!(
                gateway = gateway.as_str(),
                order_reference,
                outcome = "rejected",
                reason = reason.as_str(),
                "payment notification rejected"
            );
        }
        RejectReason::UnknownOrderReference | RejectReason::UnknownCourse => {
            tracing::warn!(
                gateway = gateway.as_str(),
                order_reference,
                outcome = "rejected",
                reason = reason.as_str(),
                "payment notification rejected"
            );
        }
        RejectReason::InvalidSignature => {
            tracing::warn!(
                gateway = gateway.as_str(),
                order_reference,
                outcome = "rejected",
                reason = reason.as_str(),
                "payment notification rejected"
            );
        }
        _ => {
            tracing::info!(
                gateway = gateway.as_str(),
                order_reference,
                outcome = "rejected",
                reason = reason.as_str(),
                "payment notification ignored"
            );
        }
    }
}

fn log_committed(gateway: Gateway, order_reference: &str, transaction_id: &str, newly: bool) {
    tracing::info!(
        gateway = gateway.as_str(),
        order_reference,
        transaction_id,
        outcome = "committed",
        newly_created = newly,
        "payment notification settled"
    );
}

fn reject(note: &GatewayNotification, reason: RejectReason) -> Result<ReconcileOutcome> {
    log_rejection(note.gateway, &note.order_reference, reason);
    Ok(ReconcileOutcome::Rejected(reason))
}

/// Process one verified, parsed notification.
///
/// Safe to call any number of times for the same order reference, from any
/// number of processes: cross-request coordination happens entirely through
/// the storage layer's UNIQUE constraint and guarded increment.
pub fn process_notification(
    state: &AppState,
    note: &GatewayNotification,
) -> Result<ReconcileOutcome> {
    let mut conn = state.db.get()?;

    // Only final-success statuses proceed. Anything else is ignored, not an
    // error - the gateway may deliver a final status later.
    match note.status {
        PaymentStatus::Settled => {}
        PaymentStatus::Pending | PaymentStatus::Failed => {
            return reject(note, RejectReason::StatusNotFinal);
        }
    }

    // Idempotency short-circuit: a transaction for this booking already
    // exists, so this is a duplicate delivery. Return it unchanged; at most
    // tidy up a pending row the committing call didn't get to.
    if let Some(existing) = queries::get_transaction_by_booking_id(&conn, &note.order_reference)? {
        if let Some(pending) = queries::get_pending_payment(&conn, &note.order_reference)? {
            if pending.status == PendingStatus::Pending {
                queries::mark_pending_status(&conn, &note.order_reference, PendingStatus::Completed)?;
            }
        }
        log_committed(note.gateway, &note.order_reference, &existing.id, false);
        return Ok(ReconcileOutcome::Committed {
            transaction: existing,
            newly_created: false,
        });
    }

    let Some(pending) = queries::get_pending_payment(&conn, &note.order_reference)? else {
        return reject(note, RejectReason::UnknownOrderReference);
    };

    // Compare the identities the gateway echoes back (when it carries any)
    // against the checkout intent. A client that swapped user or course
    // between checkout and payment gets flagged, not settled.
    let user_mismatch = note
        .user_id
        .as_ref()
        .is_some_and(|claimed| *claimed != pending.user_id);
    let course_mismatch = note
        .course_id
        .as_ref()
        .is_some_and(|claimed| *claimed != pending.course_id);
    if user_mismatch || course_mismatch {
        queries::mark_pending_status(
            &conn,
            &note.order_reference,
            PendingStatus::FlaggedPayloadMismatch,
        )?;
        return reject(note, RejectReason::PayloadMismatch);
    }

    let Some(course) = queries::get_course_by_id(&conn, &pending.course_id)? else {
        return reject(note, RejectReason::UnknownCourse);
    };

    // Recompute the expected total from the course's current price. The
    // discount amount comes from the frozen snapshot (what was actually
    // quoted), but only if the live discount is still honorable - a code
    // that expired or ran out between checkout and payment yields zero,
    // which turns an underpaying notification into an amount mismatch.
    let now = chrono::Utc::now().timestamp();
    let expected_discount = match (&pending.discount_id, &pending.discount_snapshot) {
        (Some(discount_id), snapshot) => {
            let still_valid = queries::get_discount_by_id(&conn, discount_id)?
                .map(|live| pricing::evaluate(&live, course.price, now).valid)
                .unwrap_or(false);
            if still_valid {
                match snapshot {
                    Some(snap) => snap.amount_for(course.price),
                    None => pending.discount_amount,
                }
            } else {
                0
            }
        }
        (None, Some(snap)) => snap.amount_for(course.price),
        (None, None) => pending.discount_amount,
    };
    let expected_total = pricing::quote(course.price, pending.admin_fee, expected_discount);

    if note.paid_amount != expected_total {
        queries::mark_pending_status(
            &conn,
            &note.order_reference,
            PendingStatus::FlaggedAmountMismatch,
        )?;
        tracing::error!(
            gateway = note.gateway.as_str(),
            order_reference = note.order_reference.as_str(),
            paid_amount = note.paid_amount,
            expected_total,
            "paid amount does not match expected total"
        );
        return reject(note, RejectReason::AmountMismatch);
    }

    // Commit. One SQL transaction covers the insert, the usage increment,
    // and the pending cleanup, so a crash mid-commit leaves either nothing
    // or everything. The ON CONFLICT insert decides which concurrent caller
    // is "the creator"; only that caller consumes a discount use.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let (transaction, newly_created) = queries::create_or_get_transaction(
        &tx,
        &CreateTransaction {
            booking_id: note.order_reference.clone(),
            user_id: pending.user_id.clone(),
            course_id: pending.course_id.clone(),
            sub_total: course.price,
            admin_fee: pending.admin_fee,
            discount_amount: expected_discount,
            discount_id: pending.discount_id.clone(),
            grand_total: note.paid_amount,
            payment_type: note.gateway.as_str().to_string(),
        },
    )?;
    if newly_created {
        if let Some(discount_id) = &pending.discount_id {
            if expected_discount > 0 && !queries::increment_discount_usage(&tx, discount_id)? {
                // The guard hit the limit between our validity check and
                // here. The invariant used_count <= usage_limit holds; the
                // quoted price was honored, so the sale still stands.
                tracing::warn!(
                    discount_id = discount_id.as_str(),
                    order_reference = note.order_reference.as_str(),
                    "discount exhausted at commit time; usage not incremented"
                );
            }
        }
        queries::delete_pending_payment(&tx, &note.order_reference)?;
    }
    tx.commit()?;

    if newly_created {
        spawn_purchase_notification(
            state.http.clone(),
            state.notify_url.clone(),
            PurchaseNotification {
                user_id: transaction.user_id.clone(),
                course_id: transaction.course_id.clone(),
                transaction_id: transaction.id.clone(),
                booking_id: transaction.booking_id.clone(),
                grand_total: transaction.grand_total,
                timestamp: now,
            },
        );
    }

    log_committed(note.gateway, &note.order_reference, &transaction.id, newly_created);
    Ok(ReconcileOutcome::Committed {
        transaction,
        newly_created,
    })
}
