use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, OptionExt, Result};
use crate::gateways::{
    CreateSessionRequest, Gateway, MidtransClient, SessionHandle, TripayClient,
};
use crate::id::gen_order_reference;
use crate::models::{CreatePendingPayment, DiscountSnapshot};
use crate::pricing;

/// Checkout request from the UI layer. Authentication is handled upstream,
/// so the caller supplies the already-resolved user id.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub course_id: String,
    /// "midtrans" or "tripay".
    pub gateway: String,
    #[serde(default)]
    pub discount_code: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_reference: String,
    pub gateway: Gateway,
    /// Snap token for the hosted widget (Midtrans only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Hosted payment page URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_url: Option<String>,
    pub grand_total: i64,
}

/// Start a checkout: quote the price, persist the intent, mint a gateway
/// session.
///
/// The order reference is generated exactly once per attempt and the pending
/// row is written before the outbound call. If the gateway call fails the
/// row is removed again, so a retry from the caller starts clean - no
/// partial state, and never two pending rows for one logical checkout.
pub async fn initiate_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let gateway: Gateway = request
        .gateway
        .parse()
        .map_err(|_| AppError::BadRequest(msg::INVALID_GATEWAY.into()))?;

    let conn = state.db.get()?;

    let course = queries::get_course_by_id(&conn, &request.course_id)?
        .filter(|c| c.is_active)
        .or_not_found(msg::COURSE_NOT_FOUND)?;

    // Resolve the discount up front. An invalid code is a hard checkout
    // error with every failing condition reported, not a silent zero.
    let discount = match &request.discount_code {
        Some(code) => Some(
            queries::get_discount_by_code(&conn, code)?
                .ok_or_else(|| AppError::BadRequest(msg::UNKNOWN_DISCOUNT_CODE.into()))?,
        ),
        None => None,
    };

    let now = chrono::Utc::now().timestamp();
    let (discount_amount, discount_id, snapshot) = match &discount {
        Some(d) => {
            let eval = pricing::evaluate(d, course.price, now);
            if !eval.valid {
                let messages: Vec<&str> = eval.reasons.iter().map(|r| r.message()).collect();
                return Err(AppError::BadRequest(messages.join("; ")));
            }
            (eval.amount, Some(d.id.clone()), Some(DiscountSnapshot::of(d)))
        }
        None => (0, None, None),
    };

    let grand_total = pricing::quote(course.price, state.admin_fee, discount_amount);
    let order_reference = gen_order_reference();

    queries::create_pending_payment(
        &conn,
        &CreatePendingPayment {
            order_reference: order_reference.clone(),
            user_id: request.user_id.clone(),
            course_id: course.id.clone(),
            sub_total: course.price,
            admin_fee: state.admin_fee,
            discount_amount,
            discount_id,
            grand_total,
            gateway,
            discount_snapshot: snapshot,
        },
    )?;

    let session_request = CreateSessionRequest {
        order_reference: order_reference.clone(),
        amount: grand_total,
        item_name: course.name.clone(),
        user_id: request.user_id.clone(),
        course_id: course.id.clone(),
        customer_name: request.customer_name.clone(),
        customer_email: request.customer_email.clone(),
    };

    let session: Result<SessionHandle> = match gateway {
        Gateway::Midtrans => {
            MidtransClient::new(&state.midtrans)
                .create_snap_session(&session_request)
                .await
        }
        Gateway::Tripay => {
            TripayClient::new(&state.tripay)
                .create_transaction(&session_request)
                .await
        }
    };

    let handle = match session {
        Ok(handle) => handle,
        Err(e) => {
            // Roll the intent back so the caller can retry cleanly.
            if let Err(cleanup) = queries::delete_pending_payment(&conn, &order_reference) {
                tracing::error!(
                    order_reference = order_reference.as_str(),
                    "failed to remove pending payment after gateway error: {}",
                    cleanup
                );
            }
            return Err(e);
        }
    };

    queries::set_pending_session_token(&conn, &order_reference, &handle.gateway_reference)?;

    tracing::info!(
        gateway = gateway.as_str(),
        order_reference = order_reference.as_str(),
        grand_total,
        "checkout session created"
    );

    Ok(Json(CheckoutResponse {
        order_reference,
        gateway,
        token: handle.token,
        pay_url: handle.pay_url,
        grand_total,
    }))
}
