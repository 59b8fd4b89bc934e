use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, OptionExt, Result};
use crate::pricing;

#[derive(Debug, Deserialize)]
pub struct ValidateDiscountRequest {
    pub discount_code: String,
    pub course_id: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateDiscountResponse {
    pub valid: bool,
    /// Discount amount the code would yield.
    pub amount: i64,
    /// Grand total after discount and admin fee.
    pub final_price: i64,
    pub message: String,
}

/// Advisory pre-checkout validation for the UI.
///
/// Purely informational: the authoritative evaluation happens again inside
/// checkout and once more at settlement, so nothing here is trusted later.
pub async fn validate_discount(
    State(state): State<AppState>,
    Json(request): Json<ValidateDiscountRequest>,
) -> Result<Json<ValidateDiscountResponse>> {
    let conn = state.db.get()?;

    let course = queries::get_course_by_id(&conn, &request.course_id)?
        .filter(|c| c.is_active)
        .or_not_found(msg::COURSE_NOT_FOUND)?;

    let full_price = pricing::quote(course.price, state.admin_fee, 0);

    let Some(discount) = queries::get_discount_by_code(&conn, &request.discount_code)? else {
        return Ok(Json(ValidateDiscountResponse {
            valid: false,
            amount: 0,
            final_price: full_price,
            message: msg::UNKNOWN_DISCOUNT_CODE.to_string(),
        }));
    };

    let now = chrono::Utc::now().timestamp();
    let eval = pricing::evaluate(&discount, course.price, now);

    if !eval.valid {
        let messages: Vec<&str> = eval.reasons.iter().map(|r| r.message()).collect();
        return Ok(Json(ValidateDiscountResponse {
            valid: false,
            amount: 0,
            final_price: full_price,
            message: messages.join("; "),
        }));
    }

    Ok(Json(ValidateDiscountResponse {
        valid: true,
        amount: eval.amount,
        final_price: pricing::quote(course.price, state.admin_fee, eval.amount),
        message: format!("Discount {} applied", discount.code),
    }))
}
