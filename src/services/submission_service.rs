use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    dto::orders::SubmitOrderResponse,
    error::{AppError, AppResult},
    files::MAX_FILES_PER_ORDER,
    lifecycle::Transition,
    models::{NewOrder, Order},
    notify::OrderReceivedNotice,
    order_code::{MAX_CODE_ATTEMPTS, generate_order_code},
    state::AppState,
    validation::{OrderDraft, truncate_chars, validate_submission},
};

pub async fn submit_order(state: &AppState, payload: Value) -> AppResult<SubmitOrderResponse> {
    submit_order_at(state, payload, Utc::now()).await
}

/// Validate, rate-limit, persist, then notify. Nothing is written when
/// validation or the rate limit rejects the submission.
pub async fn submit_order_at(
    state: &AppState,
    payload: Value,
    now: DateTime<Utc>,
) -> AppResult<SubmitOrderResponse> {
    let draft = validate_submission(&payload)?;

    state
        .rate_limiter()
        .check_and_record(draft.customer_email(), now)
        .await?;

    let order = insert_with_fresh_code(state, &draft, now).await?;
    info!(order_code = %order.order_code, request_type = %order.request_type, "order submitted");

    let notice = OrderReceivedNotice {
        order_id: order.id,
        order_code: order.order_code.clone(),
        customer_email: order.customer_email.clone(),
        customer_name: order.fields.customer_name.clone(),
        request_type: order.request_type,
        filenames: announced_filenames(&payload),
    };
    if let Err(err) = state.notifier.order_received(&notice).await {
        warn!(error = %err, order_code = %order.order_code, "order confirmation failed");
    }

    Ok(SubmitOrderResponse {
        success: true,
        order_id: order.id,
        order_code: order.order_code,
    })
}

async fn insert_with_fresh_code(
    state: &AppState,
    draft: &OrderDraft,
    now: DateTime<Utc>,
) -> AppResult<Order> {
    let request_type = draft.request_type();
    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let new = NewOrder {
            order_code: generate_order_code(now),
            request_type,
            status: Transition::Created(request_type).target(),
            customer_email: draft.customer_email().to_string(),
            fields: draft.to_fields(),
        };
        match state.orders.insert_order(new).await {
            Err(AppError::DuplicateOrderCode) => {
                warn!(attempt, "order code collision, retrying");
            }
            other => return other,
        }
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "could not allocate a unique order code after {MAX_CODE_ATTEMPTS} attempts"
    )))
}

/// Names of files the client is about to upload, listed in the confirmation.
fn announced_filenames(payload: &Value) -> Vec<String> {
    payload
        .get("filenames")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .take(MAX_FILES_PER_ORDER)
                .map(|name| truncate_chars(name, 255))
                .collect()
        })
        .unwrap_or_default()
}
