use tracing::info;
use uuid::Uuid;

use crate::{
    dto::quotes::{IssueQuoteRequest, QuoteWithOrder},
    error::{AppError, AppResult},
    gateway::authorize_order,
    lifecycle::{Transition, quote_acceptable},
    middleware::auth::{CallerIdentity, ensure_admin},
    models::NewQuote,
    response::{ApiResponse, Meta},
    state::AppState,
    store::quote_not_open,
    validation::truncate_chars,
};

const MAX_QUOTE_DESCRIPTION_LEN: usize = 2000;

/// Attach a pending quote to an order. Earlier pending quotes are superseded
/// and the order moves to Estimate Sent whatever its current status.
pub async fn issue_quote(
    state: &AppState,
    caller: &CallerIdentity,
    order_id: Uuid,
    payload: IssueQuoteRequest,
) -> AppResult<ApiResponse<QuoteWithOrder>> {
    ensure_admin(caller)?;
    if payload.amount_cents <= 0 {
        return Err(AppError::InvalidInput(
            "Quote amount must be greater than zero".into(),
        ));
    }
    let order = state
        .orders
        .find_order(order_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let description = payload
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| truncate_chars(d, MAX_QUOTE_DESCRIPTION_LEN));

    let (quote, order) = state
        .quotes
        .issue_quote(
            NewQuote {
                order_id: order.id,
                amount_cents: payload.amount_cents,
                description,
                valid_until: payload.valid_until,
            },
            Transition::QuoteIssued.target(),
        )
        .await?;

    info!(
        order_code = %order.order_code,
        quote_id = %quote.id,
        amount_cents = quote.amount_cents,
        "quote issued"
    );
    Ok(ApiResponse::success(
        "Quote issued",
        QuoteWithOrder { quote, order },
        Some(Meta::empty()),
    ))
}

/// Accept a pending quote and take payment. This is the only path that marks
/// a quote accepted or moves an order to Payment Received.
pub async fn accept_quote(
    state: &AppState,
    caller: &CallerIdentity,
    order_id: Uuid,
    quote_id: Uuid,
) -> AppResult<ApiResponse<QuoteWithOrder>> {
    let order = authorize_order(state.orders.as_ref(), caller, order_id).await?;
    let quote = state
        .quotes
        .find_quote(quote_id)
        .await?
        .filter(|q| q.order_id == order.id)
        .ok_or(AppError::NotFound)?;

    if !quote_acceptable(order.status, quote.status) {
        return Err(quote_not_open());
    }

    // the store re-checks and charges while holding the quote and order
    let (quote, order) = state
        .quotes
        .accept_quote(
            quote.id,
            state.payments.as_ref(),
            Transition::QuoteAccepted.target(),
        )
        .await?;

    info!(order_code = %order.order_code, quote_id = %quote.id, "quote accepted");
    Ok(ApiResponse::success(
        "Quote accepted",
        QuoteWithOrder { quote, order },
        Some(Meta::empty()),
    ))
}
