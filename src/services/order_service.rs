use tracing::info;
use uuid::Uuid;

use crate::{
    dto::orders::{OrderDetail, OrderList, UpdateOrderDetailsRequest},
    error::{AppError, AppResult},
    gateway::authorize_order,
    middleware::auth::CallerIdentity,
    models::{Message, NewMessage, Order, SenderType},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    state::AppState,
    store::OrderFilter,
    validation::sanitize_details_patch,
};

pub const MAX_MESSAGE_LEN: usize = 5000;

/// Orders visible to the caller: their own, or all of them for admins.
pub async fn list_orders(
    state: &AppState,
    caller: &CallerIdentity,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let filter = OrderFilter {
        customer_email: (!caller.is_admin()).then(|| caller.email.clone()),
        status: query.status_filter()?,
        sort_order: query.sort_order.unwrap_or_default(),
        limit: limit as u64,
        offset: offset as u64,
    };

    let (orders, total) = state.orders.list_orders(filter).await?;
    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order_detail(
    state: &AppState,
    caller: &CallerIdentity,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    let order = authorize_order(state.orders.as_ref(), caller, id).await?;
    let files = state.files.list_files(order.id).await?;
    let quotes = state.quotes.list_quotes(order.id).await?;
    let messages = state.messages.list_messages(order.id).await?;

    Ok(ApiResponse::success(
        "OK",
        OrderDetail {
            order,
            files,
            quotes,
            messages,
        },
        Some(Meta::empty()),
    ))
}

pub async fn post_message(
    state: &AppState,
    caller: &CallerIdentity,
    id: Uuid,
    body: &str,
) -> AppResult<ApiResponse<Message>> {
    let order = authorize_order(state.orders.as_ref(), caller, id).await?;

    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::InvalidInput("Message is required".into()));
    }
    if body.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::InvalidInput("Message too long".into()));
    }

    let sender_type = if caller.is_admin() {
        SenderType::Team
    } else {
        SenderType::Customer
    };
    let message = state
        .messages
        .append_message(NewMessage {
            order_id: order.id,
            sender_type,
            sender_email: caller.email.clone(),
            body: body.to_string(),
        })
        .await?;

    Ok(ApiResponse::success("Message posted", message, Some(Meta::empty())))
}

/// Customers may amend quantity, needed-by and notes until the order is paid.
pub async fn update_order_details(
    state: &AppState,
    caller: &CallerIdentity,
    id: Uuid,
    payload: UpdateOrderDetailsRequest,
) -> AppResult<ApiResponse<Order>> {
    let order = authorize_order(state.orders.as_ref(), caller, id).await?;
    if !order.status.accepts_customer_edits() {
        return Err(AppError::InvalidInput(format!(
            "Order can no longer be edited in status {}",
            order.status
        )));
    }

    let patch = sanitize_details_patch(
        payload.quantity.as_deref(),
        payload.needed_by.as_deref(),
        payload.notes.as_deref(),
    );
    let updated = state
        .orders
        .update_order_details(order.id, patch)
        .await?
        .ok_or(AppError::NotFound)?;

    info!(order_code = %updated.order_code, "order details updated");
    Ok(ApiResponse::success("Order updated", updated, Some(Meta::empty())))
}
