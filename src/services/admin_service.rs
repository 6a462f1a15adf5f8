use tracing::info;
use uuid::Uuid;

use crate::{
    dto::orders::{OrderList, UpdateOrderStatusRequest},
    error::{AppError, AppResult},
    lifecycle::Transition,
    middleware::auth::{CallerIdentity, ensure_admin},
    models::{Order, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    caller: &CallerIdentity,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(caller)?;
    order_service::list_orders(state, caller, query).await
}

/// Plain status write. Quotes are never touched here.
pub async fn update_order_status(
    state: &AppState,
    caller: &CallerIdentity,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(caller)?;
    let status: OrderStatus = payload.status.trim().parse()?;
    let transition = Transition::AdminSet(status);

    let order = state
        .orders
        .set_order_status(id, transition.target())
        .await?
        .ok_or(AppError::NotFound)?;

    info!(order_code = %order.order_code, status = %order.status, "order status changed");
    Ok(ApiResponse::success("Order updated", order, Some(Meta::empty())))
}
