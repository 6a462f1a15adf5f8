use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        orders::{OrderList, UpdateOrderStatusRequest},
        quotes::{IssueQuoteRequest, QuoteWithOrder},
    },
    error::AppResult,
    middleware::auth::CallerIdentity,
    models::Order,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{admin_service, quote_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_all_orders))
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/orders/{id}/quotes", post(issue_quote))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
    (status = 200, description = "Get all orders (admin only)", body = ApiResponse<OrderList>),
    (status = 403, description = "Forbidden"),
    (status = 500, description = "Internal Server Error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::list_all_orders(&state, &caller, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
    (status = 200, description = "Update order status (admin only)", body = ApiResponse<Order>),
    (status = 400, description = "Invalid order status"),
    (status = 403, description = "Forbidden"),
    (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = admin_service::update_order_status(&state, &caller, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/orders/{id}/quotes",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = IssueQuoteRequest,
    responses(
    (status = 200, description = "Quote issued, order moved to Estimate Sent", body = ApiResponse<QuoteWithOrder>),
    (status = 400, description = "Invalid amount"),
    (status = 403, description = "Forbidden"),
    (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn issue_quote(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    Json(payload): Json<IssueQuoteRequest>,
) -> AppResult<Json<ApiResponse<QuoteWithOrder>>> {
    let resp = quote_service::issue_quote(&state, &caller, id, payload).await?;
    Ok(Json(resp))
}
