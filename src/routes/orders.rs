use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    routing::{get, post},
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    dto::{
        orders::{
            OrderDetail, OrderList, PostMessageRequest, SubmitOrderResponse,
            UpdateOrderDetailsRequest,
        },
        quotes::QuoteWithOrder,
    },
    error::{AppError, AppResult},
    middleware::auth::CallerIdentity,
    models::{Message, Order},
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{order_service, quote_service, submission_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_order).get(list_orders))
        .route("/{id}", get(get_order).patch(update_order_details))
        .route("/{id}/messages", post(post_message))
        .route("/{id}/quotes/{quote_id}/accept", post(accept_quote))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    responses(
        (status = 200, description = "Order created", body = SubmitOrderResponse),
        (status = 400, description = "Validation failed"),
        (status = 429, description = "Too many submissions"),
        (status = 500, description = "Internal Server Error"),
    ),
    tag = "Orders"
)]
pub async fn submit_order(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<SubmitOrderResponse>> {
    let Json(payload) =
        payload.map_err(|_| AppError::InvalidInput("Invalid request body".into()))?;
    let resp = submission_service::submit_order(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Orders visible to the caller", body = ApiResponse<OrderList>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &caller, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with files, quotes and messages", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let resp = order_service::get_order_detail(&state, &caller, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderDetailsRequest,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<Order>),
        (status = 400, description = "Order no longer editable"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order_details(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderDetailsRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::update_order_details(&state, &caller, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/messages",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = PostMessageRequest,
    responses(
        (status = 200, description = "Message appended", body = ApiResponse<Message>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn post_message(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostMessageRequest>,
) -> AppResult<Json<ApiResponse<Message>>> {
    let resp = order_service::post_message(&state, &caller, id, &payload.body).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/quotes/{quote_id}/accept",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("quote_id" = Uuid, Path, description = "Quote ID")
    ),
    responses(
        (status = 200, description = "Quote accepted and paid", body = ApiResponse<QuoteWithOrder>),
        (status = 400, description = "Quote is not open for acceptance"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn accept_quote(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, quote_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<QuoteWithOrder>>> {
    let resp = quote_service::accept_quote(&state, &caller, id, quote_id).await?;
    Ok(Json(resp))
}
