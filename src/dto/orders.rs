use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Message, Order, OrderFile, Quote};

/// Submission outcome, flat so the form can read `orderCode` directly.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderResponse {
    pub success: bool,
    pub order_id: Uuid,
    pub order_code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

/// Everything the status portal shows for one order.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    pub files: Vec<OrderFile>,
    pub quotes: Vec<Quote>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PostMessageRequest {
    pub body: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateOrderDetailsRequest {
    pub quantity: Option<String>,
    pub needed_by: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// Display name of the target status, e.g. `In Production`.
    pub status: String,
}
