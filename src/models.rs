use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

pub use crate::lifecycle::OrderStatus;

/// Listing order by creation time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum RequestType {
    Estimate,
    Reorder,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Estimate => "Estimate",
            RequestType::Reorder => "Reorder",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Estimate" => Ok(RequestType::Estimate),
            "Reorder" => Ok(RequestType::Reorder),
            _ => Err(AppError::InvalidInput("Invalid request type".into())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Pending,
    Accepted,
    Superseded,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Superseded => "superseded",
        }
    }
}

impl FromStr for QuoteStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QuoteStatus::Pending),
            "accepted" => Ok(QuoteStatus::Accepted),
            // older rows used "rejected" for quotes replaced by a newer one
            "superseded" | "rejected" => Ok(QuoteStatus::Superseded),
            _ => Err(AppError::InvalidInput("Invalid quote status".into())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Customer,
    Team,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::Customer => "customer",
            SenderType::Team => "team",
        }
    }
}

impl FromStr for SenderType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(SenderType::Customer),
            "team" => Ok(SenderType::Team),
            _ => Err(AppError::InvalidInput("Invalid sender type".into())),
        }
    }
}

/// Every optional, request-type dependent column of an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderFields {
    pub customer_name: Option<String>,
    pub company: Option<String>,
    pub customer_phone: Option<String>,
    pub offering: Option<String>,
    pub material: Option<String>,
    pub thickness: Option<String>,
    pub custom_thickness: Option<String>,
    pub quantity: Option<String>,
    pub finish: Option<String>,
    pub material_sourcing: Option<String>,
    pub material_spec_details: Option<String>,
    pub addons: Vec<String>,
    pub callback_requested: bool,
    pub preferred_method: Option<String>,
    pub best_time: Option<String>,
    pub part_id: Option<String>,
    pub revision: Option<String>,
    pub needed_by: Option<String>,
    pub delivery_method: Option<String>,
    pub delivery_zip: Option<String>,
    pub file_link: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub order_code: String,
    pub request_type: RequestType,
    pub status: OrderStatus,
    pub customer_email: String,
    #[serde(flatten)]
    pub fields: OrderFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_code: String,
    pub request_type: RequestType,
    pub status: OrderStatus,
    pub customer_email: String,
    pub fields: OrderFields,
}

/// Customer-editable subset of an order. `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct OrderDetailsPatch {
    pub quantity: Option<String>,
    pub needed_by: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderFile {
    pub id: Uuid,
    pub order_id: Uuid,
    pub filename: String,
    pub storage_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrderFile {
    pub order_id: Uuid,
    pub filename: String,
    pub storage_path: String,
    pub content_type: String,
    pub size_bytes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Quote {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount_cents: i64,
    pub description: Option<String>,
    pub valid_until: Option<NaiveDate>,
    pub status: QuoteStatus,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewQuote {
    pub order_id: Uuid,
    pub amount_cents: i64,
    pub description: Option<String>,
    pub valid_until: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub order_id: Uuid,
    pub sender_type: SenderType,
    pub sender_email: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub order_id: Uuid,
    pub sender_type: SenderType,
    pub sender_email: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub identifier: String,
    pub submission_count: i32,
    pub window_start: DateTime<Utc>,
}
