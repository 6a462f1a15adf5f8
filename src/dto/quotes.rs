use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Order, Quote};

#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueQuoteRequest {
    pub amount_cents: i64,
    pub description: Option<String>,
    pub valid_until: Option<NaiveDate>,
}

/// A quote together with the order state it produced.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuoteWithOrder {
    pub quote: Quote,
    pub order: Order,
}
