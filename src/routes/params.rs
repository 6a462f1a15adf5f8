use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{OrderStatus, SortOrder},
};

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

// Page fields are inlined rather than flattened: flattened numbers do not
// survive query-string decoding.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Display name of a lifecycle status, e.g. `Estimate Sent`.
    pub status: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }

    /// Parsed status filter; blank means no filter.
    pub fn status_filter(&self) -> AppResult<Option<OrderStatus>> {
        match self.status.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Ok(Some(s.parse()?)),
            _ => Ok(None),
        }
    }
}
