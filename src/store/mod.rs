//! Persistence seams. Services only talk to these traits; `db` backs them with
//! Postgres and `memory` with in-process maps for tests and local runs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Message, NewMessage, NewOrder, NewOrderFile, NewQuote, Order, OrderDetailsPatch,
        OrderFile, OrderStatus, Quote, RateLimitRecord, SortOrder,
    },
    payments::PaymentProcessor,
};

pub mod db;
pub mod memory;

/// Which orders a listing may see and how to page through them.
#[derive(Debug, Clone)]
pub struct OrderFilter {
    /// `None` lists every order (admin scope).
    pub customer_email: Option<String>,
    pub status: Option<OrderStatus>,
    pub sort_order: SortOrder,
    pub limit: u64,
    pub offset: u64,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a new order. A taken `order_code` yields `AppError::DuplicateOrderCode`.
    async fn insert_order(&self, order: NewOrder) -> AppResult<Order>;
    async fn find_order(&self, id: Uuid) -> AppResult<Option<Order>>;
    async fn list_orders(&self, filter: OrderFilter) -> AppResult<(Vec<Order>, i64)>;
    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> AppResult<Option<Order>>;
    async fn update_order_details(
        &self,
        id: Uuid,
        patch: OrderDetailsPatch,
    ) -> AppResult<Option<Order>>;
}

#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn count_files(&self, order_id: Uuid) -> AppResult<usize>;
    async fn insert_file(&self, file: NewOrderFile) -> AppResult<OrderFile>;
    async fn list_files(&self, order_id: Uuid) -> AppResult<Vec<OrderFile>>;
    async fn find_file_by_path(&self, storage_path: &str) -> AppResult<Option<OrderFile>>;
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    /// Newest first.
    async fn list_quotes(&self, order_id: Uuid) -> AppResult<Vec<Quote>>;
    async fn find_quote(&self, id: Uuid) -> AppResult<Option<Quote>>;
    /// Insert a pending quote, supersede older pending quotes on the order and
    /// set the order to `order_status`, atomically.
    async fn issue_quote(&self, quote: NewQuote, order_status: OrderStatus)
    -> AppResult<(Quote, Order)>;
    /// Lock the quote and its order, re-check that the quote is still open,
    /// charge it, then mark it accepted and set the order to `order_status`.
    /// Nothing is charged when the re-check fails, and a failed charge
    /// changes nothing.
    async fn accept_quote(
        &self,
        quote_id: Uuid,
        payments: &dyn PaymentProcessor,
        order_status: OrderStatus,
    ) -> AppResult<(Quote, Order)>;
}

pub(crate) fn quote_not_open() -> AppError {
    AppError::InvalidInput("Quote is not open for acceptance".into())
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn append_message(&self, message: NewMessage) -> AppResult<Message>;
    /// Oldest first.
    async fn list_messages(&self, order_id: Uuid) -> AppResult<Vec<Message>>;
}

#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    async fn find_rate_limit(&self, identifier: &str) -> AppResult<Option<RateLimitRecord>>;
    async fn save_rate_limit(&self, record: RateLimitRecord) -> AppResult<()>;
}

/// A backend that provides every repository.
pub trait Store:
    OrderRepository + FileRepository + QuoteRepository + MessageRepository + RateLimitRepository
{
}

impl<T> Store for T where
    T: OrderRepository + FileRepository + QuoteRepository + MessageRepository + RateLimitRepository
{
}
