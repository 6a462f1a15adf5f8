//! In-process store with optional fault injection.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Message, NewMessage, NewOrder, NewOrderFile, NewQuote, Order, OrderDetailsPatch,
        OrderFile, OrderStatus, Quote, QuoteStatus, RateLimitRecord, SortOrder,
    },
    lifecycle::quote_acceptable,
    payments::PaymentProcessor,
    store::{
        FileRepository, MessageRepository, OrderFilter, OrderRepository, QuoteRepository,
        RateLimitRepository, quote_not_open,
    },
};

#[derive(Default)]
struct Tables {
    orders: Vec<Order>,
    files: Vec<OrderFile>,
    quotes: Vec<Quote>,
    messages: Vec<Message>,
    rate_limits: HashMap<String, RateLimitRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_file_insert: AtomicBool,
    forced_code_collisions: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `insert_file` fail as if the metadata write was rejected.
    pub fn fail_next_file_insert(&self) {
        self.fail_file_insert.store(true, Ordering::SeqCst);
    }

    /// Make the next `n` order inserts report an order code collision.
    pub fn force_code_collisions(&self, n: usize) {
        self.forced_code_collisions.store(n, Ordering::SeqCst);
    }

    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    pub async fn rate_limit_count(&self) -> usize {
        self.tables.lock().await.rate_limits.len()
    }
}

fn touch(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous)
}

fn set_status(tables: &mut Tables, id: Uuid, status: OrderStatus) -> Option<Order> {
    let order = tables.orders.iter_mut().find(|o| o.id == id)?;
    order.status = status;
    order.updated_at = touch(order.updated_at);
    Some(order.clone())
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert_order(&self, new: NewOrder) -> AppResult<Order> {
        let forced = self
            .forced_code_collisions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if forced.is_ok() {
            return Err(AppError::DuplicateOrderCode);
        }

        let mut tables = self.tables.lock().await;
        if tables.orders.iter().any(|o| o.order_code == new.order_code) {
            return Err(AppError::DuplicateOrderCode);
        }
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            order_code: new.order_code,
            request_type: new.request_type,
            status: new.status,
            customer_email: new.customer_email,
            fields: new.fields,
            created_at: now,
            updated_at: now,
        };
        tables.orders.push(order.clone());
        Ok(order)
    }

    async fn find_order(&self, id: Uuid) -> AppResult<Option<Order>> {
        let tables = self.tables.lock().await;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders(&self, filter: OrderFilter) -> AppResult<(Vec<Order>, i64)> {
        let tables = self.tables.lock().await;
        let mut matched: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| {
                filter
                    .customer_email
                    .as_ref()
                    .is_none_or(|email| &o.customer_email == email)
            })
            .filter(|o| filter.status.is_none_or(|status| o.status == status))
            .cloned()
            .collect();
        matched.sort_by_key(|o| o.created_at);
        if matches!(filter.sort_order, SortOrder::Desc) {
            matched.reverse();
        }
        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> AppResult<Option<Order>> {
        let mut tables = self.tables.lock().await;
        Ok(set_status(&mut tables, id, status))
    }

    async fn update_order_details(
        &self,
        id: Uuid,
        patch: OrderDetailsPatch,
    ) -> AppResult<Option<Order>> {
        let mut tables = self.tables.lock().await;
        let Some(order) = tables.orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        if let Some(quantity) = patch.quantity {
            order.fields.quantity = Some(quantity);
        }
        if let Some(needed_by) = patch.needed_by {
            order.fields.needed_by = Some(needed_by);
        }
        if let Some(notes) = patch.notes {
            order.fields.notes = Some(notes);
        }
        order.updated_at = touch(order.updated_at);
        Ok(Some(order.clone()))
    }
}

#[async_trait]
impl FileRepository for MemoryStore {
    async fn count_files(&self, order_id: Uuid) -> AppResult<usize> {
        let tables = self.tables.lock().await;
        Ok(tables.files.iter().filter(|f| f.order_id == order_id).count())
    }

    async fn insert_file(&self, new: NewOrderFile) -> AppResult<OrderFile> {
        if self.fail_file_insert.swap(false, Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!(
                "injected order_files insert failure"
            )));
        }
        let mut tables = self.tables.lock().await;
        let file = OrderFile {
            id: Uuid::new_v4(),
            order_id: new.order_id,
            filename: new.filename,
            storage_path: new.storage_path,
            content_type: new.content_type,
            size_bytes: new.size_bytes,
            created_at: Utc::now(),
        };
        tables.files.push(file.clone());
        Ok(file)
    }

    async fn list_files(&self, order_id: Uuid) -> AppResult<Vec<OrderFile>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .files
            .iter()
            .filter(|f| f.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn find_file_by_path(&self, storage_path: &str) -> AppResult<Option<OrderFile>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .files
            .iter()
            .find(|f| f.storage_path == storage_path)
            .cloned())
    }
}

#[async_trait]
impl QuoteRepository for MemoryStore {
    async fn list_quotes(&self, order_id: Uuid) -> AppResult<Vec<Quote>> {
        let tables = self.tables.lock().await;
        let mut quotes: Vec<Quote> = tables
            .quotes
            .iter()
            .filter(|q| q.order_id == order_id)
            .cloned()
            .collect();
        quotes.reverse();
        Ok(quotes)
    }

    async fn find_quote(&self, id: Uuid) -> AppResult<Option<Quote>> {
        let tables = self.tables.lock().await;
        Ok(tables.quotes.iter().find(|q| q.id == id).cloned())
    }

    async fn issue_quote(
        &self,
        new: NewQuote,
        order_status: OrderStatus,
    ) -> AppResult<(Quote, Order)> {
        let mut tables = self.tables.lock().await;
        if !tables.orders.iter().any(|o| o.id == new.order_id) {
            return Err(AppError::NotFound);
        }
        let now = Utc::now();
        for quote in tables
            .quotes
            .iter_mut()
            .filter(|q| q.order_id == new.order_id && q.status == QuoteStatus::Pending)
        {
            quote.status = QuoteStatus::Superseded;
            quote.updated_at = touch(quote.updated_at);
        }
        let quote = Quote {
            id: Uuid::new_v4(),
            order_id: new.order_id,
            amount_cents: new.amount_cents,
            description: new.description,
            valid_until: new.valid_until,
            status: QuoteStatus::Pending,
            payment_reference: None,
            created_at: now,
            updated_at: now,
        };
        tables.quotes.push(quote.clone());
        let order = set_status(&mut tables, new.order_id, order_status).ok_or(AppError::NotFound)?;
        Ok((quote, order))
    }

    async fn accept_quote(
        &self,
        quote_id: Uuid,
        payments: &dyn PaymentProcessor,
        order_status: OrderStatus,
    ) -> AppResult<(Quote, Order)> {
        // held across the charge, like the row locks in the database store
        let mut tables = self.tables.lock().await;
        let (order_id, amount_cents, current_quote) = tables
            .quotes
            .iter()
            .find(|q| q.id == quote_id)
            .map(|q| (q.order_id, q.amount_cents, q.status))
            .ok_or(AppError::NotFound)?;
        let current_order = tables
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .map(|o| o.status)
            .ok_or(AppError::NotFound)?;
        if !quote_acceptable(current_order, current_quote) {
            return Err(quote_not_open());
        }

        let receipt = payments.charge(quote_id, amount_cents).await?;

        let quote = tables
            .quotes
            .iter_mut()
            .find(|q| q.id == quote_id)
            .ok_or(AppError::NotFound)?;
        quote.status = QuoteStatus::Accepted;
        quote.payment_reference = Some(receipt.reference);
        quote.updated_at = touch(quote.updated_at);
        let quote = quote.clone();
        let order = set_status(&mut tables, quote.order_id, order_status).ok_or(AppError::NotFound)?;
        Ok((quote, order))
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn append_message(&self, new: NewMessage) -> AppResult<Message> {
        let mut tables = self.tables.lock().await;
        let message = Message {
            id: Uuid::new_v4(),
            order_id: new.order_id,
            sender_type: new.sender_type,
            sender_email: new.sender_email,
            body: new.body,
            created_at: Utc::now(),
        };
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, order_id: Uuid) -> AppResult<Vec<Message>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.order_id == order_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RateLimitRepository for MemoryStore {
    async fn find_rate_limit(&self, identifier: &str) -> AppResult<Option<RateLimitRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.rate_limits.get(identifier).cloned())
    }

    async fn save_rate_limit(&self, record: RateLimitRecord) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        tables.rate_limits.insert(record.identifier.clone(), record);
        Ok(())
    }
}
