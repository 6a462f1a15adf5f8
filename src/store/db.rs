//! Postgres-backed repositories: SeaORM for the order tables, sqlx for the
//! rate limit upsert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, SqlErr, TransactionTrait,
};
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Expr, LockType};
use tracing::error;
use uuid::Uuid;

use crate::{
    db::{DbPool, OrmConn},
    entity::{
        order_files::{ActiveModel as FileActive, Column as FileCol, Entity as OrderFiles, Model as FileModel},
        order_messages::{ActiveModel as MessageActive, Column as MessageCol, Entity as OrderMessages, Model as MessageModel},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        quotes::{ActiveModel as QuoteActive, Column as QuoteCol, Entity as Quotes, Model as QuoteModel},
    },
    error::{AppError, AppResult},
    models::{
        Message, NewMessage, NewOrder, NewOrderFile, NewQuote, Order, OrderDetailsPatch,
        OrderFields, OrderFile, OrderStatus, Quote, QuoteStatus, RateLimitRecord, RequestType,
        SenderType, SortOrder,
    },
    lifecycle::quote_acceptable,
    payments::PaymentProcessor,
    store::{
        FileRepository, MessageRepository, OrderFilter, OrderRepository, QuoteRepository,
        RateLimitRepository, quote_not_open,
    },
};

#[derive(Clone)]
pub struct DbStore {
    pub pool: DbPool,
    pub orm: OrmConn,
}

impl DbStore {
    pub fn new(pool: DbPool, orm: OrmConn) -> Self {
        Self { pool, orm }
    }
}

#[async_trait]
impl OrderRepository for DbStore {
    async fn insert_order(&self, new: NewOrder) -> AppResult<Order> {
        let now = Utc::now();
        let NewOrder {
            order_code,
            request_type,
            status,
            customer_email,
            fields,
        } = new;
        let addons = if fields.addons.is_empty() {
            None
        } else {
            Some(serde_json::json!(fields.addons))
        };

        let inserted = OrderActive {
            id: Set(Uuid::new_v4()),
            order_code: Set(order_code),
            request_type: Set(request_type.as_str().to_string()),
            status: Set(status.as_str().to_string()),
            customer_email: Set(customer_email),
            customer_name: Set(fields.customer_name),
            company: Set(fields.company),
            customer_phone: Set(fields.customer_phone),
            offering: Set(fields.offering),
            material: Set(fields.material),
            thickness: Set(fields.thickness),
            custom_thickness: Set(fields.custom_thickness),
            quantity: Set(fields.quantity),
            finish: Set(fields.finish),
            material_sourcing: Set(fields.material_sourcing),
            material_spec_details: Set(fields.material_spec_details),
            addons: Set(addons),
            callback_requested: Set(fields.callback_requested),
            preferred_method: Set(fields.preferred_method),
            best_time: Set(fields.best_time),
            part_id: Set(fields.part_id),
            revision: Set(fields.revision),
            needed_by: Set(fields.needed_by),
            delivery_method: Set(fields.delivery_method),
            delivery_zip: Set(fields.delivery_zip),
            file_link: Set(fields.file_link),
            notes: Set(fields.notes),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&self.orm)
        .await
        .map_err(map_unique_violation)?;

        order_from_entity(inserted)
    }

    async fn find_order(&self, id: Uuid) -> AppResult<Option<Order>> {
        Orders::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn list_orders(&self, filter: OrderFilter) -> AppResult<(Vec<Order>, i64)> {
        let mut condition = Condition::all();
        if let Some(email) = filter.customer_email {
            condition = condition.add(OrderCol::CustomerEmail.eq(email));
        }
        if let Some(status) = filter.status {
            condition = condition.add(OrderCol::Status.eq(status.as_str()));
        }

        let mut finder = Orders::find().filter(condition);
        finder = match filter.sort_order {
            SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
            SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
        };

        let total = finder.clone().count(&self.orm).await? as i64;

        let orders = finder
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((orders, total))
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> AppResult<Option<Order>> {
        let Some(existing) = Orders::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let mut active: OrderActive = existing.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now().into());
        let order = active.update(&self.orm).await?;
        order_from_entity(order).map(Some)
    }

    async fn update_order_details(
        &self,
        id: Uuid,
        patch: OrderDetailsPatch,
    ) -> AppResult<Option<Order>> {
        let Some(existing) = Orders::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let mut active: OrderActive = existing.into();
        if let Some(quantity) = patch.quantity {
            active.quantity = Set(Some(quantity));
        }
        if let Some(needed_by) = patch.needed_by {
            active.needed_by = Set(Some(needed_by));
        }
        if let Some(notes) = patch.notes {
            active.notes = Set(Some(notes));
        }
        active.updated_at = Set(Utc::now().into());
        let order = active.update(&self.orm).await?;
        order_from_entity(order).map(Some)
    }
}

#[async_trait]
impl FileRepository for DbStore {
    async fn count_files(&self, order_id: Uuid) -> AppResult<usize> {
        let count = OrderFiles::find()
            .filter(FileCol::OrderId.eq(order_id))
            .count(&self.orm)
            .await?;
        Ok(count as usize)
    }

    async fn insert_file(&self, new: NewOrderFile) -> AppResult<OrderFile> {
        let file = FileActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(new.order_id),
            filename: Set(new.filename),
            storage_path: Set(new.storage_path),
            content_type: Set(new.content_type),
            size_bytes: Set(new.size_bytes),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.orm)
        .await?;
        Ok(file_from_entity(file))
    }

    async fn list_files(&self, order_id: Uuid) -> AppResult<Vec<OrderFile>> {
        Ok(OrderFiles::find()
            .filter(FileCol::OrderId.eq(order_id))
            .order_by_asc(FileCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(file_from_entity)
            .collect())
    }

    async fn find_file_by_path(&self, storage_path: &str) -> AppResult<Option<OrderFile>> {
        Ok(OrderFiles::find()
            .filter(FileCol::StoragePath.eq(storage_path))
            .one(&self.orm)
            .await?
            .map(file_from_entity))
    }
}

#[async_trait]
impl QuoteRepository for DbStore {
    async fn list_quotes(&self, order_id: Uuid) -> AppResult<Vec<Quote>> {
        Quotes::find()
            .filter(QuoteCol::OrderId.eq(order_id))
            .order_by_desc(QuoteCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(quote_from_entity)
            .collect()
    }

    async fn find_quote(&self, id: Uuid) -> AppResult<Option<Quote>> {
        Quotes::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(quote_from_entity)
            .transpose()
    }

    async fn issue_quote(
        &self,
        new: NewQuote,
        order_status: OrderStatus,
    ) -> AppResult<(Quote, Order)> {
        let txn = self.orm.begin().await?;
        let now = Utc::now();

        let order = Orders::find_by_id(new.order_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?;
        let order = match order {
            Some(o) => o,
            None => return Err(AppError::NotFound),
        };

        Quotes::update_many()
            .col_expr(QuoteCol::Status, Expr::value(QuoteStatus::Superseded.as_str()))
            .col_expr(QuoteCol::UpdatedAt, Expr::value(now))
            .filter(
                Condition::all()
                    .add(QuoteCol::OrderId.eq(new.order_id))
                    .add(QuoteCol::Status.eq(QuoteStatus::Pending.as_str())),
            )
            .exec(&txn)
            .await?;

        let quote = QuoteActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(new.order_id),
            amount_cents: Set(new.amount_cents),
            description: Set(new.description),
            valid_until: Set(new.valid_until),
            status: Set(QuoteStatus::Pending.as_str().to_string()),
            payment_reference: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let mut active: OrderActive = order.into();
        active.status = Set(order_status.as_str().to_string());
        active.updated_at = Set(now.into());
        let order = active.update(&txn).await?;

        txn.commit().await?;

        Ok((quote_from_entity(quote)?, order_from_entity(order)?))
    }

    async fn accept_quote(
        &self,
        quote_id: Uuid,
        payments: &dyn PaymentProcessor,
        order_status: OrderStatus,
    ) -> AppResult<(Quote, Order)> {
        let txn = self.orm.begin().await?;

        let quote = Quotes::find_by_id(quote_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?;
        let quote = match quote {
            Some(q) => q,
            None => return Err(AppError::NotFound),
        };
        let order = Orders::find_by_id(quote.order_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?;
        let order = match order {
            Some(o) => o,
            None => return Err(AppError::NotFound),
        };
        // a concurrent acceptance or admin status write may have landed since
        // the caller looked; both wait on these locks while the charge runs
        let current_quote = quote
            .status
            .parse::<QuoteStatus>()
            .map_err(|_| corrupt("quote status", &quote.status))?;
        let current_order = order
            .status
            .parse::<OrderStatus>()
            .map_err(|_| corrupt("status", &order.status))?;
        if !quote_acceptable(current_order, current_quote) {
            return Err(quote_not_open());
        }

        let receipt = payments.charge(quote.id, quote.amount_cents).await?;
        let now = Utc::now();

        let mut quote_active: QuoteActive = quote.into();
        quote_active.status = Set(QuoteStatus::Accepted.as_str().to_string());
        quote_active.payment_reference = Set(Some(receipt.reference.clone()));
        quote_active.updated_at = Set(now.into());
        let quote = quote_active.update(&txn).await?;

        let mut order_active: OrderActive = order.into();
        order_active.status = Set(order_status.as_str().to_string());
        order_active.updated_at = Set(now.into());
        let order = order_active.update(&txn).await?;

        if let Err(err) = txn.commit().await {
            error!(
                quote_id = %quote_id,
                payment_reference = %receipt.reference,
                error = ?err,
                "payment taken but acceptance not recorded"
            );
            return Err(err.into());
        }

        Ok((quote_from_entity(quote)?, order_from_entity(order)?))
    }
}

#[async_trait]
impl MessageRepository for DbStore {
    async fn append_message(&self, new: NewMessage) -> AppResult<Message> {
        let message = MessageActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(new.order_id),
            sender_type: Set(new.sender_type.as_str().to_string()),
            sender_email: Set(new.sender_email),
            body: Set(new.body),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.orm)
        .await?;
        message_from_entity(message)
    }

    async fn list_messages(&self, order_id: Uuid) -> AppResult<Vec<Message>> {
        OrderMessages::find()
            .filter(MessageCol::OrderId.eq(order_id))
            .order_by_asc(MessageCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(message_from_entity)
            .collect()
    }
}

#[async_trait]
impl RateLimitRepository for DbStore {
    async fn find_rate_limit(&self, identifier: &str) -> AppResult<Option<RateLimitRecord>> {
        let row: Option<(String, i32, DateTime<Utc>)> = sqlx::query_as(
            "SELECT identifier, submission_count, window_start FROM order_rate_limits WHERE identifier = $1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(identifier, submission_count, window_start)| RateLimitRecord {
            identifier,
            submission_count,
            window_start,
        }))
    }

    async fn save_rate_limit(&self, record: RateLimitRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_rate_limits (identifier, submission_count, window_start)
            VALUES ($1, $2, $3)
            ON CONFLICT (identifier) DO UPDATE
            SET submission_count = EXCLUDED.submission_count,
                window_start = EXCLUDED.window_start
            "#,
        )
        .bind(&record.identifier)
        .bind(record.submission_count)
        .bind(record.window_start)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn map_unique_violation(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::DuplicateOrderCode,
        _ => AppError::Db(err),
    }
}

fn corrupt(what: &str, value: &str) -> AppError {
    AppError::Internal(anyhow::anyhow!("stored {what} is not recognised: {value}"))
}

fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let request_type = model
        .request_type
        .parse::<RequestType>()
        .map_err(|_| corrupt("request_type", &model.request_type))?;
    let status = model
        .status
        .parse::<OrderStatus>()
        .map_err(|_| corrupt("status", &model.status))?;
    let addons = model
        .addons
        .and_then(|value| serde_json::from_value::<Vec<String>>(value).ok())
        .unwrap_or_default();

    Ok(Order {
        id: model.id,
        order_code: model.order_code,
        request_type,
        status,
        customer_email: model.customer_email,
        fields: OrderFields {
            customer_name: model.customer_name,
            company: model.company,
            customer_phone: model.customer_phone,
            offering: model.offering,
            material: model.material,
            thickness: model.thickness,
            custom_thickness: model.custom_thickness,
            quantity: model.quantity,
            finish: model.finish,
            material_sourcing: model.material_sourcing,
            material_spec_details: model.material_spec_details,
            addons,
            callback_requested: model.callback_requested,
            preferred_method: model.preferred_method,
            best_time: model.best_time,
            part_id: model.part_id,
            revision: model.revision,
            needed_by: model.needed_by,
            delivery_method: model.delivery_method,
            delivery_zip: model.delivery_zip,
            file_link: model.file_link,
            notes: model.notes,
        },
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn file_from_entity(model: FileModel) -> OrderFile {
    OrderFile {
        id: model.id,
        order_id: model.order_id,
        filename: model.filename,
        storage_path: model.storage_path,
        content_type: model.content_type,
        size_bytes: model.size_bytes,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn quote_from_entity(model: QuoteModel) -> AppResult<Quote> {
    let status = model
        .status
        .parse::<QuoteStatus>()
        .map_err(|_| corrupt("quote status", &model.status))?;
    Ok(Quote {
        id: model.id,
        order_id: model.order_id,
        amount_cents: model.amount_cents,
        description: model.description,
        valid_until: model.valid_until,
        status,
        payment_reference: model.payment_reference,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn message_from_entity(model: MessageModel) -> AppResult<Message> {
    let sender_type = model
        .sender_type
        .parse::<SenderType>()
        .map_err(|_| corrupt("sender_type", &model.sender_type))?;
    Ok(Message {
        id: model.id,
        order_id: model.order_id,
        sender_type,
        sender_email: model.sender_email,
        body: model.body,
        created_at: model.created_at.with_timezone(&Utc),
    })
}
