mod common;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use fab_orders_api::{
    dto::{orders::UpdateOrderStatusRequest, quotes::IssueQuoteRequest},
    error::{AppError, AppResult},
    middleware::auth::CallerIdentity,
    models::{OrderStatus, QuoteStatus},
    payments::{DecliningPaymentProcessor, PaymentProcessor, PaymentReceipt, StubPaymentProcessor},
    services::{admin_service, quote_service},
    store::{OrderRepository, QuoteRepository},
};
use uuid::Uuid;

use common::{harness, submit};

/// Counts charges and yields mid-charge so competing acceptances interleave.
#[derive(Default)]
struct CountingPayments {
    charges: AtomicUsize,
}

#[async_trait]
impl PaymentProcessor for CountingPayments {
    async fn charge(&self, quote_id: Uuid, amount_cents: i64) -> AppResult<PaymentReceipt> {
        self.charges.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        StubPaymentProcessor.charge(quote_id, amount_cents).await
    }
}

fn admin() -> CallerIdentity {
    CallerIdentity::admin("estimating@shop.test")
}

fn quote(amount_cents: i64) -> IssueQuoteRequest {
    IssueQuoteRequest {
        amount_cents,
        description: Some("Laser cut and bend, powder coat black".into()),
        valid_until: NaiveDate::from_ymd_opt(2030, 1, 31),
    }
}

#[tokio::test]
async fn issuing_a_quote_forces_estimate_sent() -> anyhow::Result<()> {
    let h = harness();
    for prior in [OrderStatus::InEstimating, OrderStatus::NeedInfo, OrderStatus::InProduction] {
        let order_id = submit(&h, &format!("{}@x.com", prior.position())).await;
        h.store.set_order_status(order_id, prior).await?;

        let resp = quote_service::issue_quote(&h.state, &admin(), order_id, quote(48_000)).await?;
        let data = resp.data.expect("quote");
        assert_eq!(data.order.status, OrderStatus::EstimateSent);
        assert_eq!(data.quote.status, QuoteStatus::Pending);
        assert_eq!(data.quote.amount_cents, 48_000);
    }
    Ok(())
}

#[tokio::test]
async fn new_quote_supersedes_pending_one() -> anyhow::Result<()> {
    let h = harness();
    let order_id = submit(&h, "a@x.com").await;
    let first = quote_service::issue_quote(&h.state, &admin(), order_id, quote(10_000))
        .await?
        .data
        .expect("quote")
        .quote;
    let second = quote_service::issue_quote(&h.state, &admin(), order_id, quote(9_000))
        .await?
        .data
        .expect("quote")
        .quote;

    let quotes = h.store.list_quotes(order_id).await?;
    assert_eq!(quotes[0].id, second.id);
    assert_eq!(quotes[0].status, QuoteStatus::Pending);
    assert_eq!(quotes[1].id, first.id);
    assert_eq!(quotes[1].status, QuoteStatus::Superseded);

    let owner = CallerIdentity::customer("a@x.com");
    let stale = quote_service::accept_quote(&h.state, &owner, order_id, first.id).await;
    assert!(matches!(stale, Err(AppError::InvalidInput(_))));
    Ok(())
}

#[tokio::test]
async fn quote_issue_requires_admin_and_positive_amount() {
    let h = harness();
    let order_id = submit(&h, "a@x.com").await;

    let customer = CallerIdentity::customer("a@x.com");
    assert!(matches!(
        quote_service::issue_quote(&h.state, &customer, order_id, quote(100)).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        quote_service::issue_quote(&h.state, &admin(), order_id, quote(0)).await,
        Err(AppError::InvalidInput(_))
    ));
    assert!(matches!(
        quote_service::issue_quote(&h.state, &admin(), Uuid::new_v4(), quote(100)).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn accepting_pending_quote_records_payment() -> anyhow::Result<()> {
    let h = harness();
    let order_id = submit(&h, "a@x.com").await;
    let issued = quote_service::issue_quote(&h.state, &admin(), order_id, quote(25_000))
        .await?
        .data
        .expect("quote")
        .quote;

    let owner = CallerIdentity::customer("a@x.com");
    let accepted = quote_service::accept_quote(&h.state, &owner, order_id, issued.id)
        .await?
        .data
        .expect("accepted");
    assert_eq!(accepted.quote.status, QuoteStatus::Accepted);
    assert!(accepted.quote.payment_reference.is_some());
    assert_eq!(accepted.order.status, OrderStatus::PaymentReceived);

    // a second acceptance finds the order past Estimate Sent
    let again = quote_service::accept_quote(&h.state, &owner, order_id, issued.id).await;
    match again {
        Err(AppError::InvalidInput(msg)) => assert_eq!(msg, "Quote is not open for acceptance"),
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn strangers_cannot_accept_and_declined_payment_changes_nothing() -> anyhow::Result<()> {
    let h = harness();
    let order_id = submit(&h, "a@x.com").await;
    let issued = quote_service::issue_quote(&h.state, &admin(), order_id, quote(5_000))
        .await?
        .data
        .expect("quote")
        .quote;

    let stranger = CallerIdentity::customer("b@x.com");
    assert!(matches!(
        quote_service::accept_quote(&h.state, &stranger, order_id, issued.id).await,
        Err(AppError::NotFound)
    ));

    let declining = h.state.clone().with_payments(Arc::new(DecliningPaymentProcessor));
    let owner = CallerIdentity::customer("a@x.com");
    assert!(quote_service::accept_quote(&declining, &owner, order_id, issued.id)
        .await
        .is_err());

    let order = h.store.find_order(order_id).await?.expect("order");
    assert_eq!(order.status, OrderStatus::EstimateSent);
    let stored = h.store.find_quote(issued.id).await?.expect("quote");
    assert_eq!(stored.status, QuoteStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn admin_status_edit_never_accepts_quotes() -> anyhow::Result<()> {
    let h = harness();
    let order_id = submit(&h, "a@x.com").await;
    let issued = quote_service::issue_quote(&h.state, &admin(), order_id, quote(7_500))
        .await?
        .data
        .expect("quote")
        .quote;

    let updated = admin_service::update_order_status(
        &h.state,
        &admin(),
        order_id,
        UpdateOrderStatusRequest {
            status: "Payment Received".into(),
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(updated.status, OrderStatus::PaymentReceived);

    let stored = h.store.find_quote(issued.id).await?.expect("quote");
    assert_eq!(stored.status, QuoteStatus::Pending);
    assert!(stored.payment_reference.is_none());

    // arbitrary jumps, including backwards, are plain writes
    for status in ["Delivered", "In Estimating"] {
        admin_service::update_order_status(
            &h.state,
            &admin(),
            order_id,
            UpdateOrderStatusRequest {
                status: status.into(),
            },
        )
        .await?;
    }
    assert!(matches!(
        admin_service::update_order_status(
            &h.state,
            &admin(),
            order_id,
            UpdateOrderStatusRequest {
                status: "Shipped".into()
            },
        )
        .await,
        Err(AppError::InvalidInput(_))
    ));
    Ok(())
}

#[tokio::test]
async fn racing_acceptances_charge_once() -> anyhow::Result<()> {
    let h = harness();
    let order_id = submit(&h, "a@x.com").await;
    let issued = quote_service::issue_quote(&h.state, &admin(), order_id, quote(12_000))
        .await?
        .data
        .expect("quote")
        .quote;

    let payments = Arc::new(CountingPayments::default());
    let state = h.state.clone().with_payments(payments.clone());
    let owner = CallerIdentity::customer("a@x.com");
    let (first, second) = tokio::join!(
        quote_service::accept_quote(&state, &owner, order_id, issued.id),
        quote_service::accept_quote(&state, &owner, order_id, issued.id),
    );

    assert_eq!(first.is_ok() as usize + second.is_ok() as usize, 1);
    assert_eq!(payments.charges.load(Ordering::SeqCst), 1);
    let loser = if first.is_ok() { second } else { first };
    match loser {
        Err(AppError::InvalidInput(msg)) => assert_eq!(msg, "Quote is not open for acceptance"),
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn status_moved_off_estimate_sent_blocks_charge() -> anyhow::Result<()> {
    let h = harness();
    let order_id = submit(&h, "a@x.com").await;
    let issued = quote_service::issue_quote(&h.state, &admin(), order_id, quote(3_000))
        .await?
        .data
        .expect("quote")
        .quote;

    // an admin write that lands after the caller read the order
    h.store.set_order_status(order_id, OrderStatus::NeedInfo).await?;

    let payments = CountingPayments::default();
    let result = h
        .store
        .accept_quote(issued.id, &payments, OrderStatus::PaymentReceived)
        .await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));
    assert_eq!(payments.charges.load(Ordering::SeqCst), 0);

    let order = h.store.find_order(order_id).await?.expect("order");
    assert_eq!(order.status, OrderStatus::NeedInfo);
    let stored = h.store.find_quote(issued.id).await?.expect("quote");
    assert_eq!(stored.status, QuoteStatus::Pending);
    Ok(())
}
