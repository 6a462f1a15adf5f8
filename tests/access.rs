mod common;

use fab_orders_api::{
    dto::orders::UpdateOrderDetailsRequest,
    error::AppError,
    middleware::auth::CallerIdentity,
    models::{OrderStatus, SenderType, SortOrder},
    routes::params::OrderListQuery,
    services::{admin_service, order_service},
    store::OrderRepository,
};

use common::{harness, submit};

#[tokio::test]
async fn customers_see_only_their_orders_admins_see_all() -> anyhow::Result<()> {
    let h = harness();
    let mine = submit(&h, "a@x.com").await;
    let theirs = submit(&h, "b@x.com").await;

    let a = CallerIdentity::customer("a@x.com");
    let detail = order_service::get_order_detail(&h.state, &a, mine).await?;
    assert_eq!(detail.data.expect("detail").order.id, mine);

    let denied = order_service::get_order_detail(&h.state, &a, theirs).await;
    assert!(matches!(denied, Err(AppError::NotFound)));

    let admin = CallerIdentity::admin("ops@shop.test");
    assert!(order_service::get_order_detail(&h.state, &admin, mine).await.is_ok());
    assert!(order_service::get_order_detail(&h.state, &admin, theirs).await.is_ok());

    let own_list = order_service::list_orders(&h.state, &a, OrderListQuery::default()).await?;
    let items = own_list.data.expect("list").items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, mine);

    let all = admin_service::list_all_orders(&h.state, &admin, OrderListQuery::default()).await?;
    assert_eq!(all.meta.expect("meta").total, Some(2));

    assert!(matches!(
        admin_service::list_all_orders(&h.state, &a, OrderListQuery::default()).await,
        Err(AppError::Forbidden)
    ));
    Ok(())
}

#[tokio::test]
async fn listing_filters_and_pages() -> anyhow::Result<()> {
    let h = harness();
    let admin = CallerIdentity::admin("ops@shop.test");
    let mut ids = Vec::new();
    for i in 0..3 {
        ids.push(submit(&h, &format!("p{i}@x.com")).await);
    }
    h.store.set_order_status(ids[1], OrderStatus::Ready).await?;

    let ready = order_service::list_orders(
        &h.state,
        &admin,
        OrderListQuery {
            status: Some("Ready".into()),
            ..Default::default()
        },
    )
    .await?;
    let items = ready.data.expect("list").items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, ids[1]);

    let page = order_service::list_orders(
        &h.state,
        &admin,
        OrderListQuery {
            page: Some(2),
            per_page: Some(2),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        },
    )
    .await?;
    let meta = page.meta.clone().expect("meta");
    assert_eq!((meta.page, meta.per_page, meta.total), (Some(2), Some(2), Some(3)));
    assert_eq!(page.data.expect("list").items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn messages_are_attributed_and_ordered() -> anyhow::Result<()> {
    let h = harness();
    let order_id = submit(&h, "a@x.com").await;
    let owner = CallerIdentity::customer("a@x.com");
    let admin = CallerIdentity::admin("ops@shop.test");

    order_service::post_message(&h.state, &owner, order_id, "  Can you do 14ga instead?  ").await?;
    order_service::post_message(&h.state, &admin, order_id, "Yes, same price.").await?;

    let detail = order_service::get_order_detail(&h.state, &owner, order_id)
        .await?
        .data
        .expect("detail");
    assert_eq!(detail.messages.len(), 2);
    assert_eq!(detail.messages[0].body, "Can you do 14ga instead?");
    assert_eq!(detail.messages[0].sender_type, SenderType::Customer);
    assert_eq!(detail.messages[1].sender_type, SenderType::Team);

    assert!(matches!(
        order_service::post_message(&h.state, &owner, order_id, "   ").await,
        Err(AppError::InvalidInput(_))
    ));
    let stranger = CallerIdentity::customer("b@x.com");
    assert!(matches!(
        order_service::post_message(&h.state, &stranger, order_id, "hello").await,
        Err(AppError::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn details_editable_only_before_payment() -> anyhow::Result<()> {
    let h = harness();
    let order_id = submit(&h, "a@x.com").await;
    let owner = CallerIdentity::customer("a@x.com");

    let updated = order_service::update_order_details(
        &h.state,
        &owner,
        order_id,
        UpdateOrderDetailsRequest {
            quantity: Some("24".into()),
            notes: Some("x".repeat(5200)),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(updated.fields.quantity.as_deref(), Some("24"));
    assert_eq!(updated.fields.notes.map(|n| n.chars().count()), Some(5000));
    assert_eq!(updated.fields.material.as_deref(), Some("Mild Steel"));

    h.store
        .set_order_status(order_id, OrderStatus::InProduction)
        .await?;
    let locked = order_service::update_order_details(
        &h.state,
        &owner,
        order_id,
        UpdateOrderDetailsRequest {
            quantity: Some("30".into()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(locked, Err(AppError::InvalidInput(_))));
    Ok(())
}
