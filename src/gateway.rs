//! Read access to orders and their files: admins see everything, customers
//! see what was submitted under their email.

use crate::{
    error::{AppError, AppResult},
    files::order_id_from_key,
    middleware::auth::CallerIdentity,
    models::{Order, OrderFile},
    store::{FileRepository, OrderRepository},
};
use uuid::Uuid;

pub fn can_access(caller: &CallerIdentity, order: &Order) -> bool {
    caller.is_admin() || order.customer_email.eq_ignore_ascii_case(&caller.email)
}

/// Load an order the caller may see. Missing and foreign orders are
/// indistinguishable: both are `NotFound`.
pub async fn authorize_order(
    orders: &dyn OrderRepository,
    caller: &CallerIdentity,
    order_id: Uuid,
) -> AppResult<Order> {
    match orders.find_order(order_id).await? {
        Some(order) if can_access(caller, &order) => Ok(order),
        _ => Err(AppError::NotFound),
    }
}

/// Resolve a storage key to a file the caller may download.
///
/// Customers get `Forbidden` both for files they do not own and for keys that
/// do not exist.
pub async fn authorize_file(
    orders: &dyn OrderRepository,
    files: &dyn FileRepository,
    caller: &CallerIdentity,
    storage_path: &str,
) -> AppResult<OrderFile> {
    let denied = if caller.is_admin() {
        AppError::NotFound
    } else {
        AppError::Forbidden
    };

    let Some(key_order_id) = order_id_from_key(storage_path) else {
        return Err(denied);
    };
    let Some(file) = files.find_file_by_path(storage_path).await? else {
        return Err(denied);
    };
    if file.order_id != key_order_id {
        return Err(denied);
    }
    if caller.is_admin() {
        return Ok(file);
    }
    match orders.find_order(file.order_id).await? {
        Some(order) if can_access(caller, &order) => Ok(file),
        _ => Err(AppError::Forbidden),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{NewOrder, NewOrderFile, OrderFields, OrderStatus, RequestType},
        store::memory::MemoryStore,
    };

    async fn order_for(store: &MemoryStore, email: &str, code: &str) -> Order {
        store
            .insert_order(NewOrder {
                order_code: code.into(),
                request_type: RequestType::Estimate,
                status: OrderStatus::InEstimating,
                customer_email: email.into(),
                fields: OrderFields::default(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn owner_and_admin_see_order_others_get_not_found() {
        let store = MemoryStore::new();
        let order = order_for(&store, "a@x.com", "MP-1").await;

        let owner = CallerIdentity::customer("A@x.com");
        assert_eq!(authorize_order(&store, &owner, order.id).await.unwrap().id, order.id);

        let admin = CallerIdentity::admin("ops@shop.test");
        assert!(authorize_order(&store, &admin, order.id).await.is_ok());

        let stranger = CallerIdentity::customer("b@x.com");
        assert!(matches!(
            authorize_order(&store, &stranger, order.id).await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            authorize_order(&store, &owner, Uuid::new_v4()).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn file_access_follows_order_ownership() {
        let store = MemoryStore::new();
        let order = order_for(&store, "a@x.com", "MP-2").await;
        let key = crate::files::storage_key(order.id, "part.pdf");
        store
            .insert_file(NewOrderFile {
                order_id: order.id,
                filename: "part.pdf".into(),
                storage_path: key.clone(),
                content_type: "application/pdf".into(),
                size_bytes: 3,
            })
            .await
            .unwrap();

        let owner = CallerIdentity::customer("a@x.com");
        assert!(authorize_file(&store, &store, &owner, &key).await.is_ok());

        let stranger = CallerIdentity::customer("b@x.com");
        assert!(matches!(
            authorize_file(&store, &store, &stranger, &key).await,
            Err(AppError::Forbidden)
        ));
        let missing = crate::files::storage_key(order.id, "other.pdf");
        assert!(matches!(
            authorize_file(&store, &store, &stranger, &missing).await,
            Err(AppError::Forbidden)
        ));

        let admin = CallerIdentity::admin("ops@shop.test");
        assert!(authorize_file(&store, &store, &admin, &key).await.is_ok());
    }
}
