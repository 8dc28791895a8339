//! Per-user cart mutation.
//!
//! Every change is a single atomic update in the store, so concurrent calls
//! for one user cannot lose increments or decrements. A token whose user no
//! longer exists is treated as unauthenticated.

use mongodb::bson::oid::ObjectId;

use crate::error::AppError;
use crate::models::CartMap;
use crate::store::UserStore;

fn require_user(found: bool) -> Result<(), AppError> {
    if found {
        Ok(())
    } else {
        Err(AppError::Unauthenticated)
    }
}

pub async fn add_to_cart(
    users: &dyn UserStore,
    user: &ObjectId,
    item_id: i64,
) -> Result<(), AppError> {
    require_user(users.increment_item(user, item_id).await?)
}

pub async fn remove_from_cart(
    users: &dyn UserStore,
    user: &ObjectId,
    item_id: i64,
) -> Result<(), AppError> {
    require_user(users.decrement_item(user, item_id).await?)
}

pub async fn get_cart(users: &dyn UserStore, user: &ObjectId) -> Result<CartMap, AppError> {
    let user = users.find_by_id(user).await?.ok_or(AppError::Unauthenticated)?;
    Ok(user.cart_data)
}

pub async fn set_quantity(
    users: &dyn UserStore,
    user: &ObjectId,
    item_id: i64,
    quantity: i64,
) -> Result<(), AppError> {
    if quantity < 0 {
        return Err(AppError::InvalidQuantity(quantity));
    }
    require_user(users.set_item(user, item_id, quantity).await?)
}

pub async fn clear_cart(users: &dyn UserStore, user: &ObjectId) -> Result<(), AppError> {
    require_user(users.clear_cart(user).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{cart_quantity, User};
    use crate::store::MemoryStore;
    use futures::executor::block_on;
    use futures::future::join_all;
    use std::sync::Arc;
    use std::thread;

    async fn store_with_user() -> (MemoryStore, ObjectId) {
        let store = MemoryStore::new();
        let user = User::new("Ann".into(), "ann@shop.test".into(), "hash".into());
        let id = user.id;
        store.create(user).await.unwrap();
        (store, id)
    }

    #[actix_web::test]
    async fn sequential_adds_and_removes_clamp_at_zero() {
        let (store, id) = store_with_user().await;
        // +, -, -, -, +, +, -  =>  max(0, ...) applied step by step
        let steps = [true, false, false, false, true, true, false];
        let mut expected: i64 = 0;

        for add in steps {
            if add {
                add_to_cart(&store, &id, 12).await.unwrap();
                expected += 1;
            } else {
                remove_from_cart(&store, &id, 12).await.unwrap();
                expected = (expected - 1).max(0);
            }
            let cart = get_cart(&store, &id).await.unwrap();
            assert_eq!(cart_quantity(&cart, 12), expected);
            assert!(cart.values().all(|q| *q >= 0));
        }
        assert_eq!(expected, 1);
    }

    #[actix_web::test]
    async fn items_outside_the_catalog_are_accepted() {
        let (store, id) = store_with_user().await;
        add_to_cart(&store, &id, 10_000).await.unwrap();

        let cart = get_cart(&store, &id).await.unwrap();
        assert_eq!(cart_quantity(&cart, 10_000), 1);
    }

    #[actix_web::test]
    async fn set_quantity_and_clear() {
        let (store, id) = store_with_user().await;
        set_quantity(&store, &id, 3, 5).await.unwrap();
        add_to_cart(&store, &id, 4).await.unwrap();
        assert_eq!(cart_quantity(&get_cart(&store, &id).await.unwrap(), 3), 5);

        set_quantity(&store, &id, 3, 0).await.unwrap();
        assert!(!get_cart(&store, &id).await.unwrap().contains_key("3"));

        clear_cart(&store, &id).await.unwrap();
        assert!(get_cart(&store, &id).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn negative_quantity_is_refused() {
        let (store, id) = store_with_user().await;
        let err = set_quantity(&store, &id, 3, -1).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidQuantity(-1)));
    }

    #[actix_web::test]
    async fn unknown_user_is_unauthenticated() {
        let (store, _) = store_with_user().await;
        let ghost = ObjectId::new();

        assert!(matches!(add_to_cart(&store, &ghost, 1).await, Err(AppError::Unauthenticated)));
        assert!(matches!(get_cart(&store, &ghost).await, Err(AppError::Unauthenticated)));
    }

    #[actix_web::test]
    async fn concurrent_adds_are_all_counted() {
        let (store, id) = store_with_user().await;

        let adds = (0..100).map(|_| add_to_cart(&store, &id, 9));
        for result in join_all(adds).await {
            result.unwrap();
        }

        assert_eq!(cart_quantity(&get_cart(&store, &id).await.unwrap(), 9), 100);
    }

    #[actix_web::test]
    async fn concurrent_mixed_updates_never_go_negative() {
        let (store, id) = store_with_user().await;
        add_to_cart(&store, &id, 2).await.unwrap();

        let calls = (0..90).map(|i| {
            let store = &store;
            let id = &id;
            async move {
                if i % 3 == 0 {
                    add_to_cart(store, id, 2).await
                } else {
                    remove_from_cart(store, id, 2).await
                }
            }
        });
        for result in join_all(calls).await {
            result.unwrap();
        }

        let quantity = cart_quantity(&get_cart(&store, &id).await.unwrap(), 2);
        assert!((0..=31).contains(&quantity));
    }

    #[test]
    fn adds_from_many_threads_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let user = User::new("Ann".into(), "ann@shop.test".into(), "hash".into());
        let id = user.id;
        block_on(store.create(user)).unwrap();

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..50 {
                        block_on(add_to_cart(&*store, &id, 4)).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let cart = block_on(get_cart(&*store, &id)).unwrap();
        assert_eq!(cart_quantity(&cart, 4), 400);
    }
}
