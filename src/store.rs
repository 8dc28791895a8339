//! Storage seams for accounts and the catalog.
//!
//! `MongoStore` (in `db`) is the production implementation. `MemoryStore`
//! keeps everything in process and backs the server when no database URL is
//! configured.

use std::sync::Mutex;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use crate::models::{CartMap, NewProduct, Product, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key")]
    DuplicateKey,

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Accounts and their embedded cart maps.
///
/// Cart mutations return `Ok(false)` when no user has the given id.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::DuplicateKey`] when the email is taken.
    async fn create(&self, user: User) -> Result<(), StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError>;

    /// Adds one unit of `item_id`, with no upper bound.
    async fn increment_item(&self, id: &ObjectId, item_id: i64) -> Result<bool, StoreError>;

    /// Removes one unit of `item_id` if the quantity is above zero.
    async fn decrement_item(&self, id: &ObjectId, item_id: i64) -> Result<bool, StoreError>;

    /// Sets the quantity outright; zero drops the entry.
    async fn set_item(&self, id: &ObjectId, item_id: i64, quantity: i64)
        -> Result<bool, StoreError>;

    async fn clear_cart(&self, id: &ObjectId) -> Result<bool, StoreError>;
}

/// Product catalog. Listing order is insertion order.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn all(&self) -> Result<Vec<Product>, StoreError>;

    /// The last `count` products inserted, oldest first.
    async fn newest(&self, count: usize) -> Result<Vec<Product>, StoreError>;

    /// The first `limit` products in `category`.
    async fn by_category(&self, category: &str, limit: usize) -> Result<Vec<Product>, StoreError>;

    /// Assigns the next sequential id and stores the product.
    async fn insert(&self, product: NewProduct) -> Result<Product, StoreError>;

    /// Deletes the product with `id`, returning it if it existed.
    async fn remove(&self, id: i64) -> Result<Option<Product>, StoreError>;
}

#[derive(Default)]
struct Catalog {
    products: Vec<Product>,
    last_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    catalog: Mutex<Catalog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_user<R>(
        &self,
        id: &ObjectId,
        f: impl FnOnce(&mut User) -> R,
    ) -> Result<Option<R>, StoreError> {
        let mut users = self.users.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(users.iter_mut().find(|u| &u.id == id).map(f))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.lock().map_err(|_| StoreError::Poisoned)?;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateKey);
        }
        users.push(user);
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(users.iter().find(|u| &u.id == id).cloned())
    }

    async fn increment_item(&self, id: &ObjectId, item_id: i64) -> Result<bool, StoreError> {
        let found = self.with_user(id, |user| {
            *user.cart_data.entry(item_id.to_string()).or_insert(0) += 1;
        })?;
        Ok(found.is_some())
    }

    async fn decrement_item(&self, id: &ObjectId, item_id: i64) -> Result<bool, StoreError> {
        let found = self.with_user(id, |user| {
            if let Some(quantity) = user.cart_data.get_mut(&item_id.to_string()) {
                if *quantity > 0 {
                    *quantity -= 1;
                }
            }
        })?;
        Ok(found.is_some())
    }

    async fn set_item(
        &self,
        id: &ObjectId,
        item_id: i64,
        quantity: i64,
    ) -> Result<bool, StoreError> {
        let found = self.with_user(id, |user| {
            let key = item_id.to_string();
            if quantity == 0 {
                user.cart_data.remove(&key);
            } else {
                user.cart_data.insert(key, quantity);
            }
        })?;
        Ok(found.is_some())
    }

    async fn clear_cart(&self, id: &ObjectId) -> Result<bool, StoreError> {
        let found = self.with_user(id, |user| user.cart_data = CartMap::new())?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn all(&self) -> Result<Vec<Product>, StoreError> {
        let catalog = self.catalog.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(catalog.products.clone())
    }

    async fn newest(&self, count: usize) -> Result<Vec<Product>, StoreError> {
        let catalog = self.catalog.lock().map_err(|_| StoreError::Poisoned)?;
        let start = catalog.products.len().saturating_sub(count);
        Ok(catalog.products[start..].to_vec())
    }

    async fn by_category(&self, category: &str, limit: usize) -> Result<Vec<Product>, StoreError> {
        let catalog = self.catalog.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(catalog
            .products
            .iter()
            .filter(|p| p.category == category)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut catalog = self.catalog.lock().map_err(|_| StoreError::Poisoned)?;
        let max_id = catalog.products.iter().map(|p| p.id).max().unwrap_or(0);
        let next_id = max_id.max(catalog.last_id) + 1;
        catalog.last_id = next_id;

        let product = product.into_product(next_id);
        catalog.products.push(product.clone());
        Ok(product)
    }

    async fn remove(&self, id: i64) -> Result<Option<Product>, StoreError> {
        let mut catalog = self.catalog.lock().map_err(|_| StoreError::Poisoned)?;
        let position = catalog.products.iter().position(|p| p.id == id);
        Ok(position.map(|index| catalog.products.remove(index)))
    }
}
