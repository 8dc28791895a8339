use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use log::info;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{
    ClientOptions, FindOneAndUpdateOptions, FindOneOptions, FindOptions, IndexOptions,
    ReturnDocument, UpdateOptions,
};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use crate::models::{CartMap, Counter, NewProduct, Product, User};
use crate::store::{ProductStore, StoreError, UserStore};

const PRODUCT_SEQUENCE: &str = "product";
const DUPLICATE_KEY_CODE: i32 = 11000;

pub async fn connect(database_url: &str, database_name: &str) -> Result<Database, StoreError> {
    let client_options = ClientOptions::parse(database_url).await?;
    let client = Client::with_options(client_options)?;
    Ok(client.database(database_name))
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref e)) if e.code == DUPLICATE_KEY_CODE
    )
}

/// A user as stored in the `users` collection. `date` is a BSON Date, which
/// is also what existing storefront data holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "cartData", default)]
    pub cart_data: CartMap,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
}

impl From<User> for UserDocument {
    fn from(user: User) -> Self {
        UserDocument {
            id: user.id,
            name: user.name,
            email: user.email,
            password: user.password,
            cart_data: user.cart_data,
            date: user.date,
        }
    }
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        User {
            id: doc.id,
            name: doc.name,
            email: doc.email,
            password: doc.password,
            cart_data: doc.cart_data,
            date: doc.date,
        }
    }
}

fn available_default() -> bool {
    true
}

/// A product as stored in the `products` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDocument {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image: String,
    pub category: String,
    #[serde(default)]
    pub new_price: Option<f64>,
    #[serde(default)]
    pub old_price: Option<f64>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    #[serde(default = "available_default", alias = "avilable")]
    pub available: bool,
}

impl From<Product> for ProductDocument {
    fn from(product: Product) -> Self {
        ProductDocument {
            id: product.id,
            name: product.name,
            description: product.description,
            image: product.image,
            category: product.category,
            new_price: product.new_price,
            old_price: product.old_price,
            date: product.date,
            available: product.available,
        }
    }
}

impl From<ProductDocument> for Product {
    fn from(doc: ProductDocument) -> Self {
        Product {
            id: doc.id,
            name: doc.name,
            description: doc.description,
            image: doc.image,
            category: doc.category,
            new_price: doc.new_price,
            old_price: doc.old_price,
            date: doc.date,
            available: doc.available,
        }
    }
}

fn cart_field(item_id: i64) -> String {
    format!("cartData.{item_id}")
}

fn increment_update(item_id: i64) -> Document {
    let mut inc = Document::new();
    inc.insert(cart_field(item_id), 1_i64);
    doc! { "$inc": inc }
}

/// Matches the user only while the item's quantity is above zero.
fn decrement_filter(user: &ObjectId, item_id: i64) -> Document {
    let mut filter = doc! { "_id": user };
    filter.insert(cart_field(item_id), doc! { "$gt": 0_i64 });
    filter
}

fn decrement_update(item_id: i64) -> Document {
    let mut inc = Document::new();
    inc.insert(cart_field(item_id), -1_i64);
    doc! { "$inc": inc }
}

/// Zero unsets the entry so the map stays sparse.
fn set_quantity_update(item_id: i64, quantity: i64) -> Document {
    let mut fields = Document::new();
    if quantity == 0 {
        fields.insert(cart_field(item_id), "");
        doc! { "$unset": fields }
    } else {
        fields.insert(cart_field(item_id), quantity);
        doc! { "$set": fields }
    }
}

#[derive(Clone)]
pub struct MongoStore {
    users: Collection<UserDocument>,
    products: Collection<ProductDocument>,
    counters: Collection<Counter>,
}

impl MongoStore {
    /// Wraps `db` and prepares it: the unique email index and a product id
    /// counter that is never behind the highest stored id.
    pub async fn init(db: &Database) -> Result<Self, StoreError> {
        let store = MongoStore {
            users: db.collection("users"),
            products: db.collection("products"),
            counters: db.collection("counters"),
        };

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        store.users.create_index(email_index, None).await?;

        let highest = store.highest_product_id().await?;
        store
            .counters
            .update_one(
                doc! { "_id": PRODUCT_SEQUENCE },
                doc! { "$max": { "seq": highest } },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await?;
        info!("Product id counter synced at {}", highest);

        Ok(store)
    }

    async fn highest_product_id(&self) -> Result<i64, StoreError> {
        let options = FindOneOptions::builder().sort(doc! { "id": -1 }).build();
        let top = self.products.find_one(None, options).await?;
        Ok(top.map(|p| p.id).unwrap_or(0))
    }

    async fn next_product_id(&self) -> Result<i64, StoreError> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let counter = self
            .counters
            .find_one_and_update(
                doc! { "_id": PRODUCT_SEQUENCE },
                doc! { "$inc": { "seq": 1_i64 } },
                options,
            )
            .await?;

        match counter {
            Some(counter) => Ok(counter.seq),
            None => Err(mongodb::error::Error::custom("Failed to generate sequence value").into()),
        }
    }

    async fn user_exists(&self, id: &ObjectId) -> Result<bool, StoreError> {
        Ok(self.users.count_documents(doc! { "_id": id }, None).await? > 0)
    }

    async fn find_products(
        &self,
        filter: impl Into<Option<Document>>,
        options: FindOptions,
    ) -> Result<Vec<Product>, StoreError> {
        let cursor = self.products.find(filter, options).await?;
        let docs: Vec<ProductDocument> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(Product::from).collect())
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn create(&self, user: User) -> Result<(), StoreError> {
        match self.users.insert_one(UserDocument::from(user), None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::DuplicateKey),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let found = self.users.find_one(doc! { "email": email }, None).await?;
        Ok(found.map(User::from))
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        let found = self.users.find_one(doc! { "_id": id }, None).await?;
        Ok(found.map(User::from))
    }

    async fn increment_item(&self, id: &ObjectId, item_id: i64) -> Result<bool, StoreError> {
        let result = self
            .users
            .update_one(doc! { "_id": id }, increment_update(item_id), None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn decrement_item(&self, id: &ObjectId, item_id: i64) -> Result<bool, StoreError> {
        let result = self
            .users
            .update_one(decrement_filter(id, item_id), decrement_update(item_id), None)
            .await?;
        if result.matched_count == 1 {
            return Ok(true);
        }
        // Nothing to take away, or no such user.
        self.user_exists(id).await
    }

    async fn set_item(
        &self,
        id: &ObjectId,
        item_id: i64,
        quantity: i64,
    ) -> Result<bool, StoreError> {
        let result = self
            .users
            .update_one(doc! { "_id": id }, set_quantity_update(item_id, quantity), None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn clear_cart(&self, id: &ObjectId) -> Result<bool, StoreError> {
        let result = self
            .users
            .update_one(doc! { "_id": id }, doc! { "$set": { "cartData": {} } }, None)
            .await?;
        Ok(result.matched_count == 1)
    }
}

#[async_trait]
impl ProductStore for MongoStore {
    async fn all(&self) -> Result<Vec<Product>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        self.find_products(None, options).await
    }

    async fn newest(&self, count: usize) -> Result<Vec<Product>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "_id": -1 })
            .limit(count as i64)
            .build();
        let mut products = self.find_products(None, options).await?;
        products.reverse();
        Ok(products)
    }

    async fn by_category(&self, category: &str, limit: usize) -> Result<Vec<Product>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "_id": 1 })
            .limit(limit as i64)
            .build();
        self.find_products(doc! { "category": category }, options).await
    }

    async fn insert(&self, product: NewProduct) -> Result<Product, StoreError> {
        let id = self.next_product_id().await?;
        let product = product.into_product(id);
        self.products
            .insert_one(ProductDocument::from(product.clone()), None)
            .await?;
        Ok(product)
    }

    async fn remove(&self, id: i64) -> Result<Option<Product>, StoreError> {
        let removed = self.products.find_one_and_delete(doc! { "id": id }, None).await?;
        Ok(removed.map(Product::from))
    }
}
