use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Product id (as a string key) to quantity. Absent keys mean zero.
pub type CartMap = BTreeMap<String, i64>;

/// Quantity held for `item_id`, zero when the cart has no entry for it.
pub fn cart_quantity(cart: &CartMap, item_id: i64) -> i64 {
    cart.get(&item_id.to_string()).copied().unwrap_or(0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub password: String, // argon2 encoded hash
    #[serde(rename = "cartData", default)]
    pub cart_data: CartMap,
    pub date: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        User {
            id: ObjectId::new(),
            name,
            email,
            password: password_hash,
            cart_data: CartMap::new(),
            date: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignUpInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimsUser {
    pub id: String,
}

/// Token payload. No `exp`, tokens never expire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user: ClaimsUser,
    pub iat: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub seq: i64,
}

fn available_default() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image: String,
    pub category: String,
    #[serde(default)]
    pub new_price: Option<f64>,
    #[serde(default)]
    pub old_price: Option<f64>,
    pub date: DateTime<Utc>,
    #[serde(default = "available_default", alias = "avilable")]
    pub available: bool,
}

/// Fields accepted by `/addproduct`; the id and date are assigned on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub image: String,
    pub category: String,
    #[serde(default)]
    pub new_price: Option<f64>,
    #[serde(default)]
    pub old_price: Option<f64>,
}

impl NewProduct {
    pub fn into_product(self, id: i64) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            image: self.image,
            category: self.category,
            new_price: self.new_price,
            old_price: self.old_price,
            date: Utc::now(),
            available: true,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RemoveProductInput {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductResponse {
    pub success: bool,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryInput {
    pub category: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemInput {
    pub item_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetQuantityInput {
    pub item_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: u8,
    pub image_url: String,
}
