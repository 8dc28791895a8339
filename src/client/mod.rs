//! Storefront client for the REST API.
//!
//! A [`Session`] owns the bearer token obtained at login or signup. Cart
//! access is borrowed from it ([`ShopClient::cart`]), so nothing that talks to
//! the cart can outlive the session it was opened with. Logging out is
//! dropping the session.

pub mod checkout;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::middleware::TOKEN_HEADER;
use crate::models::{AuthResponse, CartItemInput, CartMap, Claims, Product};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// A logged-in user's credentials.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Session { token: token.into() }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// The user id carried in the token payload. The signature is not
    /// checked here; only the server can do that.
    pub fn user_id(&self) -> Option<String> {
        let payload = self.token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let claims: Claims = serde_json::from_slice(&bytes).ok()?;
        Some(claims.user.id)
    }
}

#[derive(Debug, Clone)]
pub struct ShopClient {
    http: reqwest::Client,
    base_url: String,
}

impl ShopClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        ShopClient {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::Status { status, body })
        }
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let auth: AuthResponse = self
            .post_json("/login", &json!({ "email": email, "password": password }))
            .await?;
        Ok(Session::new(auth.token))
    }

    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, ClientError> {
        let body = json!({ "username": username, "email": email, "password": password });
        let auth: AuthResponse = self.post_json("/signup", &body).await?;
        Ok(Session::new(auth.token))
    }

    pub async fn all_products(&self) -> Result<Vec<Product>, ClientError> {
        let response = self.http.get(self.url("/allproducts")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Cart operations on behalf of `session`.
    pub fn cart<'s>(&'s self, session: &'s Session) -> HttpCartApi<'s> {
        HttpCartApi {
            client: self,
            session,
        }
    }
}

/// The cart endpoints the checkout flow needs.
#[async_trait]
pub trait CartApi: Send + Sync {
    async fn get_cart(&self) -> Result<CartMap, ClientError>;

    /// Takes one unit of `item_id` out of the cart.
    async fn remove_one(&self, item_id: i64) -> Result<(), ClientError>;

    /// Empties the cart in one call.
    async fn clear(&self) -> Result<(), ClientError>;
}

pub struct HttpCartApi<'s> {
    client: &'s ShopClient,
    session: &'s Session,
}

impl<'s> HttpCartApi<'s> {
    async fn post(
        &self,
        path: &str,
        body: Option<&CartItemInput>,
    ) -> Result<reqwest::Response, ClientError> {
        let mut request = self
            .client
            .http
            .post(self.client.url(path))
            .header(TOKEN_HEADER, self.session.token());
        if let Some(body) = body {
            request = request.json(body);
        }
        ShopClient::check(request.send().await?).await
    }

    /// Puts one unit of `item_id` into the cart.
    pub async fn add_one(&self, item_id: i64) -> Result<(), ClientError> {
        self.post("/addtocart", Some(&CartItemInput { item_id })).await?;
        Ok(())
    }
}

#[async_trait]
impl<'s> CartApi for HttpCartApi<'s> {
    async fn get_cart(&self) -> Result<CartMap, ClientError> {
        Ok(self.post("/getcart", None).await?.json().await?)
    }

    async fn remove_one(&self, item_id: i64) -> Result<(), ClientError> {
        self.post("/removefromcart", Some(&CartItemInput { item_id })).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        self.post("/clearcart", None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Tokens;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn session_reads_the_user_id_from_the_token() {
        let id = ObjectId::new();
        let token = Tokens::new("secret").issue(&id).unwrap();

        let session = Session::new(token);
        assert_eq!(session.user_id(), Some(id.to_hex()));
    }

    #[test]
    fn garbage_tokens_have_no_user() {
        assert_eq!(Session::new("abc").user_id(), None);
        assert_eq!(Session::new("a.%%%.c").user_id(), None);
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let client = ShopClient::new("http://localhost:4000/");
        assert_eq!(client.url("/getcart"), "http://localhost:4000/getcart");
    }
}
