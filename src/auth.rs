//! Account creation, credential checks and token handling.

use argon2::{self, Config as ArgonConfig};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use rand::Rng;

use crate::error::AppError;
use crate::models::{Claims, ClaimsUser, Profile, User};
use crate::store::{StoreError, UserStore};

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt: [u8; 16] = rand::thread_rng().gen();
    let config = ArgonConfig::default();
    Ok(argon2::hash_encoded(password.as_bytes(), &salt, &config)?)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    argon2::verify_encoded(hash, password.as_bytes()).unwrap_or(false)
}

/// Signs and verifies bearer tokens with one shared HS256 secret.
#[derive(Clone)]
pub struct Tokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Tokens {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Tokens {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, user_id: &ObjectId) -> Result<String, AppError> {
        let claims = Claims {
            user: ClaimsUser { id: user_id.to_hex() },
            iat: chrono::Utc::now().timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Yields the user id embedded in `token`.
    pub fn authenticate(&self, token: &str) -> Result<ObjectId, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| AppError::Unauthenticated)?;
        ObjectId::parse_str(&data.claims.user.id).map_err(|_| AppError::Unauthenticated)
    }
}

pub async fn signup(
    users: &dyn UserStore,
    tokens: &Tokens,
    name: &str,
    email: &str,
    password: &str,
) -> Result<String, AppError> {
    if users.find_by_email(email).await?.is_some() {
        return Err(AppError::DuplicateEmail);
    }

    let user = User::new(name.to_string(), email.to_string(), hash_password(password)?);
    let id = user.id;
    match users.create(user).await {
        Ok(()) => {}
        // Lost a race with another signup for the same email.
        Err(StoreError::DuplicateKey) => return Err(AppError::DuplicateEmail),
        Err(e) => return Err(e.into()),
    }
    log::info!("Created account {}", id);

    tokens.issue(&id)
}

pub async fn login(
    users: &dyn UserStore,
    tokens: &Tokens,
    email: &str,
    password: &str,
) -> Result<String, AppError> {
    match users.find_by_email(email).await? {
        Some(user) if verify_password(&user.password, password) => tokens.issue(&user.id),
        _ => Err(AppError::InvalidCredentials),
    }
}

pub async fn profile(users: &dyn UserStore, id: &ObjectId) -> Result<Profile, AppError> {
    let user = users.find_by_id(id).await?.ok_or(AppError::Unauthenticated)?;
    Ok(Profile {
        id: user.id.to_hex(),
        name: user.name,
        email: user.email,
    })
}
