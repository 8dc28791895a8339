use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::Tokens;
use crate::config::{Config, DEFAULT_MAX_UPLOAD_BYTES};
use crate::db::{self, MongoStore};
use crate::store::{MemoryStore, ProductStore, StoreError, UserStore};

/// Shared handler state: both stores, the token keys and the image directory.
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub products: Arc<dyn ProductStore>,
    pub tokens: Tokens,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub async fn new(config: &Config) -> Result<Self, StoreError> {
        let tokens = Tokens::new(&config.jwt_secret);
        let state = match &config.database_url {
            Some(url) => {
                let database = db::connect(url, &config.database_name).await?;
                let store = Arc::new(MongoStore::init(&database).await?);
                log::info!("Connected to database {}", config.database_name);
                Self::with_store(store, tokens, config.upload_dir.clone())
            }
            None => Self::with_store(
                Arc::new(MemoryStore::new()),
                tokens,
                config.upload_dir.clone(),
            ),
        };
        Ok(state.with_upload_limit(config.max_upload_bytes))
    }

    pub fn with_store<S>(store: Arc<S>, tokens: Tokens, upload_dir: PathBuf) -> Self
    where
        S: UserStore + ProductStore + 'static,
    {
        AppState {
            users: store.clone(),
            products: store,
            tokens,
            upload_dir,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_upload_limit(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}
