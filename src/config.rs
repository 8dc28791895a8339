use std::env;
use std::path::PathBuf;

use log::{info, warn};
use thiserror::Error;

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_DATABASE_NAME: &str = "ecommerce";
const DEFAULT_JWT_SECRET: &str = "secret_ecom";
const DEFAULT_UPLOAD_DIR: &str = "upload/images";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// `None` runs the server on the in-memory store.
    pub database_url: Option<String>,
    pub database_name: String,
    pub jwt_secret: String,
    pub cors_origins: CorsOrigins,
    pub upload_dir: PathBuf,
    /// Largest image `/upload` accepts.
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value })?,
            None => {
                info!("PORT not set, using default: {}", DEFAULT_PORT);
                DEFAULT_PORT
            }
        };

        let database_url = lookup("DATABASE_URL").or_else(|| lookup("MONGO_URI"));
        if database_url.is_none() {
            warn!("DATABASE_URL not set, data will be kept in memory only");
        }

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using the built-in development secret");
            DEFAULT_JWT_SECRET.to_string()
        });

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(bytes) if bytes > 0 => bytes,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "MAX_UPLOAD_BYTES",
                        value,
                    })
                }
            },
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let cors_origins = parse_origins(lookup("CORS_ORIGIN").as_deref().unwrap_or("*"));

        Ok(Config {
            port,
            database_url,
            database_name: lookup("DATABASE_NAME")
                .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
            jwt_secret,
            cors_origins,
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            max_upload_bytes,
        })
    }
}

fn parse_origins(raw: &str) -> CorsOrigins {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect();

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsOrigins::Any
    } else {
        CorsOrigins::List(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.database_url, None);
        assert_eq!(config.database_name, "ecommerce");
        assert_eq!(config.jwt_secret, "secret_ecom");
        assert_eq!(config.cors_origins, CorsOrigins::Any);
        assert_eq!(config.upload_dir, PathBuf::from("upload/images"));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn mongo_uri_is_an_alias() {
        let config = load(&[("MONGO_URI", "mongodb://db:27017")]).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("mongodb://db:27017"));
    }

    #[test]
    fn origin_lists_are_split() {
        let config = load(&[("CORS_ORIGIN", "http://a.test, http://b.test")]).unwrap();
        assert_eq!(
            config.cors_origins,
            CorsOrigins::List(vec!["http://a.test".into(), "http://b.test".into()])
        );
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn upload_limit_must_be_a_positive_size() {
        assert_eq!(load(&[("MAX_UPLOAD_BYTES", "1024")]).unwrap().max_upload_bytes, 1024);
        assert!(load(&[("MAX_UPLOAD_BYTES", "0")]).is_err());
        assert!(load(&[("MAX_UPLOAD_BYTES", "lots")]).is_err());
    }
}
