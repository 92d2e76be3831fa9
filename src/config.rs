// src/config.rs
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-8b";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_COUNSELOR_CONTACT: &str = "+91-9999-888-777";
const DEV_JWT_SECRET: &str = "dev_secret";

const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://localhost:5174",
    "http://localhost:5175",
    "http://localhost:5176",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime configuration, read once at startup from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_refresh_secret: Option<String>,
    pub jwt_expires_in: Duration,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub counselor_contact: String,
    pub cors_origins: Vec<String>,
    pub assessment_ttl: Duration,
    pub assessment_store_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't have to touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None if cfg!(debug_assertions) => {
                tracing::warn!("JWT_SECRET not set, falling back to an insecure development secret");
                DEV_JWT_SECRET.to_string()
            }
            None => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        let cors_origins = match get("CORS_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        Ok(Config {
            database_url,
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            jwt_secret,
            jwt_refresh_secret: get("JWT_REFRESH_SECRET"),
            jwt_expires_in: Duration::from_secs(parse_or(
                "JWT_EXPIRES_IN_SECS",
                get("JWT_EXPIRES_IN_SECS"),
                24 * 60 * 60,
            )?),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            counselor_contact: get("COUNSELOR_CONTACT")
                .unwrap_or_else(|| DEFAULT_COUNSELOR_CONTACT.to_string()),
            cors_origins,
            assessment_ttl: Duration::from_secs(parse_or(
                "ASSESSMENT_TTL_SECS",
                get("ASSESSMENT_TTL_SECS"),
                24 * 60 * 60,
            )?),
            assessment_store_capacity: parse_or(
                "ASSESSMENT_STORE_CAPACITY",
                get("ASSESSMENT_STORE_CAPACITY"),
                10_000,
            )?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/hopeline"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.port, 4000);
        assert_eq!(config.gemini_model, "gemini-1.5-flash-8b");
        assert_eq!(config.jwt_expires_in, Duration::from_secs(86_400));
        assert_eq!(config.cors_origins.len(), 5);
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.counselor_contact, "+91-9999-888-777");
    }

    #[test]
    fn test_missing_database_url_is_an_error() {
        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "x")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/hopeline"),
            ("JWT_SECRET", "x"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn test_cors_origins_are_split_and_trimmed() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/hopeline"),
            ("JWT_SECRET", "x"),
            ("CORS_ORIGINS", "https://a.example, https://b.example ,"),
        ]))
        .unwrap();
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
    }
}
