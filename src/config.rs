use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub blob_dir: String,
    pub public_base_url: String,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: i64,
    pub signed_url_ttl_secs: i64,
    pub notify_from: String,
    pub max_body_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000);
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}"));
        Ok(Self {
            database_url,
            jwt_secret,
            blob_dir: env::var("BLOB_DIR").unwrap_or_else(|_| "./data/uploads".to_string()),
            public_base_url,
            rate_limit_max: parse_or("RATE_LIMIT_MAX", 5),
            rate_limit_window_secs: parse_or("RATE_LIMIT_WINDOW_SECS", 60 * 60),
            signed_url_ttl_secs: parse_or("SIGNED_URL_TTL_SECS", 300),
            notify_from: env::var("NOTIFY_FROM").unwrap_or_else(|_| "orders@localhost".to_string()),
            max_body_bytes: parse_or("MAX_BODY_BYTES", 16 * 1024 * 1024),
            host,
            port,
        })
    }

    /// Defaults suitable for tests and local tooling; no environment is read.
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            jwt_secret: "test-secret".to_string(),
            blob_dir: "./data/uploads".to_string(),
            public_base_url: "http://127.0.0.1:3000".to_string(),
            rate_limit_max: 5,
            rate_limit_window_secs: 60 * 60,
            signed_url_ttl_secs: 300,
            notify_from: "orders@localhost".to_string(),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
