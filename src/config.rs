use std::env;
use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
}

/// Process-wide settings, read once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub mongodb_uri: String,
    pub database_name: String,
    pub cors_origin: String,
    pub assets_dir: String,
    pub body_limit_bytes: usize,
    pub currency_symbol: String,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub assistant: AssistantConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = parse_or(&get, "PORT", 5000)?;
        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: raw,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], port)),
        };

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let username = get("SMTP_USER").or_else(|| get("GMAIL_USER"));
        let from_address = get("MAIL_FROM")
            .or_else(|| username.clone())
            .unwrap_or_else(|| "finance-tracker@localhost".to_string());

        Ok(Self {
            bind_addr,
            mongodb_uri: get("MONGODB_URI")
                .or_else(|| get("MONGO_URI"))
                .unwrap_or_else(|| "mongodb://localhost:27017/finance_tracker".to_string()),
            database_name: get("MONGODB_DB").unwrap_or_else(|| "finance_tracker".to_string()),
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string()),
            assets_dir: get("ASSETS_DIR").unwrap_or_else(|| "assets".to_string()),
            body_limit_bytes: parse_or(&get, "BODY_LIMIT_BYTES", 2 * 1024 * 1024)?,
            currency_symbol: get("CURRENCY_SYMBOL").unwrap_or_else(|| "₹".to_string()),
            auth: AuthConfig {
                jwt_secret,
                token_ttl_hours: parse_or(&get, "TOKEN_TTL_HOURS", 24)?,
                argon2_memory_kib: parse_or(&get, "ARGON2_MEMORY_KIB", 65536)?,
                argon2_iterations: parse_or(&get, "ARGON2_ITERATIONS", 8)?,
                argon2_parallelism: parse_or(&get, "ARGON2_PARALLELISM", 4)?,
            },
            mail: MailConfig {
                smtp_host: get("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                smtp_port: parse_or(&get, "SMTP_PORT", 587)?,
                username,
                password: get("SMTP_PASS").or_else(|| get("GMAIL_PASS")),
                from_address,
            },
            assistant: AssistantConfig {
                api_url: get("LLM_API_URL").unwrap_or_else(|| {
                    "https://openrouter.ai/api/v1/chat/completions".to_string()
                }),
                api_key: get("LLM_API_KEY"),
                model: get("LLM_MODEL").unwrap_or_else(|| "openrouter/auto".to_string()),
                max_tokens: parse_or(&get, "LLM_MAX_TOKENS", 256)?,
            },
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}
