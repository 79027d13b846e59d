use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::crypto::PasswordScheme;
use crate::error::AppError;

#[derive(Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub session_expiry_hours: i64,
    pub request_timeout_secs: u64,
    pub password_scheme: PasswordScheme,
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub initial_context_path: PathBuf,
    pub machine_purge_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_host: std::env::var("SERVER_HOST")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: parse_var("SERVER_PORT", "8080")?,
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://challenge_hub.db?mode=rwc".to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", "20")?,
            db_min_connections: parse_var("DB_MIN_CONNECTIONS", "5")?,
            session_expiry_hours: parse_var("SESSION_EXPIRY_HOURS", "24")?,
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", "120")?,
            password_scheme: parse_var("PASSWORD_SCHEME", "legacy")?,
            llm_api_key: std::env::var("LLM_API_KEY")
                .map_err(|_| AppError::Config("LLM_API_KEY must be set".to_string()))?,
            llm_base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            llm_model: std::env::var("LLM_MODEL")
                .unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
            initial_context_path: std::env::var("INITIAL_CONTEXT_PATH")
                .unwrap_or_else(|_| "initial_context.txt".to_string())
                .into(),
            machine_purge_interval_secs: parse_var("MACHINE_PURGE_INTERVAL_SECS", "0")?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("database_url", &self.database_url)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("session_expiry_hours", &self.session_expiry_hours)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("password_scheme", &self.password_scheme)
            .field("llm_api_key", &"[REDACTED]")
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_model", &self.llm_model)
            .field("initial_context_path", &self.initial_context_path)
            .field("machine_purge_interval_secs", &self.machine_purge_interval_secs)
            .finish()
    }
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e)))
}
