use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Hosted identity service owns credentials; approvals live in a side table.
    Managed,
    /// Credentials are argon2 hashes in the `accounts` table.
    Local,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "managed" => Ok(AuthMode::Managed),
            "local" => Ok(AuthMode::Local),
            other => Err(format!("unknown auth mode '{}'", other)),
        }
    }
}

/// Where a rejected account is sent after login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectedRoute {
    AccessDenied,
    AwaitingApproval,
}

impl FromStr for RejectedRoute {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "access_denied" => Ok(RejectedRoute::AccessDenied),
            "awaiting_approval" => Ok(RejectedRoute::AwaitingApproval),
            other => Err(format!("unknown rejected route '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    pub jwt_secret: String,
    pub session_ttl_minutes: i64,
    pub auth_mode: AuthMode,
    pub admin_emails: Vec<String>,
    pub rejected_route: RejectedRoute,
    pub supabase_url: String,
    pub supabase_anon_key: Option<String>,
    pub supabase_service_key: String,
    pub storage_bucket: String,
    pub placeholder_image_url: String,
    pub catalog_page_size: usize,
    pub gateway_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub auth_rps: u32,
    pub max_upload_bytes: usize,
    pub cors_origin: Option<String>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let supabase_url = get_env("SUPABASE_URL")?;
        url::Url::parse(&supabase_url)
            .map_err(|e| Error::Config(format!("Invalid value for SUPABASE_URL: {}", e)))?;

        let config = Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            db_max_connections: get_env_parse_or("DB_MAX_CONNECTIONS", 10)?,
            run_migrations: get_env_parse_or("RUN_MIGRATIONS", false)?,
            jwt_secret: get_env("JWT_SECRET")?,
            session_ttl_minutes: get_env_parse_or("SESSION_TTL_MINUTES", 720)?,
            auth_mode: get_env_parse_or("AUTH_MODE", AuthMode::Local)?,
            admin_emails: parse_email_list(&env::var("ADMIN_EMAILS").unwrap_or_default()),
            rejected_route: get_env_parse_or("REJECTED_ROUTE", RejectedRoute::AccessDenied)?,
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key: env::var("SUPABASE_ANON_KEY").ok(),
            supabase_service_key: get_env("SUPABASE_SERVICE_KEY")?,
            storage_bucket: env::var("STORAGE_BUCKET").unwrap_or_else(|_| "stones".to_string()),
            placeholder_image_url: env::var("PLACEHOLDER_IMAGE_URL")
                .unwrap_or_else(|_| "/static/placeholder-stone.png".to_string()),
            catalog_page_size: get_env_parse_or("CATALOG_PAGE_SIZE", 12)?,
            gateway_timeout_secs: get_env_parse_or("GATEWAY_TIMEOUT_SECS", 15)?,
            request_timeout_secs: get_env_parse_or("REQUEST_TIMEOUT_SECS", 30)?,
            auth_rps: get_env_parse_or("AUTH_RPS", 10)?,
            max_upload_bytes: get_env_parse_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|s| !s.trim().is_empty()),
        };

        if config.auth_mode == AuthMode::Managed && config.supabase_anon_key.is_none() {
            return Err(Error::Config(
                "SUPABASE_ANON_KEY is required when AUTH_MODE=managed".to_string(),
            ));
        }

        Ok(config)
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        _ => Ok(default),
    }
}

pub fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
