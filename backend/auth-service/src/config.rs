/// Configuration management
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,

    /// Access token lifetime in seconds (15 minutes).
    #[serde(default = "default_access_token_ttl_secs")]
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds (7 days). Session records share it.
    #[serde(default = "default_refresh_token_ttl_secs")]
    pub refresh_token_ttl_secs: i64,
    /// Lifetime of purpose-marked password-reset tokens.
    #[serde(default = "default_password_reset_ttl_secs")]
    pub password_reset_ttl_secs: i64,

    #[serde(default = "default_max_failed_login_attempts")]
    pub max_failed_login_attempts: u32,
    #[serde(default = "default_lockout_duration_secs")]
    pub lockout_duration_secs: i64,

    /// Security event retention window in seconds (90 days).
    #[serde(default = "default_security_log_retention_secs")]
    pub security_log_retention_secs: u64,
    #[serde(default = "default_user_cache_ttl_secs")]
    pub user_cache_ttl_secs: u64,

    pub kafka_brokers: Option<String>,
    #[serde(default = "default_kafka_topic")]
    pub kafka_topic: String,
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_access_token_ttl_secs() -> i64 {
    900
}

fn default_refresh_token_ttl_secs() -> i64 {
    604_800
}

fn default_password_reset_ttl_secs() -> i64 {
    3600
}

fn default_max_failed_login_attempts() -> u32 {
    5
}

fn default_lockout_duration_secs() -> i64 {
    1800
}

fn default_security_log_retention_secs() -> u64 {
    7_776_000
}

fn default_user_cache_ttl_secs() -> u64 {
    3600
}

fn default_kafka_topic() -> String {
    "auth-events".to_string()
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}
