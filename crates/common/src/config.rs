//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Site behaviour (list sizes, tag limits).
    #[serde(default)]
    pub site: SiteConfig,
    /// Outgoing email configuration.
    #[serde(default)]
    pub email: EmailSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance, used for links in emails.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait when opening a new connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Seconds a request may wait for a pooled connection.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Seconds an idle connection is kept open.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Seconds after which a connection is recycled.
    #[serde(default = "default_max_lifetime_secs")]
    pub max_lifetime_secs: u64,
    /// Log every SQL statement at debug level.
    #[serde(default)]
    pub log_statements: bool,
}

/// Site configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Site name shown in emails.
    #[serde(default = "default_site_name")]
    pub name: String,
    /// Number of questions returned by the trending list.
    #[serde(default = "default_trending_questions")]
    pub trending_questions: u64,
    /// Number of questions returned by the other lists.
    #[serde(default = "default_list_limit")]
    pub list_limit: u64,
    /// Maximum number of tags on a single question.
    #[serde(default = "default_max_tags")]
    pub max_tags_per_question: usize,
}

/// Email configuration.
///
/// When `smtp_host` is unset, messages are rendered and logged instead of sent.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    /// Whether answer notifications are emailed at all.
    #[serde(default)]
    pub enabled: bool,
    /// Sender address.
    #[serde(default = "default_from_address")]
    pub from_address: String,
    /// SMTP relay host.
    #[serde(default)]
    pub smtp_host: Option<String>,
    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub smtp_username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            trending_questions: default_trending_questions(),
            list_limit: default_list_limit(),
            max_tags_per_question: default_max_tags(),
        }
    }
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            from_address: default_from_address(),
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

const fn default_acquire_timeout_secs() -> u64 {
    10
}

const fn default_idle_timeout_secs() -> u64 {
    600
}

const fn default_max_lifetime_secs() -> u64 {
    1800
}

fn default_site_name() -> String {
    "Hasker".to_string()
}

const fn default_trending_questions() -> u64 {
    20
}

const fn default_list_limit() -> u64 {
    20
}

const fn default_max_tags() -> usize {
    3
}

fn default_from_address() -> String {
    "example@hasker.com".to_string()
}

const fn default_smtp_port() -> u16 {
    587
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, exported into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `HASKER_ENV`)
    /// 4. Environment variables with `HASKER_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        // A missing .env file is fine; real deployments use the environment.
        let _ = dotenvy::dotenv();

        let env = std::env::var("HASKER_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("HASKER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("HASKER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Public base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.server.url.trim_end_matches('/')
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn from_toml(src: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(src, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let config = from_toml(
            r#"
            [server]
            url = "https://hasker.example/"

            [database]
            url = "postgres://localhost/hasker"
            "#,
        );

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.acquire_timeout_secs, 10);
        assert_eq!(config.database.max_lifetime_secs, 1800);
        assert!(!config.database.log_statements);
        assert_eq!(config.site.trending_questions, 20);
        assert_eq!(config.site.max_tags_per_question, 3);
        assert!(!config.email.enabled);
        assert_eq!(config.email.from_address, "example@hasker.com");
        assert_eq!(config.base_url(), "https://hasker.example");
    }

    #[test]
    fn test_site_overrides() {
        let config = from_toml(
            r#"
            [server]
            url = "http://localhost:3000"

            [database]
            url = "postgres://localhost/hasker"

            [site]
            name = "Ask Me"
            trending_questions = 5
            "#,
        );

        assert_eq!(config.site.name, "Ask Me");
        assert_eq!(config.site.trending_questions, 5);
        assert_eq!(config.site.list_limit, 20);
    }
}
