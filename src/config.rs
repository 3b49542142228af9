//! Configuration handling for the web application.
//!
//! Everything is supplied as a flat set of CLI flags that can also be set
//! through `WEBAPP_*` environment variables.

use crate::db::DatabaseType;
use crate::error::{OrmError, OrmResult};
use clap::{ArgAction, Parser};
use std::time::Duration;
use url::Url;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 9000;

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_DB_NAME: &str = "webapp";
pub const DEFAULT_CHARSET: &str = "utf8";

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Options used to open the database context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseOptions {
    /// Full connection URL. When set it wins over the host/port/user parts.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Sensitive - never log
    pub password: String,
    pub database: String,
    pub charset: String,
    pub min_connections: u32,
    pub max_connections: u32,
    /// Default commit mode for model mutations. When false every write runs
    /// in an explicit transaction.
    pub autocommit: bool,
    pub acquire_timeout_secs: u64,
}

impl DatabaseOptions {
    /// MySQL options with the stated defaults.
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            url: None,
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            user: user.into(),
            password: password.into(),
            database: database.into(),
            charset: DEFAULT_CHARSET.to_string(),
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            autocommit: true,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }

    /// Options for an explicit connection URL (`mysql://`, `postgres://`, `sqlite:`).
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::new("", "", "")
        }
    }

    pub fn with_pool_size(mut self, min: u32, max: u32) -> Self {
        self.min_connections = min;
        self.max_connections = max;
        self
    }

    pub fn with_autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    /// Backend selected by these options.
    pub fn db_type(&self) -> OrmResult<DatabaseType> {
        match &self.url {
            None => Ok(DatabaseType::MySql),
            Some(url) => DatabaseType::from_connection_string(url).ok_or_else(|| {
                OrmError::connection(
                    "Unknown database type in connection URL",
                    "Use a mysql://, postgres:// or sqlite: URL",
                )
            }),
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Validate pool bounds.
    pub fn validate(&self) -> OrmResult<()> {
        if self.max_connections == 0 {
            return Err(OrmError::invalid_argument(
                "max_connections must be greater than 0",
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(OrmError::invalid_argument(format!(
                "min_connections ({}) cannot exceed max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }

    /// Display-safe connection target (password masked).
    pub fn masked_target(&self) -> String {
        match &self.url {
            Some(raw) => match Url::parse(raw) {
                Ok(mut url) => {
                    if url.password().is_some() {
                        let _ = url.set_password(Some("****"));
                    }
                    url.to_string()
                }
                Err(_) => raw.clone(),
            },
            None => format!(
                "mysql://{}:****@{}:{}/{}",
                self.user, self.host, self.port, self.database
            ),
        }
    }
}

/// Configuration for the web application.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "awesome-webapp",
    about = "Minimal web backend with a declarative ORM over pooled SQL connections",
    version,
    author
)]
pub struct Config {
    /// HTTP host to bind to
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "WEBAPP_HTTP_HOST")]
    pub http_host: String,

    /// HTTP port to bind to
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "WEBAPP_HTTP_PORT")]
    pub http_port: u16,

    /// Full database URL; overrides the --db-host/--db-port/... parts
    #[arg(long, value_name = "URL", env = "WEBAPP_DB_URL")]
    pub db_url: Option<String>,

    #[arg(long, default_value = DEFAULT_DB_HOST, env = "WEBAPP_DB_HOST")]
    pub db_host: String,

    #[arg(long, default_value_t = DEFAULT_DB_PORT, env = "WEBAPP_DB_PORT")]
    pub db_port: u16,

    /// Database user. Without a user (or --db-url) no database is opened.
    #[arg(long, env = "WEBAPP_DB_USER")]
    pub db_user: Option<String>,

    #[arg(long, default_value = "", env = "WEBAPP_DB_PASSWORD", hide_env_values = true)]
    pub db_password: String,

    #[arg(long, default_value = DEFAULT_DB_NAME, env = "WEBAPP_DB_NAME")]
    pub db_name: String,

    #[arg(long, default_value = DEFAULT_CHARSET, env = "WEBAPP_DB_CHARSET")]
    pub db_charset: String,

    #[arg(long, default_value_t = DEFAULT_MIN_CONNECTIONS, env = "WEBAPP_DB_MIN_CONNECTIONS")]
    pub db_min_connections: u32,

    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS, env = "WEBAPP_DB_MAX_CONNECTIONS")]
    pub db_max_connections: u32,

    /// Commit each statement on its own (false: wrap writes in a transaction)
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        env = "WEBAPP_DB_AUTOCOMMIT"
    )]
    pub db_autocommit: bool,

    /// Seconds to wait for a pooled connection
    #[arg(long, default_value_t = DEFAULT_ACQUIRE_TIMEOUT_SECS, env = "WEBAPP_DB_ACQUIRE_TIMEOUT")]
    pub db_acquire_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "WEBAPP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "WEBAPP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            db_url: None,
            db_host: DEFAULT_DB_HOST.to_string(),
            db_port: DEFAULT_DB_PORT,
            db_user: None,
            db_password: String::new(),
            db_name: DEFAULT_DB_NAME.to_string(),
            db_charset: DEFAULT_CHARSET.to_string(),
            db_min_connections: DEFAULT_MIN_CONNECTIONS,
            db_max_connections: DEFAULT_MAX_CONNECTIONS,
            db_autocommit: true,
            db_acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Database options, or `None` when no database was configured.
    pub fn database_options(&self) -> Option<DatabaseOptions> {
        if self.db_url.is_none() && self.db_user.is_none() {
            return None;
        }
        Some(DatabaseOptions {
            url: self.db_url.clone(),
            host: self.db_host.clone(),
            port: self.db_port,
            user: self.db_user.clone().unwrap_or_default(),
            password: self.db_password.clone(),
            database: self.db_name.clone(),
            charset: self.db_charset.clone(),
            min_connections: self.db_min_connections,
            max_connections: self.db_max_connections,
            autocommit: self.db_autocommit,
            acquire_timeout_secs: self.db_acquire_timeout,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
