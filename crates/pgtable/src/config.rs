//! Connection settings.
//!
//! [`DbConfig`] can be read from a TOML file with a `[database]` table, from a
//! `DATABASE_URL`, or from discrete `DB_*` environment variables:
//!
//! ```toml
//! [database]
//! host = "localhost"
//! dbname = "app"
//! username = "app"
//! password = "${APP_DB_PASSWORD}"
//! max_connections = 8
//! ```
//!
//! String values in the file may reference environment variables as `${NAME}`.

use crate::error::{QbError, QbResult};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_MAX_CONNECTIONS: usize = 16;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DbConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub dbname: String,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Pool size used by [`Database::connect`](crate::Database::connect).
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    database: DbConfig,
}

impl DbConfig {
    /// Settings with default host, port and pool size.
    pub fn new(dbname: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            dbname: dbname.into(),
            username: username.into(),
            password: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn max_connections(mut self, n: usize) -> Self {
        self.max_connections = n;
        self
    }

    /// Parse the `[database]` table of a TOML document.
    pub fn from_toml_str(raw: &str) -> QbResult<Self> {
        let file: ConfigFile = toml::from_str(raw)
            .map_err(|e| QbError::Config(format!("failed to parse config: {e}")))?;
        let mut config = file.database;
        config.expand_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> QbResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            QbError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse a `postgres://` URL or key/value connection string.
    pub fn from_url(url: &str) -> QbResult<Self> {
        let pg: tokio_postgres::Config = url
            .parse()
            .map_err(|e: tokio_postgres::Error| QbError::Config(format!("invalid DATABASE_URL: {e}")))?;

        let host = match pg.get_hosts().first() {
            Some(tokio_postgres::config::Host::Tcp(h)) => h.clone(),
            #[cfg(unix)]
            Some(tokio_postgres::config::Host::Unix(p)) => p.display().to_string(),
            None => default_host(),
        };
        let password = pg
            .get_password()
            .map(|p| String::from_utf8_lossy(p).into_owned());

        let config = Self {
            host,
            port: pg.get_ports().first().copied().unwrap_or(DEFAULT_PORT),
            dbname: pg.get_dbname().unwrap_or_default().to_string(),
            username: pg.get_user().unwrap_or_default().to_string(),
            password,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        };
        config.validate()?;
        Ok(config)
    }

    /// Read settings from `DATABASE_URL`, or from `DB_HOST`, `DB_PORT`, `DB_NAME`,
    /// `DB_USER`, `DB_PASSWORD` and `DB_MAX_CONNECTIONS`.
    pub fn from_env() -> QbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> QbResult<Self> {
        let mut config = match lookup("DATABASE_URL") {
            Some(url) => Self::from_url(&url)?,
            None => {
                let required = |key: &str| {
                    lookup(key).ok_or_else(|| QbError::Config(format!("{key} is not set")))
                };
                let mut config = Self::new(required("DB_NAME")?, required("DB_USER")?);
                if let Some(host) = lookup("DB_HOST") {
                    config.host = host;
                }
                if let Some(port) = lookup("DB_PORT") {
                    config.port = port
                        .parse()
                        .map_err(|e| QbError::Config(format!("invalid DB_PORT {port:?}: {e}")))?;
                }
                config.password = lookup("DB_PASSWORD");
                config
            }
        };
        if let Some(n) = lookup("DB_MAX_CONNECTIONS") {
            config.max_connections = n
                .parse()
                .map_err(|e| QbError::Config(format!("invalid DB_MAX_CONNECTIONS {n:?}: {e}")))?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> QbResult<()> {
        if self.host.trim().is_empty() {
            return Err(QbError::Config("database host is empty".into()));
        }
        if self.dbname.trim().is_empty() {
            return Err(QbError::Config("database name is empty".into()));
        }
        if self.username.trim().is_empty() {
            return Err(QbError::Config("database username is empty".into()));
        }
        if self.max_connections == 0 {
            return Err(QbError::Config("max_connections must be at least 1".into()));
        }
        Ok(())
    }

    /// Typed driver configuration; credentials are passed as-is, never spliced into a URL.
    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.username);
        if let Some(password) = &self.password {
            pg.password(password);
        }
        pg
    }

    fn expand_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> QbResult<()> {
        self.host = expand_env_vars(&self.host, &lookup)?;
        self.dbname = expand_env_vars(&self.dbname, &lookup)?;
        self.username = expand_env_vars(&self.username, &lookup)?;
        if let Some(password) = self.password.as_mut() {
            *password = expand_env_vars(password, &lookup)?;
        }
        Ok(())
    }
}

/// Replace `${NAME}` references; a missing variable is an error.
fn expand_env_vars(input: &str, lookup: &impl Fn(&str) -> Option<String>) -> QbResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }
            if !closed {
                return Err(QbError::Config(format!("unclosed ${{...}} in {input:?}")));
            }
            let value = lookup(&key)
                .ok_or_else(|| QbError::Config(format!("environment variable {key} is not set")))?;
            out.push_str(&value);
        } else {
            out.push(c);
        }
    }
    Ok(out)
}
