use std::env;
use std::time::Duration;

use url::Url;

use crate::connection::{ConnectionOptions, DEFAULT_QUEUE_SIZE};
use crate::error::{Error, Result};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub addr: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: u32,
    pub client_name: Option<String>,
    pub connect_timeout: Duration,
    pub command_timeout: Option<Duration>,
    pub queue_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:6379".to_string(),
            username: None,
            password: None,
            database: 0,
            client_name: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: None,
            queue_size: DEFAULT_QUEUE_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from `FEDIS_*` variables supplied by `lookup`.
    /// `FEDIS_URL` is applied after the individual host/port/credential
    /// variables and overrides what it specifies.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let host = lookup("FEDIS_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("FEDIS_PORT").unwrap_or_else(|| "6379".to_string());
        config.addr = format!("{}:{}", host, port);
        config.username = lookup("FEDIS_USERNAME").filter(|v| !v.is_empty());
        config.password = lookup("FEDIS_PASSWORD").filter(|v| !v.is_empty());
        config.client_name = lookup("FEDIS_CLIENT_NAME").filter(|v| !v.is_empty());

        if let Some(db) = lookup("FEDIS_DB") {
            config.database = parse_number("FEDIS_DB", &db)?;
        }
        if let Some(ms) = lookup("FEDIS_CONNECT_TIMEOUT_MS") {
            config.connect_timeout =
                Duration::from_millis(parse_number("FEDIS_CONNECT_TIMEOUT_MS", &ms)?);
        }
        if let Some(ms) = lookup("FEDIS_COMMAND_TIMEOUT_MS") {
            let ms: u64 = parse_number("FEDIS_COMMAND_TIMEOUT_MS", &ms)?;
            config.command_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(size) = lookup("FEDIS_QUEUE_SIZE") {
            let size: usize = parse_number("FEDIS_QUEUE_SIZE", &size)?;
            if size == 0 {
                return Err(Error::Config("FEDIS_QUEUE_SIZE must be positive".to_string()));
            }
            config.queue_size = size;
        }

        if let Some(url) = lookup("FEDIS_URL") {
            config.apply_url(&url)?;
        }

        Ok(config)
    }

    pub fn from_url(input: &str) -> Result<Self> {
        let mut config = Self::default();
        config.apply_url(input)?;
        Ok(config)
    }

    /// Applies `redis://[user[:password]@]host[:port][/db]`.
    pub fn apply_url(&mut self, input: &str) -> Result<()> {
        let url = Url::parse(input)?;
        match url.scheme() {
            "redis" => {}
            "rediss" => {
                return Err(Error::Config(
                    "rediss:// (TLS) connections are not supported".to_string(),
                ));
            }
            _ => return Err(Error::Config("URL scheme must be redis://".to_string())),
        }

        let host = url
            .host_str()
            .ok_or_else(|| Error::Config("redis:// URL requires host".to_string()))?;
        let port = url.port().unwrap_or(6379);
        self.addr = format!("{}:{}", host, port);

        let db_path = url.path().trim().trim_start_matches('/');
        if !db_path.is_empty() {
            self.database = parse_number("database", db_path)?;
        }

        if !url.username().is_empty() {
            self.username = Some(url.username().to_string());
        }
        if let Some(password) = url.password() {
            self.password = Some(password.to_string());
        }

        Ok(())
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            command_timeout: self.command_timeout,
            queue_size: self.queue_size,
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| {
            Error::Config(format!(
                "{} must be a non-negative integer, got '{}'",
                name, value
            ))
        })
}
