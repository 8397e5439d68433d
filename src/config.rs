use crate::error::{FeedError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default instrument set pushed to streaming clients
pub const DEFAULT_SYMBOLS: &[&str] = &["AAPL", "GOOGL", "AMZN", "MSFT"];

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP/WebSocket server configuration
    pub server: ServerConfig,
    /// Token configuration
    pub auth: AuthConfig,
    /// Broadcast feed configuration
    pub feed: FeedConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on (default: 8000)
    pub port: u16,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Directory served under /static
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 signing secret (empty = random per process)
    pub jwt_secret: String,
    /// Lifetime of issued tokens in seconds
    pub token_ttl_secs: i64,
    /// How long a handler waits for the token frame (0 = forever)
    pub token_receive_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Broadcast tick period in milliseconds
    pub interval_ms: u64,
    /// Per-recipient send timeout in milliseconds
    pub send_timeout_ms: u64,
    /// Symbols included in every snapshot
    pub symbols: Vec<String>,
    /// Lower quote bound
    pub min_price: f64,
    /// Upper quote bound
    pub max_price: f64,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl AuthConfig {
    pub fn token_receive_timeout(&self) -> Option<Duration> {
        match self.token_receive_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl FeedConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            send_timeout_ms: 1000,
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            min_price: 100.0,
            max_price: 1500.0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Config {
            server: ServerConfig {
                port: get_env_or("PORT", "8000").parse().map_err(|_| {
                    FeedError::InvalidConfig("PORT must be a valid port number".into())
                })?,
                host: get_env_or("HOST", "0.0.0.0"),
                static_dir: PathBuf::from(get_env_or("STATIC_DIR", "static")),
            },
            auth: AuthConfig {
                jwt_secret: get_env_or("JWT_SECRET", ""),
                token_ttl_secs: get_env_or("TOKEN_TTL_SECS", "3600").parse().map_err(|_| {
                    FeedError::InvalidConfig("TOKEN_TTL_SECS must be a number".into())
                })?,
                token_receive_timeout_secs: get_env_or("TOKEN_RECEIVE_TIMEOUT_SECS", "30")
                    .parse()
                    .map_err(|_| {
                        FeedError::InvalidConfig(
                            "TOKEN_RECEIVE_TIMEOUT_SECS must be a number".into(),
                        )
                    })?,
            },
            feed: FeedConfig {
                interval_ms: get_env_or("FEED_INTERVAL_MS", "2000").parse().map_err(|_| {
                    FeedError::InvalidConfig("FEED_INTERVAL_MS must be a number".into())
                })?,
                send_timeout_ms: get_env_or("FEED_SEND_TIMEOUT_MS", "1000")
                    .parse()
                    .map_err(|_| {
                        FeedError::InvalidConfig("FEED_SEND_TIMEOUT_MS must be a number".into())
                    })?,
                symbols: split_list(&get_env_or("FEED_SYMBOLS", &DEFAULT_SYMBOLS.join(","))),
                min_price: get_env_or("FEED_MIN_PRICE", "100").parse().map_err(|_| {
                    FeedError::InvalidConfig("FEED_MIN_PRICE must be a number".into())
                })?,
                max_price: get_env_or("FEED_MAX_PRICE", "1500").parse().map_err(|_| {
                    FeedError::InvalidConfig("FEED_MAX_PRICE must be a number".into())
                })?,
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or break the feed
    pub fn validate(&self) -> Result<()> {
        if self.feed.interval_ms == 0 {
            return Err(FeedError::InvalidConfig(
                "FEED_INTERVAL_MS must be greater than zero".into(),
            ));
        }
        if self.feed.send_timeout_ms == 0 {
            return Err(FeedError::InvalidConfig(
                "FEED_SEND_TIMEOUT_MS must be greater than zero".into(),
            ));
        }
        if self.feed.symbols.is_empty() {
            return Err(FeedError::InvalidConfig(
                "FEED_SYMBOLS must name at least one symbol".into(),
            ));
        }
        if !(self.feed.min_price.is_finite()
            && self.feed.max_price.is_finite()
            && self.feed.min_price <= self.feed.max_price)
        {
            return Err(FeedError::InvalidConfig(
                "FEED_MIN_PRICE must not exceed FEED_MAX_PRICE".into(),
            ));
        }
        if self.auth.token_ttl_secs <= 0 {
            return Err(FeedError::InvalidConfig(
                "TOKEN_TTL_SECS must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Get the server listen address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
