//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger posting rules.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Bounded wait for row locks, in milliseconds.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Statement timeout applied to every ledger transaction, in milliseconds.
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_statement_timeout_ms() -> u64 {
    30_000
}

/// Chart-of-accounts codes and tolerances used by the posting engines.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Equity account that receives the net result on closing.
    #[serde(default = "default_retained_earnings_code")]
    pub retained_earnings_code: String,
    /// Accounts receivable control account.
    #[serde(default = "default_receivable_code")]
    pub receivable_code: String,
    /// Accounts payable control account.
    #[serde(default = "default_payable_code")]
    pub payable_code: String,
    /// Cash account used when a payment names no cash/bank record.
    #[serde(default = "default_cash_code")]
    pub default_cash_code: String,
    /// Counter-account for reconciliation correcting entries.
    #[serde(default = "default_adjustment_code")]
    pub adjustment_code: String,
    /// Outstanding amounts below this are treated as settled.
    #[serde(default = "default_settlement_epsilon", with = "rust_decimal::serde::str")]
    pub settlement_epsilon: Decimal,
    /// Lifetime of cached account lookups, in seconds.
    #[serde(default = "default_account_cache_ttl_secs")]
    pub account_cache_ttl_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            retained_earnings_code: default_retained_earnings_code(),
            receivable_code: default_receivable_code(),
            payable_code: default_payable_code(),
            default_cash_code: default_cash_code(),
            adjustment_code: default_adjustment_code(),
            settlement_epsilon: default_settlement_epsilon(),
            account_cache_ttl_secs: default_account_cache_ttl_secs(),
        }
    }
}

fn default_retained_earnings_code() -> String {
    "3201".to_string()
}

fn default_receivable_code() -> String {
    "1201".to_string()
}

fn default_payable_code() -> String {
    "2101".to_string()
}

fn default_cash_code() -> String {
    "1101".to_string()
}

fn default_adjustment_code() -> String {
    "6901".to_string()
}

fn default_settlement_epsilon() -> Decimal {
    Decimal::new(1, 2)
}

fn default_account_cache_ttl_secs() -> u64 {
    300
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "bukubesar=info,tower_http=info".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("BUKUBESAR").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
