use clap::{Parser, ValueEnum};
use portal_gateway::telemetry::LogFormat;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "PORTAL_LISTEN_ADDR";
pub const PUBLIC_BASE_URL_ENV: &str = "PORTAL_PUBLIC_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "PORTAL_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "PORTAL_MYSQL_DSN";
pub const CACHE_BACKEND_ENV: &str = "PORTAL_CACHE_BACKEND";
pub const REDIS_URL_ENV: &str = "PORTAL_REDIS_URL";
pub const CACHE_PREFIX_ENV: &str = "PORTAL_CACHE_PREFIX";
pub const URL_TTL_ENV: &str = "PORTAL_URL_TTL_SECS";
pub const CACHE_TIMEOUT_ENV: &str = "PORTAL_CACHE_TIMEOUT_MS";
pub const GENERATOR_ENV: &str = "PORTAL_GENERATOR";
pub const NODE_ID_ENV: &str = "PORTAL_NODE_ID";
pub const SEQUENCE_KEY_ENV: &str = "PORTAL_SEQUENCE_KEY";
pub const DISPATCH_CONCURRENCY_ENV: &str = "PORTAL_DISPATCH_CONCURRENCY";
pub const DISPATCH_QUEUE_ENV: &str = "PORTAL_DISPATCH_QUEUE";
pub const DISPATCH_DEADLINE_ENV: &str = "PORTAL_DISPATCH_DEADLINE_MS";
pub const SWEEP_INTERVAL_ENV: &str = "PORTAL_SWEEP_INTERVAL_SECS";
pub const LOG_FORMAT_ENV: &str = "PORTAL_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_CACHE_PREFIX: &str = "portal";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "redis")]
    Redis,
}

impl Display for CacheBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendArg::InMemory => write!(f, "in-memory"),
            CacheBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GeneratorArg {
    #[value(name = "snowflake")]
    Snowflake,
    #[value(name = "sequence")]
    Sequence,
}

impl Display for GeneratorArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneratorArg::Snowflake => write!(f, "snowflake"),
            GeneratorArg::Sequence => write!(f, "sequence"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "portal", about = "Short-link service")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Prefix of the short URLs handed back to clients.
    #[arg(long, env = PUBLIC_BASE_URL_ENV, default_value = DEFAULT_PUBLIC_BASE_URL)]
    pub public_base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(
        long,
        env = CACHE_BACKEND_ENV,
        value_enum,
        default_value_t = CacheBackendArg::InMemory
    )]
    pub cache: CacheBackendArg,

    /// Also backs the shared counter of the sequence generator.
    #[arg(long, env = REDIS_URL_ENV, required_if_eq("cache", "redis"))]
    pub redis_url: Option<String>,

    #[arg(long, env = CACHE_PREFIX_ENV, default_value = DEFAULT_CACHE_PREFIX)]
    pub cache_prefix: String,

    /// TTL of cached URLs for links without an expiry.
    #[arg(long, env = URL_TTL_ENV, default_value_t = 3600)]
    pub url_ttl_secs: u64,

    #[arg(long, env = CACHE_TIMEOUT_ENV, default_value_t = 250)]
    pub cache_timeout_ms: u64,

    #[arg(
        long,
        env = GENERATOR_ENV,
        value_enum,
        default_value_t = GeneratorArg::Snowflake
    )]
    pub generator: GeneratorArg,

    /// Must be unique per running instance.
    #[arg(long, env = NODE_ID_ENV, default_value_t = 0)]
    pub node_id: u16,

    #[arg(long, env = SEQUENCE_KEY_ENV, default_value = portal_cache::DEFAULT_SEQUENCE_KEY)]
    pub sequence_key: String,

    #[arg(long, env = DISPATCH_CONCURRENCY_ENV, default_value_t = 256)]
    pub dispatch_concurrency: usize,

    /// Background tasks allowed to wait for a slot before new ones are dropped.
    #[arg(long, env = DISPATCH_QUEUE_ENV, default_value_t = 1024)]
    pub dispatch_queue: usize,

    #[arg(long, env = DISPATCH_DEADLINE_ENV, default_value_t = 5000)]
    pub dispatch_deadline_ms: u64,

    #[arg(long, env = SWEEP_INTERVAL_ENV, default_value_t = 60)]
    pub sweep_interval_secs: u64,

    #[arg(
        long,
        env = LOG_FORMAT_ENV,
        value_enum,
        default_value_t = LogFormat::Text
    )]
    pub log_format: LogFormat,
}
