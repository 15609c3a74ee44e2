use std::net::SocketAddr;

use breed_common::vision::VisionClientConfig;

use crate::error::AppError;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8001";
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Application configuration loaded from environment variables.
///
/// Nothing is required. Without a classifier API key the service still starts
/// and reports every recognition as a configuration error.
#[derive(Debug, Clone)]
pub struct Config {
    pub vision: VisionClientConfig,
    /// JSON breed catalog replacing the built-in one.
    pub catalog_path: Option<String>,
    pub listen_addr: SocketAddr,
    /// Allowed CORS origins; `*` allows any.
    pub cors_origins: Vec<String>,
    /// Serve MCP over stdio instead of HTTP.
    pub mcp_stdio: bool,
    /// Redis connection URL. `None` disables result caching.
    pub redis_url: Option<String>,
    pub cache_ttl_secs: u64,
    /// Classifier calls per second, 0 for unlimited.
    pub rate_limit_rps: u32,
}

impl Config {
    /// Optional:
    /// - `BREED_CATALOG_PATH`: JSON catalog file
    /// - `HTTP_LISTEN_ADDR`: bind address (default `0.0.0.0:8001`)
    /// - `CORS_ORIGINS`: comma-separated origins (default `*`)
    /// - `MCP_STDIO`: `1` or `true` to serve MCP on stdio
    /// - `REDIS_URL`, `RECOGNITION_CACHE_TTL_SECS`
    /// - `RATE_LIMIT_RPS`
    /// - the `CLASSIFIER_*` variables read by [`VisionClientConfig::from_env`]
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(VisionClientConfig::from_env(), |name| std::env::var(name).ok())
    }

    fn from_vars(
        vision: VisionClientConfig,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let var = |name: &str| var(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let listen_raw = var("HTTP_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_raw.parse::<SocketAddr>().map_err(|e| {
            AppError::Config(format!("HTTP_LISTEN_ADDR '{listen_raw}' is not a socket address: {e}"))
        })?;

        let cors_origins = var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec!["*".to_string()]);

        let mcp_stdio = var("MCP_STDIO")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let cache_ttl_secs = parse_number(var("RECOGNITION_CACHE_TTL_SECS"), "RECOGNITION_CACHE_TTL_SECS")?
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);
        let rate_limit_rps = parse_number(var("RATE_LIMIT_RPS"), "RATE_LIMIT_RPS")?.unwrap_or(0);

        Ok(Self {
            vision,
            catalog_path: var("BREED_CATALOG_PATH"),
            listen_addr,
            cors_origins,
            mcp_stdio,
            redis_url: var("REDIS_URL"),
            cache_ttl_secs,
            rate_limit_rps,
        })
    }
}

fn parse_number<T>(raw: Option<String>, name: &str) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|v| {
        v.parse::<T>()
            .map_err(|e| AppError::Config(format!("{name} '{v}' is not a valid number: {e}")))
    })
    .transpose()
}
