//! Server configuration, populated from environment variables.

use std::net::SocketAddr;

/// Runtime configuration for a Hearth server.
///
/// All fields are populated from environment variables with sensible
/// defaults, so a server can be started with zero configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `HEARTH_BIND` | `0.0.0.0:3000` | TCP socket address to listen on |
/// | `HEARTH_DB` | (absent = in-memory) | Path to the SQLite database file |
/// | `HEARTH_NAME` | (absent) | Human-readable server name |
/// | `HEARTH_CONTACT` | (absent) | Operator contact email or URL |
/// | `HEARTH_RATE_LIMIT_PER_MINUTE` | `120` | Per-IP request cap; `0` disables |
/// | `HEARTH_SIGNATURE_MAX_SKEW_SECS` | `300` | Accepted `Date` header drift |
/// | `HEARTH_PAGE_LIMIT_MAX` | `100` | Upper bound on any `limit` parameter |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Human-readable name, shown in the service document.
    pub name: Option<String>,

    /// Operator contact info (email or URL), shown in the service document.
    pub contact: Option<String>,

    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,

    /// Path to the SQLite database file.
    /// `None` means use an in-memory store (data is lost on restart).
    pub db_path: Option<String>,

    /// Maximum requests per minute per client IP. `0` disables the limiter.
    pub rate_limit_per_minute: u32,

    /// Largest accepted difference, in seconds, between a signed request's
    /// `Date` header and the server clock.
    pub signature_max_skew_secs: u64,

    /// Page size used when a list request gives no `limit`.
    pub page_limit_default: u32,

    /// Largest `limit` a list request may ask for; larger values are clamped.
    pub page_limit_max: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: None,
            contact: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            db_path: None,
            rate_limit_per_minute: 120,
            signature_max_skew_secs: 300,
            page_limit_default: 20,
            page_limit_max: 100,
        }
    }
}

impl ServerConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr: SocketAddr = std::env::var("HEARTH_BIND")
            .map(|v| {
                v.parse()
                    .expect("HEARTH_BIND must be a valid socket address (e.g. 0.0.0.0:3000)")
            })
            .unwrap_or(defaults.bind_addr);

        Self {
            name: std::env::var("HEARTH_NAME").ok(),
            contact: std::env::var("HEARTH_CONTACT").ok(),
            bind_addr,
            db_path: std::env::var("HEARTH_DB").ok(),
            rate_limit_per_minute: parse_env("HEARTH_RATE_LIMIT_PER_MINUTE")
                .unwrap_or(defaults.rate_limit_per_minute),
            signature_max_skew_secs: parse_env("HEARTH_SIGNATURE_MAX_SKEW_SECS")
                .unwrap_or(defaults.signature_max_skew_secs),
            page_limit_default: defaults.page_limit_default,
            page_limit_max: parse_env("HEARTH_PAGE_LIMIT_MAX")
                .filter(|&max| max > 0)
                .unwrap_or(defaults.page_limit_max),
        }
    }

    /// Resolve a client-supplied `limit` against the configured bounds.
    pub fn page_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.page_limit_default)
            .clamp(1, self.page_limit_max)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
