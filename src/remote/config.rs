//! Connection settings for a remote object-store daemon

use crate::{Error, Result};
use std::fmt;

/// Default daemon API address (a local Kubo-compatible node)
pub const DEFAULT_API_ADDR: &str = "/ip4/127.0.0.1/tcp/5001";

/// Authentication sent to the daemon
#[derive(Clone)]
pub enum Auth {
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// No authentication
    None,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Bearer(_) => write!(f, "Bearer([REDACTED])"),
            Auth::None => write!(f, "None"),
        }
    }
}

/// Remote backend configuration
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    /// Base URL of the daemon API, without the `/api/v0` suffix
    pub api_url: String,
    /// Authentication credentials
    pub auth: Auth,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            api_url: "http://127.0.0.1:5001".to_string(),
            auth: Auth::None,
            timeout_secs: 60,
        }
    }
}

impl RemoteConfig {
    /// Point at a daemon given as a URL or a multiaddr
    pub fn new(addr: &str) -> Result<Self> {
        Ok(RemoteConfig {
            api_url: parse_api_addr(addr)?,
            ..Default::default()
        })
    }

    /// Create config from environment variables
    ///
    /// - `DAGSTORE_API_URL`: URL or multiaddr (default `/ip4/127.0.0.1/tcp/5001`)
    /// - `DAGSTORE_API_TOKEN`: bearer token (optional)
    /// - `DAGSTORE_TIMEOUT_SECS`: request timeout (default 60)
    pub fn from_env() -> Result<Self> {
        let addr =
            std::env::var("DAGSTORE_API_URL").unwrap_or_else(|_| DEFAULT_API_ADDR.to_string());
        Self::for_addr(&addr)
    }

    /// Point at `addr`, taking only the token and timeout from the environment
    ///
    /// `DAGSTORE_API_URL` is not consulted.
    pub fn for_addr(addr: &str) -> Result<Self> {
        let auth = match std::env::var("DAGSTORE_API_TOKEN") {
            Ok(token) if !token.is_empty() => Auth::Bearer(token),
            _ => Auth::None,
        };

        let timeout_secs = match std::env::var("DAGSTORE_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("Invalid DAGSTORE_TIMEOUT_SECS: {}", raw)))?,
            Err(_) => RemoteConfig::default().timeout_secs,
        };

        Ok(RemoteConfig {
            api_url: parse_api_addr(addr)?,
            auth,
            timeout_secs,
        })
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Turn a URL or multiaddr into an HTTP base URL
///
/// Accepted multiaddrs: `/ip4|ip6|dns|dns4|dns6/<host>/tcp/<port>` with an
/// optional trailing `/http` or `/https`.
pub fn parse_api_addr(addr: &str) -> Result<String> {
    let addr = addr.trim();
    if addr.starts_with("http://") || addr.starts_with("https://") {
        return Ok(addr.trim_end_matches('/').to_string());
    }

    let parts: Vec<&str> = addr.split('/').filter(|s| !s.is_empty()).collect();
    let bad = || Error::Config(format!("Unsupported API address: {}", addr));

    let (proto, host, tcp, port, rest) = match parts.as_slice() {
        [proto, host, tcp, port, rest @ ..] => (*proto, *host, *tcp, *port, rest),
        _ => return Err(bad()),
    };

    if tcp != "tcp" || port.parse::<u16>().is_err() {
        return Err(bad());
    }

    let scheme = match rest {
        [] | ["http"] => "http",
        ["https"] => "https",
        _ => return Err(bad()),
    };

    match proto {
        "ip4" | "dns" | "dns4" | "dns6" => Ok(format!("{}://{}:{}", scheme, host, port)),
        "ip6" => Ok(format!("{}://[{}]:{}", scheme, host, port)),
        _ => Err(bad()),
    }
}
