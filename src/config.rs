//! Configuration management for curlkit

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CurlError;

/// User agent applied by every new session unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("curlkit/", env!("CARGO_PKG_VERSION"));

/// Redirect ceiling the engine uses when following redirects without an
/// explicit `maxredirs`. Not part of `Defaults`: `start` never sets it.
pub const DEFAULT_MAX_REDIRECTS: usize = 50;

/// HTTP method enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Trace,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        };
        write!(f, "{}", method)
    }
}

impl FromStr for HttpMethod {
    type Err = CurlError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            "PATCH" => Ok(HttpMethod::Patch),
            "TRACE" => Ok(HttpMethod::Trace),
            _ => Err(CurlError::Config(format!("Unknown HTTP method: {}", s))),
        }
    }
}

/// Baseline options applied by `start` to every new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub return_transfer: bool,
    pub follow_redirects: bool,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            return_transfer: true,
            follow_redirects: true,
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
