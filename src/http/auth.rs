//! HTTP authentication utilities

use std::fmt;
use std::str::FromStr;

use crate::error::{CurlError, Result};
use base64::Engine;

/// Authentication schemes understood by the `httpauth` option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthScheme {
    Basic,
    Digest,
    DigestIe,
    Bearer,
    Negotiate,
    Ntlm,
    NtlmWb,
    Any,
    AnySafe,
}

impl AuthScheme {
    pub fn name(&self) -> &'static str {
        match self {
            AuthScheme::Basic => "basic",
            AuthScheme::Digest => "digest",
            AuthScheme::DigestIe => "digest_ie",
            AuthScheme::Bearer => "bearer",
            AuthScheme::Negotiate => "negotiate",
            AuthScheme::Ntlm => "ntlm",
            AuthScheme::NtlmWb => "ntlm_wb",
            AuthScheme::Any => "any",
            AuthScheme::AnySafe => "anysafe",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AuthScheme {
    type Err = CurlError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_prefix("curlauth_").unwrap_or(&lower);
        match name {
            "basic" => Ok(AuthScheme::Basic),
            "digest" => Ok(AuthScheme::Digest),
            "digest_ie" => Ok(AuthScheme::DigestIe),
            "bearer" => Ok(AuthScheme::Bearer),
            "negotiate" | "gssnegotiate" => Ok(AuthScheme::Negotiate),
            "ntlm" => Ok(AuthScheme::Ntlm),
            "ntlm_wb" => Ok(AuthScheme::NtlmWb),
            "any" => Ok(AuthScheme::Any),
            "anysafe" => Ok(AuthScheme::AnySafe),
            _ => Err(CurlError::UnknownAuthType(s.to_string())),
        }
    }
}

/// Authentication helper
pub struct Auth;

impl Auth {
    /// Create basic auth header value
    pub fn basic_auth(username: &str, password: &str) -> String {
        let credentials = format!("{}:{}", username, password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
        format!("Basic {}", encoded)
    }

    /// Create bearer token header value
    pub fn bearer_token(token: &str) -> String {
        format!("Bearer {}", token)
    }

    /// Join credentials the way the `userpwd` options store them
    pub fn user_pass(username: &str, password: &str) -> String {
        format!("{}:{}", username, password)
    }

    /// Parse user:password format
    pub fn parse_user_pass(input: &str) -> (String, String) {
        match input.split_once(':') {
            Some((user, pass)) => (user.to_string(), pass.to_string()),
            None => (input.to_string(), String::new()),
        }
    }

    /// Build the `Authorization` header value for a scheme and stored credentials.
    pub fn authorization(scheme: AuthScheme, credentials: &str) -> Result<String> {
        let (username, password) = Self::parse_user_pass(credentials);
        match scheme {
            AuthScheme::Basic | AuthScheme::Any | AuthScheme::AnySafe => {
                Ok(Self::basic_auth(&username, &password))
            }
            AuthScheme::Bearer => Ok(Self::bearer_token(&password)),
            other => Err(CurlError::Unsupported(format!(
                "{} authentication is not supported by the transfer engine",
                other
            ))),
        }
    }
}
