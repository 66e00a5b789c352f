//! Transfer option vocabulary
//!
//! `CurlOpt` is the closed set of settings a session understands. Bare
//! names such as `"timeout"` or `"CURLOPT_TIMEOUT"` resolve through
//! `FromStr`; anything outside the set is an `UnknownOption`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CurlError, Result};
use crate::http::auth::AuthScheme;

/// Transfer option identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurlOpt {
    ReturnTransfer,
    FollowLocation,
    MaxRedirs,
    Timeout,
    ConnectTimeout,
    UserAgent,
    Referer,
    CookieFile,
    CookieJar,
    Cookie,
    HttpHeader,
    HttpProxyTunnel,
    Proxy,
    ProxyUserPwd,
    CustomRequest,
    HttpAuth,
    UserPwd,
    Post,
    PostFields,
}

/// Shape of value an option accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Flag,
    Seconds,
    Count,
    Text,
    List,
    Auth,
}

impl ValueKind {
    fn describe(&self) -> &'static str {
        match self {
            ValueKind::Flag => "a boolean",
            ValueKind::Seconds => "a number of seconds",
            ValueKind::Count => "a non-negative integer",
            ValueKind::Text => "a string",
            ValueKind::List => "a list of strings",
            ValueKind::Auth => "an authentication scheme",
        }
    }
}

impl CurlOpt {
    pub const ALL: [CurlOpt; 19] = [
        CurlOpt::ReturnTransfer,
        CurlOpt::FollowLocation,
        CurlOpt::MaxRedirs,
        CurlOpt::Timeout,
        CurlOpt::ConnectTimeout,
        CurlOpt::UserAgent,
        CurlOpt::Referer,
        CurlOpt::CookieFile,
        CurlOpt::CookieJar,
        CurlOpt::Cookie,
        CurlOpt::HttpHeader,
        CurlOpt::HttpProxyTunnel,
        CurlOpt::Proxy,
        CurlOpt::ProxyUserPwd,
        CurlOpt::CustomRequest,
        CurlOpt::HttpAuth,
        CurlOpt::UserPwd,
        CurlOpt::Post,
        CurlOpt::PostFields,
    ];

    /// Bare lower-case name, as accepted by `FromStr`
    pub fn name(&self) -> &'static str {
        match self {
            CurlOpt::ReturnTransfer => "returntransfer",
            CurlOpt::FollowLocation => "followlocation",
            CurlOpt::MaxRedirs => "maxredirs",
            CurlOpt::Timeout => "timeout",
            CurlOpt::ConnectTimeout => "connecttimeout",
            CurlOpt::UserAgent => "useragent",
            CurlOpt::Referer => "referer",
            CurlOpt::CookieFile => "cookiefile",
            CurlOpt::CookieJar => "cookiejar",
            CurlOpt::Cookie => "cookie",
            CurlOpt::HttpHeader => "httpheader",
            CurlOpt::HttpProxyTunnel => "httpproxytunnel",
            CurlOpt::Proxy => "proxy",
            CurlOpt::ProxyUserPwd => "proxyuserpwd",
            CurlOpt::CustomRequest => "customrequest",
            CurlOpt::HttpAuth => "httpauth",
            CurlOpt::UserPwd => "userpwd",
            CurlOpt::Post => "post",
            CurlOpt::PostFields => "postfields",
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            CurlOpt::ReturnTransfer
            | CurlOpt::FollowLocation
            | CurlOpt::HttpProxyTunnel
            | CurlOpt::Post => ValueKind::Flag,
            CurlOpt::Timeout | CurlOpt::ConnectTimeout => ValueKind::Seconds,
            CurlOpt::MaxRedirs => ValueKind::Count,
            CurlOpt::HttpHeader => ValueKind::List,
            CurlOpt::HttpAuth => ValueKind::Auth,
            _ => ValueKind::Text,
        }
    }

    /// Convert `value` into the shape this option stores.
    ///
    /// Integers stand in for flags (non-zero is true), numeric strings for
    /// integers, a single string for a one-line list and a scheme name for
    /// an auth scheme.
    pub fn coerce(&self, value: OptionValue) -> Result<OptionValue> {
        let coerced = match (self.kind(), value) {
            (ValueKind::Flag, OptionValue::Bool(b)) => Some(OptionValue::Bool(b)),
            (ValueKind::Flag, OptionValue::Int(i)) => Some(OptionValue::Bool(i != 0)),
            (ValueKind::Flag, OptionValue::Text(s)) => parse_flag(&s).map(OptionValue::Bool),
            (ValueKind::Seconds | ValueKind::Count, OptionValue::Int(i)) if i >= 0 => {
                Some(OptionValue::Int(i))
            }
            (ValueKind::Seconds | ValueKind::Count, OptionValue::Text(s)) => s
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|i| *i >= 0)
                .map(OptionValue::Int),
            (ValueKind::Text, OptionValue::Text(s)) => Some(OptionValue::Text(s)),
            (ValueKind::Text, OptionValue::Int(i)) => Some(OptionValue::Text(i.to_string())),
            (ValueKind::List, OptionValue::List(items)) => Some(OptionValue::List(items)),
            (ValueKind::List, OptionValue::Text(s)) => Some(OptionValue::List(vec![s])),
            (ValueKind::Auth, OptionValue::Auth(scheme)) => Some(OptionValue::Auth(scheme)),
            (ValueKind::Auth, OptionValue::Text(s)) => Some(OptionValue::Auth(s.parse()?)),
            _ => None,
        };
        coerced.ok_or(CurlError::InvalidOptionValue {
            option: self.name(),
            expected: self.kind().describe(),
        })
    }
}

fn parse_flag(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

impl fmt::Display for CurlOpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CurlOpt {
    type Err = CurlError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_prefix("curlopt_").unwrap_or(&lower);
        CurlOpt::ALL
            .iter()
            .copied()
            .find(|opt| opt.name() == name)
            .ok_or_else(|| CurlError::UnknownOption(s.to_string()))
    }
}

/// Anything that can name an option: a resolved `CurlOpt` or a bare name.
pub trait OptionKey {
    fn resolve(self) -> Result<CurlOpt>;
}

impl OptionKey for CurlOpt {
    fn resolve(self) -> Result<CurlOpt> {
        Ok(self)
    }
}

impl OptionKey for &str {
    fn resolve(self) -> Result<CurlOpt> {
        self.parse()
    }
}

impl OptionKey for String {
    fn resolve(self) -> Result<CurlOpt> {
        self.parse()
    }
}

impl OptionKey for &String {
    fn resolve(self) -> Result<CurlOpt> {
        self.parse()
    }
}

/// Option value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
    Auth(AuthScheme),
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Int(i64::from(value))
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        OptionValue::Int(i64::from(value))
    }
}

impl From<Duration> for OptionValue {
    fn from(value: Duration) -> Self {
        OptionValue::Int(i64::try_from(value.as_secs()).unwrap_or(i64::MAX))
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        OptionValue::List(value)
    }
}

impl From<AuthScheme> for OptionValue {
    fn from(value: AuthScheme) -> Self {
        OptionValue::Auth(value)
    }
}

/// Option table, one value per key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    values: HashMap<CurlOpt, OptionValue>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous one.
    pub fn set(&mut self, key: CurlOpt, value: OptionValue) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key: CurlOpt) -> Option<&OptionValue> {
        self.values.get(&key)
    }

    pub fn contains(&self, key: CurlOpt) -> bool {
        self.values.contains_key(&key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CurlOpt, &OptionValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn flag(&self, key: CurlOpt) -> Option<bool> {
        match self.get(key)? {
            OptionValue::Bool(b) => Some(*b),
            OptionValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn int(&self, key: CurlOpt) -> Option<i64> {
        match self.get(key)? {
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn seconds(&self, key: CurlOpt) -> Option<Duration> {
        self.int(key)
            .and_then(|secs| u64::try_from(secs).ok())
            .map(Duration::from_secs)
    }

    pub fn text(&self, key: CurlOpt) -> Option<&str> {
        match self.get(key)? {
            OptionValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn list(&self, key: CurlOpt) -> Option<&[String]> {
        match self.get(key)? {
            OptionValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn auth(&self, key: CurlOpt) -> Option<AuthScheme> {
        match self.get(key)? {
            OptionValue::Auth(scheme) => Some(*scheme),
            _ => None,
        }
    }
}

impl Extend<(CurlOpt, OptionValue)> for Options {
    fn extend<I: IntoIterator<Item = (CurlOpt, OptionValue)>>(&mut self, iter: I) {
        self.values.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::{CurlOpt, OptionKey, OptionValue, Options};
    use crate::error::CurlError;
    use crate::http::auth::AuthScheme;
    use std::time::Duration;

    #[test]
    fn bare_names_resolve_case_insensitively() {
        assert_eq!("timeout".resolve().unwrap(), CurlOpt::Timeout);
        assert_eq!("TIMEOUT".resolve().unwrap(), CurlOpt::Timeout);
        assert_eq!("CURLOPT_FollowLocation".resolve().unwrap(), CurlOpt::FollowLocation);
        assert_eq!(CurlOpt::Proxy.resolve().unwrap(), CurlOpt::Proxy);
    }

    #[test]
    fn every_option_round_trips_through_its_name() {
        for opt in CurlOpt::ALL {
            assert_eq!(opt.name().parse::<CurlOpt>().unwrap(), opt);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "warp_speed".resolve().expect_err("unknown");
        assert!(matches!(err, CurlError::UnknownOption(name) if name == "warp_speed"));
    }

    #[test]
    fn coerce_accepts_loose_values() {
        assert_eq!(
            CurlOpt::FollowLocation.coerce(OptionValue::Int(0)).unwrap(),
            OptionValue::Bool(false)
        );
        assert_eq!(
            CurlOpt::Timeout.coerce(OptionValue::from("15")).unwrap(),
            OptionValue::Int(15)
        );
        assert_eq!(
            CurlOpt::HttpHeader.coerce(OptionValue::from("X-A: 1")).unwrap(),
            OptionValue::List(vec!["X-A: 1".to_string()])
        );
        assert_eq!(
            CurlOpt::HttpAuth.coerce(OptionValue::from("digest")).unwrap(),
            OptionValue::Auth(AuthScheme::Digest)
        );
    }

    #[test]
    fn coerce_rejects_mismatched_values() {
        let err = CurlOpt::Timeout
            .coerce(OptionValue::from("soon"))
            .expect_err("not a number");
        assert!(matches!(
            err,
            CurlError::InvalidOptionValue { option: "timeout", .. }
        ));
        assert!(CurlOpt::UserAgent.coerce(OptionValue::Bool(true)).is_err());
        assert!(CurlOpt::MaxRedirs.coerce(OptionValue::Int(-1)).is_err());
    }

    #[test]
    fn typed_getters_read_back_values() {
        let mut options = Options::new();
        options.set(CurlOpt::Timeout, Duration::from_secs(12).into());
        options.set(CurlOpt::Proxy, "http://proxy:3128".into());
        options.set(CurlOpt::Post, true.into());
        options.set(CurlOpt::Timeout, 20i64.into());

        assert_eq!(options.len(), 3);
        assert_eq!(options.seconds(CurlOpt::Timeout), Some(Duration::from_secs(20)));
        assert_eq!(options.text(CurlOpt::Proxy), Some("http://proxy:3128"));
        assert_eq!(options.flag(CurlOpt::Post), Some(true));
        assert_eq!(options.text(CurlOpt::Post), None);
        assert_eq!(options.list(CurlOpt::HttpHeader), None);
    }
}
