//! Cookie file and cookie jar handling
//!
//! Cookie files use the Netscape format curl reads and writes: one
//! cookie per line, seven tab-separated fields
//! (`domain`, `include_subdomains`, `path`, `secure`, `expires`, `name`,
//! `value`), `#` comments, and an optional `#HttpOnly_` domain prefix.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use reqwest::header::HeaderValue;
use url::Url;

use crate::error::Result;

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";
const JAR_HEADER: &str = "# Netscape HTTP Cookie File\n# This file was generated by curlkit! Edit at your own risk.\n\n";

/// A stored cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    /// Unix timestamp; `None` for session cookies
    pub expires: Option<i64>,
}

impl Cookie {
    fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires, Some(at) if at <= now)
    }

    fn matches(&self, url: &Url, now: i64) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if self.is_expired(now) {
            return false;
        }
        if self.secure && url.scheme() != "https" {
            return false;
        }
        domain_matches(&self.domain, self.include_subdomains, host)
            && path_matches(&self.path, url.path())
    }

    fn to_line(&self) -> String {
        let domain = if self.http_only {
            format!("{}{}", HTTP_ONLY_PREFIX, self.domain)
        } else {
            self.domain.clone()
        };
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            domain,
            bool_field(self.include_subdomains),
            self.path,
            bool_field(self.secure),
            self.expires.unwrap_or(0),
            self.name,
            self.value
        )
    }
}

fn bool_field(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

fn domain_matches(domain: &str, include_subdomains: bool, host: &str) -> bool {
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    let host = host.to_ascii_lowercase();
    if host == domain {
        return true;
    }
    include_subdomains && host.ends_with(&format!(".{}", domain))
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if cookie_path.is_empty() || cookie_path == "/" || cookie_path == request_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Cookies loaded from a cookie file and collected from responses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieStore {
    cookies: Vec<Cookie>,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a cookie file. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let store = Self::parse(&contents);
                debug!("loaded {} cookies from {:?}", store.len(), path);
                Ok(store)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("cookie file {:?} does not exist; starting empty", path);
                Ok(Self::new())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Parse Netscape cookie-file contents, skipping malformed lines.
    pub fn parse(contents: &str) -> Self {
        let mut store = Self::new();
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
                Some(rest) => (rest, true),
                None => (line, false),
            };
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 7 {
                warn!("skipping malformed cookie line {}", index + 1);
                continue;
            }
            let expires = fields[4].parse::<i64>().unwrap_or(0);
            store.insert(Cookie {
                domain: fields[0].to_string(),
                include_subdomains: fields[1].eq_ignore_ascii_case("TRUE"),
                path: fields[2].to_string(),
                secure: fields[3].eq_ignore_ascii_case("TRUE"),
                expires: (expires != 0).then_some(expires),
                name: fields[5].to_string(),
                value: fields[6..].join("\t"),
                http_only,
            });
        }
        store
    }

    /// Insert a cookie, replacing one with the same domain, path and name.
    pub fn insert(&mut self, cookie: Cookie) {
        match self.cookies.iter_mut().find(|c| {
            c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path
        }) {
            Some(existing) => *existing = cookie,
            None => self.cookies.push(cookie),
        }
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.iter()
    }

    /// Cookies that should be sent to `url`
    pub fn cookies_for_url(&self, url: &Url, now: i64) -> Vec<&Cookie> {
        self.cookies.iter().filter(|c| c.matches(url, now)).collect()
    }

    /// Record a `Set-Cookie` header received from `url`.
    pub fn add_set_cookie(&mut self, header: &str, url: &Url, now: i64) {
        match parse_set_cookie(header, url, now) {
            Some(cookie) => self.insert(cookie),
            None => debug!("ignoring unparseable Set-Cookie header"),
        }
    }

    /// Write all unexpired cookies in Netscape format.
    pub fn save(&self, path: &Path, now: i64) -> Result<()> {
        let mut contents = String::from(JAR_HEADER);
        for cookie in self.cookies.iter().filter(|c| !c.is_expired(now)) {
            contents.push_str(&cookie.to_line());
            contents.push('\n');
        }
        fs::write(path, contents)?;
        debug!("wrote cookie jar {:?}", path);
        Ok(())
    }
}

/// Convert cookies to HTTP header format
pub fn cookies_to_header(cookies: &[&Cookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse a `Set-Cookie` value. Only `Max-Age` sets an expiry; cookies
/// without one are kept as session cookies.
pub fn parse_set_cookie(header: &str, url: &Url, now: i64) -> Option<Cookie> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let host = url.host_str()?.to_string();
    let mut cookie = Cookie {
        name: name.to_string(),
        value: value.trim().to_string(),
        domain: host,
        include_subdomains: false,
        path: default_path(url.path()),
        secure: false,
        http_only: false,
        expires: None,
    };

    for attribute in parts {
        let (key, value) = match attribute.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (attribute.trim(), ""),
        };
        match key.to_ascii_lowercase().as_str() {
            "domain" if !value.is_empty() => {
                cookie.domain = value.trim_start_matches('.').to_string();
                cookie.include_subdomains = true;
            }
            "path" if value.starts_with('/') => cookie.path = value.to_string(),
            "secure" => cookie.secure = true,
            "httponly" => cookie.http_only = true,
            "max-age" => {
                if let Ok(seconds) = value.parse::<i64>() {
                    cookie.expires = Some(now.saturating_add(seconds));
                }
            }
            _ => {}
        }
    }
    Some(cookie)
}

/// Cookie state for one transfer, installed as the client's cookie provider
/// so that every hop of a redirect chain sends and records cookies.
///
/// `extra` is the raw `Cookie` option; it follows the stored cookies on
/// every hop. `Set-Cookie` headers are only recorded when a cookie file or
/// jar is configured.
pub struct CookieEngine {
    store: Mutex<CookieStore>,
    extra: Option<String>,
    record: bool,
}

impl CookieEngine {
    pub fn new(store: CookieStore, extra: Option<String>, record: bool) -> Self {
        Self {
            store: Mutex::new(store),
            extra: extra.filter(|cookie| !cookie.is_empty()),
            record,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CookieStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `Cookie` header value for a request to `url`
    pub fn header_for(&self, url: &Url, now: i64) -> Option<String> {
        let store = self.lock();
        let mut parts = Vec::new();
        let stored = store.cookies_for_url(url, now);
        if !stored.is_empty() {
            parts.push(cookies_to_header(&stored));
        }
        if let Some(extra) = &self.extra {
            parts.push(extra.clone());
        }
        (!parts.is_empty()).then(|| parts.join("; "))
    }

    pub fn record(&self, header: &str, url: &Url, now: i64) {
        if self.record {
            self.lock().add_set_cookie(header, url, now);
        }
    }

    pub fn save(&self, path: &Path, now: i64) -> Result<()> {
        self.lock().save(path, now)
    }
}

impl reqwest::cookie::CookieStore for CookieEngine {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let now = unix_now();
        for header in cookie_headers.filter_map(|value| value.to_str().ok()) {
            self.record(header, url, now);
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = self.header_for(url, unix_now())?;
        match HeaderValue::from_str(&header) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("dropping cookie header with invalid characters for {}", url);
                None
            }
        }
    }
}

fn default_path(request_path: &str) -> String {
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => request_path[..index].to_string(),
    }
}
