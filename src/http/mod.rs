//! HTTP transfer module
//!
//! A `Transport` opens `Session`s; a session takes a bulk option table
//! and performs exactly one blocking transfer. Dropping a session closes
//! it. `ReqwestTransport` is the engine used by default.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, REFERER};
use reqwest::{Client, ClientBuilder, Method};
use tokio::runtime::Runtime;
use url::Url;

use crate::config::DEFAULT_MAX_REDIRECTS;
use crate::cookies::{unix_now, CookieEngine, CookieStore};
use crate::error::{CurlError, Result};
use crate::options::{CurlOpt, OptionValue, Options};
use crate::utils::StringUtils;

pub mod auth;
pub mod params;
pub mod request;
pub mod response;

use auth::Auth;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Factory for transfer sessions
pub trait Transport {
    type Session: Session;

    /// Verify the engine can be used at all. Called once per builder.
    fn check_available(&self) -> Result<()>;

    /// Open a session bound to `url`.
    fn open(&self, url: &str) -> Result<Self::Session>;
}

/// One configured transfer. Dropping the session releases it.
pub trait Session {
    /// Apply a single option.
    fn set_option(&mut self, key: CurlOpt, value: OptionValue) -> Result<()>;

    /// Apply a whole option table. Either every option is applied or none is.
    fn set_options(&mut self, options: &Options) -> Result<()>;

    /// Perform the transfer and return the response body.
    fn execute(&mut self) -> Result<String>;
}

/// Transfer engine backed by `reqwest` on a current-thread `tokio` runtime
#[derive(Clone)]
pub struct ReqwestTransport {
    runtime: Arc<Runtime>,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                CurlError::ExtensionUnavailable(format!("Failed to create async runtime: {}", e))
            })?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }
}

impl Transport for ReqwestTransport {
    type Session = ReqwestSession;

    fn check_available(&self) -> Result<()> {
        ClientBuilder::new()
            .build()
            .map(|_| ())
            .map_err(|e| CurlError::ExtensionUnavailable(format!("HTTP client unavailable: {}", e)))
    }

    fn open(&self, url: &str) -> Result<ReqwestSession> {
        debug!("opening session for {}", url);
        Ok(ReqwestSession {
            runtime: Arc::clone(&self.runtime),
            url: url.to_string(),
            options: Options::new(),
        })
    }
}

/// A single transfer driven by `reqwest`
pub struct ReqwestSession {
    runtime: Arc<Runtime>,
    url: String,
    options: Options,
}

impl Session for ReqwestSession {
    fn set_option(&mut self, key: CurlOpt, value: OptionValue) -> Result<()> {
        let value = key.coerce(value)?;
        self.options.set(key, value);
        Ok(())
    }

    fn set_options(&mut self, options: &Options) -> Result<()> {
        let mut staged = Vec::with_capacity(options.len());
        for (key, value) in options.iter() {
            staged.push((key, key.coerce(value.clone())?));
        }
        debug!("applying {} options", staged.len());
        self.options.extend(staged);
        Ok(())
    }

    fn execute(&mut self) -> Result<String> {
        let url = Url::parse(&self.url)
            .map_err(|e| CurlError::InvalidUrl(format!("Invalid URL '{}': {}", self.url, e)))?;

        let file = self.options.text(CurlOpt::CookieFile).filter(|p| !p.is_empty());
        let jar = self.options.text(CurlOpt::CookieJar).filter(|p| !p.is_empty());
        let store = match file {
            Some(path) => CookieStore::load(Path::new(path))?,
            None => CookieStore::new(),
        };
        let cookies = Arc::new(CookieEngine::new(
            store,
            self.options.text(CurlOpt::Cookie).map(str::to_string),
            file.is_some() || jar.is_some(),
        ));

        let outcome = self.transfer(url, Arc::clone(&cookies));

        // The jar is written whether or not the transfer succeeded.
        let saved = match jar {
            Some(path) => cookies.save(Path::new(path), unix_now()),
            None => Ok(()),
        };
        let (content_type, body) = outcome?;
        saved?;

        let body = response::decode_body_with_charset(body, content_type.as_deref());
        if self.options.flag(CurlOpt::ReturnTransfer) == Some(false) {
            std::io::stdout().write_all(body.as_bytes())?;
            return Ok(String::new());
        }
        Ok(body)
    }
}

impl ReqwestSession {
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Send the request and collect the response content type and bytes.
    fn transfer(&self, url: Url, cookies: Arc<CookieEngine>) -> Result<(Option<String>, Vec<u8>)> {
        let client = self.build_client(cookies)?;
        let method = self.method()?;
        let headers = self.request_headers()?;
        let mut request = client.request(method.clone(), url.clone()).headers(headers);
        if let Some(body) = self.options.text(CurlOpt::PostFields) {
            request = request.body(body.to_string());
        }

        debug!("> {} {}", method, url);
        self.runtime.block_on(async {
            let response = request.send().await?;
            debug!("< {} from {}", response.status(), response.url());
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.bytes().await?;
            Ok::<_, CurlError>((content_type, body.to_vec()))
        })
    }

    fn build_client(&self, cookies: Arc<CookieEngine>) -> Result<Client> {
        let mut builder = ClientBuilder::new().cookie_provider(cookies);

        builder = if self.options.flag(CurlOpt::FollowLocation).unwrap_or(false) {
            let max = self
                .options
                .int(CurlOpt::MaxRedirs)
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(DEFAULT_MAX_REDIRECTS);
            builder.redirect(reqwest::redirect::Policy::limited(max))
        } else {
            builder.redirect(reqwest::redirect::Policy::none())
        };

        if let Some(timeout) = self.options.seconds(CurlOpt::Timeout) {
            if !timeout.is_zero() {
                builder = builder.timeout(timeout);
            }
        }
        if let Some(timeout) = self.options.seconds(CurlOpt::ConnectTimeout) {
            if !timeout.is_zero() {
                builder = builder.connect_timeout(timeout);
            }
        }
        if let Some(agent) = self.options.text(CurlOpt::UserAgent) {
            builder = builder.user_agent(agent);
        }

        if let Some(address) = self.options.text(CurlOpt::Proxy) {
            if self.options.flag(CurlOpt::HttpProxyTunnel).unwrap_or(false) {
                debug!("tunneling through proxy {}", address);
            }
            let mut proxy = reqwest::Proxy::all(address).map_err(|e| {
                CurlError::transport(5, format!("Invalid proxy '{}': {}", address, e))
            })?;
            if let Some(credentials) = self.options.text(CurlOpt::ProxyUserPwd) {
                let (username, password) = Auth::parse_user_pass(credentials);
                proxy = proxy.basic_auth(&username, &password);
            }
            builder = builder.proxy(proxy);
        }

        builder.build().map_err(CurlError::client_init)
    }

    fn method(&self) -> Result<Method> {
        if let Some(custom) = self.options.text(CurlOpt::CustomRequest) {
            return Method::from_bytes(custom.as_bytes()).map_err(|_| {
                CurlError::InvalidOptionValue {
                    option: CurlOpt::CustomRequest.name(),
                    expected: "an HTTP method token",
                }
            });
        }
        if self.options.flag(CurlOpt::Post).unwrap_or(false)
            || self.options.contains(CurlOpt::PostFields)
        {
            return Ok(Method::POST);
        }
        Ok(Method::GET)
    }

    /// Headers for the first hop. Explicit header lines replace the values
    /// derived from the referer, auth and body options. Cookies are added
    /// per hop by the client's cookie provider.
    fn request_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if let Some(lines) = self.options.list(CurlOpt::HttpHeader) {
            for line in lines {
                match StringUtils::parse_header(line) {
                    Ok((name, value)) => {
                        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                            CurlError::Config(format!("Invalid header name: '{}'", name))
                        })?;
                        headers.append(name, header_value(&value)?);
                    }
                    Err(_) => warn!("skipping header line without a colon: '{}'", line),
                }
            }
        }

        if let Some(referer) = self.options.text(CurlOpt::Referer) {
            if !headers.contains_key(REFERER) {
                headers.insert(REFERER, header_value(referer)?);
            }
        }

        if !headers.contains_key(AUTHORIZATION) {
            if let Some(scheme) = self.options.auth(CurlOpt::HttpAuth) {
                let credentials = self.options.text(CurlOpt::UserPwd).unwrap_or("");
                let value = Auth::authorization(scheme, credentials)?;
                headers.insert(AUTHORIZATION, header_value(&value)?);
            } else if let Some(credentials) = self.options.text(CurlOpt::UserPwd) {
                let (username, password) = Auth::parse_user_pass(credentials);
                let value = Auth::basic_auth(&username, &password);
                headers.insert(AUTHORIZATION, header_value(&value)?);
            }
        }

        if self.options.contains(CurlOpt::PostFields) && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        }

        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| CurlError::Config(format!("Invalid header value: '{}'", value)))
}
