//! Fluent request builder
//!
//! A `RequestBuilder` collects options, header lines and cookies for one
//! session, then runs a single GET, POST, PUT or DELETE. The session is
//! consumed by that call; issuing another request requires `start`.

use log::debug;

use super::auth::{Auth, AuthScheme};
use super::params::{encode_pairs, Params};
use super::{ReqwestTransport, Session, Transport};
use crate::config::{Defaults, HttpMethod};
use crate::error::{CurlError, Result};
use crate::options::{CurlOpt, OptionKey, OptionValue, Options};

/// Request builder over a transfer engine
pub struct RequestBuilder<T: Transport = ReqwestTransport> {
    transport: T,
    defaults: Defaults,
    session: Option<T::Session>,
    url: String,
    options: Options,
    headers: Vec<String>,
    cookies: Vec<(String, String)>,
    response: String,
}

impl RequestBuilder<ReqwestTransport> {
    /// Create an idle builder on the default engine.
    pub fn new() -> Result<Self> {
        Self::with_transport(ReqwestTransport::new()?)
    }

    /// Create a builder and start a session for `url`.
    pub fn with_url(url: &str) -> Result<Self> {
        let mut builder = Self::new()?;
        builder.start(url)?;
        Ok(builder)
    }
}

impl<T: Transport> RequestBuilder<T> {
    /// Create an idle builder on `transport`, failing if the engine is unusable.
    pub fn with_transport(transport: T) -> Result<Self> {
        Self::with_defaults(transport, Defaults::default())
    }

    /// Create an idle builder whose `start` applies `defaults`.
    pub fn with_defaults(transport: T, defaults: Defaults) -> Result<Self> {
        transport.check_available()?;
        Ok(Self {
            transport,
            defaults,
            session: None,
            url: String::new(),
            options: Options::new(),
            headers: Vec::new(),
            cookies: Vec::new(),
            response: String::new(),
        })
    }

    /// Reset all state and open a new session for `url`.
    pub fn start(&mut self, url: &str) -> Result<&mut Self> {
        self.reset();
        self.url = url.to_string();
        self.session = Some(self.transport.open(url)?);

        let agent = self.defaults.user_agent.clone();
        self.user_agent(&agent);
        self.set(
            CurlOpt::ReturnTransfer,
            OptionValue::Bool(self.defaults.return_transfer),
        );
        self.set(
            CurlOpt::FollowLocation,
            OptionValue::Bool(self.defaults.follow_redirects),
        );
        self.set(CurlOpt::Timeout, self.defaults.timeout.into());
        Ok(self)
    }

    /// Set one option by `CurlOpt` or by bare name (`"timeout"`, `"CURLOPT_TIMEOUT"`).
    pub fn option<K: OptionKey>(
        &mut self,
        key: K,
        value: impl Into<OptionValue>,
    ) -> Result<&mut Self> {
        let key = key.resolve()?;
        let value = key.coerce(value.into())?;
        self.set(key, value);
        Ok(self)
    }

    /// Append a header line: `"name: value"`, or `name` verbatim when
    /// `value` is absent or empty.
    pub fn header(&mut self, name: &str, value: Option<&str>) -> &mut Self {
        let line = match value {
            Some(value) if !value.is_empty() => format!("{}: {}", name, value),
            _ => name.to_string(),
        };
        self.headers.push(line);
        self
    }

    /// Set a cookie, replacing any earlier value for `name`.
    pub fn cookie(&mut self, name: &str, value: &str) -> &mut Self {
        match self.cookies.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.cookies.push((name.to_string(), value.to_string())),
        }
        self
    }

    /// File cookies are read from before the request.
    pub fn cookie_file(&mut self, path: &str) -> &mut Self {
        self.set(CurlOpt::CookieFile, path.into())
    }

    /// File cookies are written to after the request.
    pub fn cookie_jar(&mut self, path: &str) -> &mut Self {
        self.set(CurlOpt::CookieJar, path.into())
    }

    /// Set the User-Agent sent with the request.
    pub fn user_agent(&mut self, agent: &str) -> &mut Self {
        self.set(CurlOpt::UserAgent, agent.into())
    }

    /// Restore the configured default user agent.
    pub fn default_user_agent(&mut self) -> &mut Self {
        let agent = self.defaults.user_agent.clone();
        self.user_agent(&agent)
    }

    /// Set the Referer sent with the request.
    pub fn referrer(&mut self, referrer: &str) -> &mut Self {
        self.set(CurlOpt::Referer, referrer.into())
    }

    /// Route the request through `address`, tunneling where needed.
    pub fn proxy(&mut self, address: &str) -> &mut Self {
        self.set(CurlOpt::HttpProxyTunnel, true.into());
        self.set(CurlOpt::Proxy, address.into())
    }

    /// Credentials for the proxy set with `proxy`.
    pub fn proxy_auth(&mut self, username: &str, password: &str) -> &mut Self {
        self.set(CurlOpt::ProxyUserPwd, Auth::user_pass(username, password).into())
    }

    /// Override the request method; the name is upper-cased.
    pub fn http_method(&mut self, method: &str) -> &mut Self {
        self.set(CurlOpt::CustomRequest, method.to_uppercase().into())
    }

    /// Set credentials and the scheme named by `auth_type` (case-insensitive).
    pub fn http_auth(
        &mut self,
        username: &str,
        password: &str,
        auth_type: &str,
    ) -> Result<&mut Self> {
        let scheme: AuthScheme = auth_type.parse()?;
        self.set(CurlOpt::HttpAuth, scheme.into());
        self.set(CurlOpt::UserPwd, Auth::user_pass(username, password).into());
        Ok(self)
    }

    /// Clear response, headers, cookies and options, and close any open session.
    pub fn reset(&mut self) -> &mut Self {
        self.response.clear();
        self.headers.clear();
        self.cookies.clear();
        self.options.clear();
        if self.session.take().is_some() {
            debug!("closing unused session for {}", self.url);
        }
        self
    }

    /// Issue the request with the configured method, GET by default.
    pub fn get(&mut self) -> Result<&str> {
        self.execute()
    }

    /// POST `params`, JSON-encoded when `as_json` is set, otherwise form-encoded.
    pub fn post(&mut self, params: impl Into<Params>, as_json: bool) -> Result<&str> {
        let body = params.into().encode(as_json)?;
        self.http_method(&HttpMethod::Post.to_string());
        self.set(CurlOpt::Post, true.into());
        self.set(CurlOpt::PostFields, body.into());
        self.execute()
    }

    /// PUT `params` form-encoded.
    pub fn put(&mut self, params: impl Into<Params>) -> Result<&str> {
        let body = params.into().encode(false)?;
        self.http_method(&HttpMethod::Put.to_string());
        self.set(CurlOpt::PostFields, body.into());
        self.execute()
    }

    /// DELETE with `params` form-encoded as the body.
    pub fn delete(&mut self, params: impl Into<Params>) -> Result<&str> {
        let body = params.into().encode(false)?;
        self.http_method(&HttpMethod::Delete.to_string());
        self.set(CurlOpt::PostFields, body.into());
        self.execute()
    }

    /// URL of the current session
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Body of the last completed request
    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    /// Whether a session is open and a request may be issued
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    fn set(&mut self, key: CurlOpt, value: OptionValue) -> &mut Self {
        self.options.set(key, value);
        self
    }

    /// Fold headers and cookies into the option table, then hand the whole
    /// table to the session in one call.
    fn prepare(&mut self, session: &mut T::Session) -> Result<()> {
        if !self.headers.is_empty() {
            self.set(CurlOpt::HttpHeader, OptionValue::List(self.headers.clone()));
        }
        if !self.cookies.is_empty() {
            self.set(CurlOpt::Cookie, encode_pairs(&self.cookies).into());
        }
        session.set_options(&self.options)
    }

    fn execute(&mut self) -> Result<&str> {
        let mut session = self.session.take().ok_or(CurlError::NoSession)?;
        self.response.clear();
        self.prepare(&mut session)?;
        let body = session.execute()?;
        drop(session);
        debug!("request to {} returned {} bytes", self.url, body.len());
        self.response = body;
        Ok(&self.response)
    }
}

#[cfg(test)]
mod tests {
    use super::RequestBuilder;
    use crate::config::{Defaults, DEFAULT_USER_AGENT};
    use crate::error::{CurlError, Result};
    use crate::http::auth::AuthScheme;
    use crate::http::params::Params;
    use crate::http::{Session, Transport};
    use crate::options::{CurlOpt, OptionValue, Options};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Open(String),
        Apply(Options),
        Execute,
        Close,
    }

    /// Records every call the builder makes against the engine.
    #[derive(Clone, Default)]
    struct RecordingTransport {
        events: Arc<Mutex<Vec<Event>>>,
        unavailable: bool,
        fail_execute: bool,
    }

    impl RecordingTransport {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn applied(&self) -> Options {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Apply(options) => Some(options),
                    _ => None,
                })
                .last()
                .expect("options applied")
        }
    }

    struct RecordingSession {
        events: Arc<Mutex<Vec<Event>>>,
        options: Options,
        fail_execute: bool,
    }

    impl Transport for RecordingTransport {
        type Session = RecordingSession;

        fn check_available(&self) -> Result<()> {
            if self.unavailable {
                return Err(CurlError::ExtensionUnavailable("not compiled in".to_string()));
            }
            Ok(())
        }

        fn open(&self, url: &str) -> Result<RecordingSession> {
            self.events.lock().unwrap().push(Event::Open(url.to_string()));
            Ok(RecordingSession {
                events: Arc::clone(&self.events),
                options: Options::new(),
                fail_execute: self.fail_execute,
            })
        }
    }

    impl Session for RecordingSession {
        fn set_option(&mut self, key: CurlOpt, value: OptionValue) -> Result<()> {
            self.options.set(key, value);
            Ok(())
        }

        fn set_options(&mut self, options: &Options) -> Result<()> {
            self.options.extend(options.iter().map(|(k, v)| (k, v.clone())));
            self.events
                .lock()
                .unwrap()
                .push(Event::Apply(self.options.clone()));
            Ok(())
        }

        fn execute(&mut self) -> Result<String> {
            self.events.lock().unwrap().push(Event::Execute);
            if self.fail_execute {
                return Err(CurlError::transport(7, "Failed to connect"));
            }
            Ok(format!(
                "{} {}",
                self.options.text(CurlOpt::CustomRequest).unwrap_or("GET"),
                self.options.text(CurlOpt::PostFields).unwrap_or("")
            ))
        }
    }

    impl Drop for RecordingSession {
        fn drop(&mut self) {
            self.events.lock().unwrap().push(Event::Close);
        }
    }

    fn builder(transport: &RecordingTransport) -> RequestBuilder<RecordingTransport> {
        let mut builder = RequestBuilder::with_transport(transport.clone()).expect("builder");
        builder.start("http://example.com/api").expect("start");
        builder
    }

    fn baseline() -> Options {
        let mut options = Options::new();
        options.set(CurlOpt::ReturnTransfer, true.into());
        options.set(CurlOpt::FollowLocation, true.into());
        options.set(CurlOpt::Timeout, Duration::from_secs(30).into());
        options.set(CurlOpt::UserAgent, DEFAULT_USER_AGENT.into());
        options
    }

    #[test]
    fn start_applies_baseline_defaults() {
        let transport = RecordingTransport::default();
        let builder = builder(&transport);
        assert_eq!(builder.url(), "http://example.com/api");
        assert_eq!(builder.options(), &baseline());
        assert!(builder.has_session());
        assert_eq!(builder.response(), "");
    }

    #[test]
    fn start_resets_accumulated_state() {
        let transport = RecordingTransport::default();
        let mut builder = builder(&transport);
        builder
            .option("proxy", "http://proxy:8080")
            .unwrap()
            .header("X-One", Some("1"))
            .cookie("a", "1");

        builder.start("http://example.com/other").unwrap();
        assert!(builder.headers().is_empty());
        assert!(builder.cookies().is_empty());
        assert_eq!(builder.options(), &baseline());
        assert_eq!(builder.url(), "http://example.com/other");
        // The replaced session was closed without being executed.
        assert!(transport.events().contains(&Event::Close));
    }

    #[test]
    fn custom_defaults_feed_start() {
        let transport = RecordingTransport::default();
        let defaults = Defaults {
            follow_redirects: false,
            timeout: Duration::from_secs(5),
            user_agent: "probe/1".to_string(),
            ..Defaults::default()
        };
        let mut builder = RequestBuilder::with_defaults(transport, defaults).unwrap();
        builder.start("http://example.com/").unwrap();
        assert_eq!(builder.options().flag(CurlOpt::FollowLocation), Some(false));
        assert_eq!(builder.options().int(CurlOpt::Timeout), Some(5));
        assert_eq!(builder.options().text(CurlOpt::UserAgent), Some("probe/1"));

        builder.user_agent("other").default_user_agent();
        assert_eq!(builder.options().text(CurlOpt::UserAgent), Some("probe/1"));
    }

    #[test]
    fn unavailable_transport_fails_construction() {
        let transport = RecordingTransport {
            unavailable: true,
            ..RecordingTransport::default()
        };
        let err = RequestBuilder::with_transport(transport.clone())
            .err()
            .expect("unavailable");
        assert!(matches!(err, CurlError::ExtensionUnavailable(_)));
        assert!(transport.events().is_empty());
    }

    #[test]
    fn option_resolves_bare_names() {
        let transport = RecordingTransport::default();
        let mut builder = builder(&transport);
        builder.option("TIMEOUT", 10).unwrap();
        builder.option(CurlOpt::MaxRedirs, 3).unwrap();
        assert_eq!(builder.options().int(CurlOpt::Timeout), Some(10));
        assert_eq!(builder.options().int(CurlOpt::MaxRedirs), Some(3));

        let err = builder.option("hyperdrive", true).err().expect("unknown");
        assert!(matches!(err, CurlError::UnknownOption(_)));
    }

    #[test]
    fn headers_are_an_ordered_sequence() {
        let transport = RecordingTransport::default();
        let mut builder = builder(&transport);
        builder
            .header("X", Some("1"))
            .header("X", Some("2"))
            .header("X-Raw: verbatim", None)
            .header("X-Empty", Some(""));
        assert_eq!(
            builder.headers(),
            &["X: 1", "X: 2", "X-Raw: verbatim", "X-Empty"]
        );
        assert!(!builder.options().contains(CurlOpt::HttpHeader));
    }

    #[test]
    fn cookies_are_a_map() {
        let transport = RecordingTransport::default();
        let mut builder = builder(&transport);
        builder.cookie("a", "1").cookie("b", "2").cookie("a", "3");
        assert_eq!(
            builder.cookies(),
            &[
                ("a".to_string(), "3".to_string()),
                ("b".to_string(), "2".to_string())
            ]
        );
        assert!(!builder.options().contains(CurlOpt::Cookie));
    }

    #[test]
    fn prepare_serializes_headers_and_cookies_in_one_apply() {
        let transport = RecordingTransport::default();
        let mut builder = builder(&transport);
        builder
            .header("Accept", Some("text/plain"))
            .cookie("session", "a b")
            .cookie("theme", "dark");
        builder.get().unwrap();

        let applies = transport
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Apply(_)))
            .count();
        assert_eq!(applies, 1);
        let applied = transport.applied();
        assert_eq!(
            applied.list(CurlOpt::HttpHeader),
            Some(&["Accept: text/plain".to_string()][..])
        );
        assert_eq!(applied.text(CurlOpt::Cookie), Some("session=a+b&theme=dark"));
    }

    #[test]
    fn setters_store_options() {
        let transport = RecordingTransport::default();
        let mut builder = builder(&transport);
        builder
            .referrer("http://from.example/")
            .proxy("http://proxy:3128")
            .proxy_auth("pu", "pp")
            .cookie_file("/tmp/in.txt")
            .cookie_jar("/tmp/out.txt")
            .http_method("patch");
        let options = builder.options();
        assert_eq!(options.text(CurlOpt::Referer), Some("http://from.example/"));
        assert_eq!(options.flag(CurlOpt::HttpProxyTunnel), Some(true));
        assert_eq!(options.text(CurlOpt::Proxy), Some("http://proxy:3128"));
        assert_eq!(options.text(CurlOpt::ProxyUserPwd), Some("pu:pp"));
        assert_eq!(options.text(CurlOpt::CookieFile), Some("/tmp/in.txt"));
        assert_eq!(options.text(CurlOpt::CookieJar), Some("/tmp/out.txt"));
        assert_eq!(options.text(CurlOpt::CustomRequest), Some("PATCH"));
    }

    #[test]
    fn http_auth_sets_scheme_and_credentials() {
        let transport = RecordingTransport::default();
        let mut builder = builder(&transport);
        builder.http_auth("u", "p", "BASIC").unwrap();
        assert_eq!(builder.options().auth(CurlOpt::HttpAuth), Some(AuthScheme::Basic));
        assert_eq!(builder.options().text(CurlOpt::UserPwd), Some("u:p"));

        let err = builder.http_auth("u", "p", "bogus").err().expect("bogus");
        assert!(matches!(err, CurlError::UnknownAuthType(_)));
    }

    #[test]
    fn post_encodes_form_and_json_bodies() {
        let transport = RecordingTransport::default();
        let mut builder = builder(&transport);
        let body = builder.post([("a", "1"), ("b", "2")], false).unwrap();
        assert_eq!(body, "POST a=1&b=2");
        let applied = transport.applied();
        assert_eq!(applied.flag(CurlOpt::Post), Some(true));

        builder.start("http://example.com/api").unwrap();
        let body = builder.post([("a", "1"), ("b", "2")], true).unwrap();
        assert_eq!(body, r#"POST {"a":"1","b":"2"}"#);
    }

    #[test]
    fn put_and_delete_force_their_methods() {
        let transport = RecordingTransport::default();
        let mut builder = builder(&transport);
        assert_eq!(builder.put([("k", "v")]).unwrap(), "PUT k=v");

        builder.start("http://example.com/api").unwrap();
        assert_eq!(builder.delete(Params::Empty).unwrap(), "DELETE ");
        assert_eq!(builder.response(), "DELETE ");
    }

    #[test]
    fn session_is_released_after_each_request() {
        let transport = RecordingTransport::default();
        let mut builder = builder(&transport);
        builder.get().unwrap();

        assert!(!builder.has_session());
        assert_eq!(transport.events().last(), Some(&Event::Close));
        let err = builder.get().err().expect("no session");
        assert!(matches!(err, CurlError::NoSession));
        assert_eq!(builder.response(), "GET ");
    }

    #[test]
    fn execute_failure_is_an_error_and_still_closes() {
        let transport = RecordingTransport {
            fail_execute: true,
            ..RecordingTransport::default()
        };
        let mut builder = builder(&transport);
        let err = builder.get().err().expect("transport error");
        assert!(matches!(err, CurlError::Transport { code: 7, .. }));
        assert_eq!(builder.response(), "");
        assert_eq!(
            transport.events(),
            vec![
                Event::Open("http://example.com/api".to_string()),
                Event::Apply(transport.applied()),
                Event::Execute,
                Event::Close,
            ]
        );
    }

    #[test]
    fn reset_clears_state_and_closes_session() {
        let transport = RecordingTransport::default();
        let mut builder = builder(&transport);
        builder.header("X", Some("1")).cookie("a", "1");
        builder.reset();
        assert!(builder.options().is_empty());
        assert!(builder.headers().is_empty());
        assert!(builder.cookies().is_empty());
        assert!(!builder.has_session());
        assert_eq!(transport.events().last(), Some(&Event::Close));
    }

    #[test]
    fn request_without_start_fails() {
        let transport = RecordingTransport::default();
        let mut builder = RequestBuilder::with_transport(transport).unwrap();
        let err = builder.post(Params::Empty, false).err().expect("no session");
        assert!(matches!(err, CurlError::NoSession));
    }
}
