//! curlkit - a fluent request builder over a curl-style option table
//!
//! Configure a request through chained calls (options, headers, cookies,
//! proxy, authentication), then issue exactly one blocking GET, POST, PUT
//! or DELETE and read back the body.
//!
//! ```no_run
//! use curlkit::RequestBuilder;
//!
//! # fn main() -> curlkit::Result<()> {
//! let mut curl = RequestBuilder::with_url("https://httpbin.org/post")?;
//! curl.option("timeout", 10)?
//!     .header("Accept", Some("application/json"))
//!     .cookie("session", "abc");
//! let body = curl.post([("name", "curlkit")], false)?;
//! println!("{}", body);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod cookies;
pub mod error;
pub mod exit_code;
pub mod http;
pub mod logging;
pub mod options;
pub mod output;
pub mod utils;

pub use error::{CurlError, Result};
pub use http::auth::AuthScheme;
pub use http::params::Params;
pub use http::request::RequestBuilder;
pub use http::{ReqwestTransport, Session, Transport};
pub use options::{CurlOpt, OptionValue, Options};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
