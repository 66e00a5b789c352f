//! CLI argument parsing module
//!
//! A thin command-line front end that drives a `RequestBuilder`.

use crate::config::HttpMethod;
use crate::error::CurlError;
use crate::exit_code::exit_code_for_error;
use crate::http::auth::Auth;
use crate::http::params::Params;
use crate::http::request::RequestBuilder;
use crate::options::CurlOpt;
use crate::output::{OutputConfig, OutputWriter};
use crate::utils::{FileUtils, StringUtils, UrlUtils};
use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};

/// Main entry point for the CLI application
pub fn run() {
    let matches = create_app().get_matches();
    crate::logging::init(matches.get_flag("verbose"));

    if let Err(err) = run_with_args(&matches) {
        if !matches.get_flag("silent") {
            eprintln!("curlkit: error: {:#}", err);
        }
        let code = err
            .downcast_ref::<CurlError>()
            .map(exit_code_for_error)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

/// Run curlkit with parsed command line arguments
fn run_with_args(matches: &ArgMatches) -> anyhow::Result<()> {
    let url_arg = matches.get_one::<String>("url").context("missing URL")?;
    let url = UrlUtils::validate_url(url_arg)?;

    let writer = OutputWriter::new(OutputConfig {
        file: matches
            .get_one::<String>("output")
            .map(|path| FileUtils::expand_path(path))
            .transpose()?,
        verbose: matches.get_flag("verbose"),
        silent: matches.get_flag("silent"),
    });

    let mut curl = RequestBuilder::with_url(url.as_str())?;
    configure(&mut curl, matches)?;

    let as_json = matches.get_flag("json");
    let params = request_params(matches)?;
    let method = match matches.get_one::<String>("request") {
        Some(method) => method.parse::<HttpMethod>()?,
        None if params.is_some() => HttpMethod::Post,
        None => HttpMethod::Get,
    };
    writer.write_verbose(&format!("{} {}", method, url));

    let body = match method {
        HttpMethod::Get if params.is_none() => curl.get()?,
        HttpMethod::Post => curl.post(params.unwrap_or_default(), as_json)?,
        HttpMethod::Put => curl.put(params.unwrap_or_default())?,
        HttpMethod::Delete => curl.delete(params.unwrap_or_default())?,
        other => {
            if let Some(params) = &params {
                curl.option(CurlOpt::PostFields, params.encode(as_json)?)?;
            }
            curl.http_method(&other.to_string());
            curl.get()?
        }
    };

    writer
        .write(body)
        .with_context(|| "failed to write response body")?;
    Ok(())
}

/// Apply every configuration flag to the builder
fn configure(curl: &mut RequestBuilder, matches: &ArgMatches) -> anyhow::Result<()> {
    if let Some(pairs) = matches.get_many::<String>("opt") {
        for pair in pairs {
            let (name, value) = StringUtils::parse_key_value(pair)?;
            curl.option(name.as_str(), value)?;
        }
    }

    if let Some(headers) = matches.get_many::<String>("header") {
        for line in headers {
            curl.header(line, None);
        }
    }

    if let Some(cookies) = matches.get_many::<String>("cookie") {
        for pair in cookies {
            let (name, value) = StringUtils::parse_key_value(pair)?;
            curl.cookie(&name, &value);
        }
    }

    if let Some(path) = matches.get_one::<String>("cookie-file") {
        let path = FileUtils::expand_path(path)?;
        curl.cookie_file(&path.to_string_lossy());
    }

    if let Some(path) = matches.get_one::<String>("cookie-jar") {
        let path = FileUtils::expand_path(path)?;
        curl.cookie_jar(&path.to_string_lossy());
    }

    if let Some(agent) = matches.get_one::<String>("user-agent") {
        curl.user_agent(agent);
    }

    if let Some(referrer) = matches.get_one::<String>("referer") {
        curl.referrer(referrer);
    }

    if let Some(timeout) = matches.get_one::<String>("max-time") {
        curl.option(CurlOpt::Timeout, StringUtils::parse_timeout(timeout)?)?;
    }

    if let Some(timeout) = matches.get_one::<String>("connect-timeout") {
        curl.option(CurlOpt::ConnectTimeout, StringUtils::parse_timeout(timeout)?)?;
    }

    if matches.get_flag("no-location") {
        curl.option(CurlOpt::FollowLocation, false)?;
    }

    if let Some(max) = matches.get_one::<String>("max-redirs") {
        curl.option(CurlOpt::MaxRedirs, max.as_str())?;
    }

    if let Some(proxy) = matches.get_one::<String>("proxy") {
        curl.proxy(proxy);
    }

    if let Some(proxy_user) = matches.get_one::<String>("proxy-user") {
        let (username, password) = Auth::parse_user_pass(proxy_user);
        curl.proxy_auth(&username, &password);
    }

    if let Some(user) = matches.get_one::<String>("user") {
        let (username, password) = Auth::parse_user_pass(user);
        let auth_type = matches
            .get_one::<String>("auth-type")
            .map(String::as_str)
            .unwrap_or("basic");
        curl.http_auth(&username, &password, auth_type)?;
    }

    Ok(())
}

fn request_params(matches: &ArgMatches) -> anyhow::Result<Option<Params>> {
    if let Some(raw) = matches.get_one::<String>("data-raw") {
        return Ok(Some(Params::Raw(raw.clone())));
    }
    let Some(fields) = matches.get_many::<String>("data") else {
        return Ok(None);
    };
    let pairs = fields
        .map(|field| StringUtils::parse_key_value(field))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(Params::Form(pairs)))
}

/// Create the CLI application structure
pub fn create_app() -> Command {
    Command::new("curlkit")
        .version(crate::VERSION)
        .about("Issue one HTTP request through a curl-style option table")
        .arg(Arg::new("url")
            .help("The URL to request")
            .required(true)
            .index(1))
        .arg(Arg::new("request")
            .short('X')
            .long("request")
            .value_name("METHOD")
            .help("HTTP request method"))
        .arg(Arg::new("header")
            .short('H')
            .long("header")
            .value_name("HEADER")
            .help("Add a raw header line")
            .action(ArgAction::Append))
        .arg(Arg::new("cookie")
            .short('b')
            .long("cookie")
            .value_name("NAME=VALUE")
            .help("Send a cookie")
            .action(ArgAction::Append))
        .arg(Arg::new("cookie-file")
            .long("cookie-file")
            .value_name("FILE")
            .help("Read cookies from a Netscape cookie file"))
        .arg(Arg::new("cookie-jar")
            .short('c')
            .long("cookie-jar")
            .value_name("FILE")
            .help("Write cookies to a Netscape cookie file after the request"))
        .arg(Arg::new("data")
            .short('d')
            .long("data")
            .value_name("KEY=VALUE")
            .help("Add a form field to the request body")
            .action(ArgAction::Append))
        .arg(Arg::new("data-raw")
            .long("data-raw")
            .value_name("BODY")
            .help("Send a body verbatim")
            .conflicts_with("data"))
        .arg(Arg::new("json")
            .long("json")
            .help("Encode the POST body as JSON")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("user")
            .short('u')
            .long("user")
            .value_name("USER[:PASSWORD]")
            .help("HTTP authentication"))
        .arg(Arg::new("auth-type")
            .long("auth-type")
            .value_name("TYPE")
            .help("Authentication scheme (basic, bearer, digest, ntlm, any, ...)")
            .requires("user"))
        .arg(Arg::new("proxy")
            .short('x')
            .long("proxy")
            .value_name("[PROTOCOL://]HOST[:PORT]")
            .env("CURLKIT_PROXY")
            .help("Use proxy server"))
        .arg(Arg::new("proxy-user")
            .short('U')
            .long("proxy-user")
            .value_name("USER[:PASSWORD]")
            .help("Proxy authentication"))
        .arg(Arg::new("referer")
            .short('e')
            .long("referer")
            .value_name("URL")
            .help("Referer header"))
        .arg(Arg::new("user-agent")
            .short('A')
            .long("user-agent")
            .value_name("STRING")
            .env("CURLKIT_USER_AGENT")
            .help("User-Agent header"))
        .arg(Arg::new("max-time")
            .short('m')
            .long("max-time")
            .value_name("DURATION")
            .help("Maximum time for the transfer (s/m/h suffixes)"))
        .arg(Arg::new("connect-timeout")
            .long("connect-timeout")
            .value_name("DURATION")
            .help("Maximum time for connection"))
        .arg(Arg::new("no-location")
            .long("no-location")
            .help("Do not follow redirects")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("max-redirs")
            .long("max-redirs")
            .value_name("NUM")
            .help("Maximum number of redirects to follow"))
        .arg(Arg::new("opt")
            .long("opt")
            .value_name("NAME=VALUE")
            .help("Set a transfer option by name, e.g. timeout=10")
            .action(ArgAction::Append))
        .arg(Arg::new("output")
            .short('o')
            .long("output")
            .value_name("FILE")
            .help("Write output to file"))
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .help("Verbose output")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("silent")
            .short('s')
            .long("silent")
            .help("Silent mode")
            .action(ArgAction::SetTrue))
}
