//! Logging initialization utilities.

use env_logger::Env;

/// Initialize logging with a default filter level.
///
/// The library itself only emits through the `log` facade; `RUST_LOG`
/// overrides the default.
pub fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env = Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env).try_init();
}
