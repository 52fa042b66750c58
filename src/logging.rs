use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise debug or info depending on `BACKEND_DEBUG`.
/// Logs go to stderr so command output on stdout stays clean.
pub fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (tests, repeated calls) is a no-op
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
