use tracing_subscriber::EnvFilter;

/// Log to stderr. The default filter only surfaces warnings; `--debug`
/// raises it so per-file skips and catalog diagnostics become visible.
/// `RUST_LOG` overrides both.
pub fn init(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
