use tracing_subscriber::EnvFilter;

/// Diagnostic tracing to stderr, filtered by `RUST_LOG` (default `warn`).
///
/// User-facing output goes through [`crate::ui`]; this is only for
/// `RUST_LOG=surf_bootstrap=debug` style troubleshooting.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
