use tracing_subscriber::EnvFilter;

/// Initialize structured logging for an embedding process.
///
/// `RUST_LOG` wins when set; safe to call more than once (later calls are
/// no-ops).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mintrunner=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
