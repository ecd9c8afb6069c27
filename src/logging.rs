use tracing_subscriber::EnvFilter;

/// Initializes a global `tracing` subscriber for binaries embedding this
/// crate. Safe to call more than once; later calls are no-ops.
///
/// `filter` follows `EnvFilter` syntax (e.g. `"pkgdepot=debug,warn"`); pass
/// `None` to fall back to the `RUST_LOG` environment variable.
pub fn init_logging(filter: Option<&str>) {
    let env_filter = match filter {
        Some(f) => EnvFilter::try_new(f).unwrap_or_else(|_| EnvFilter::new("warn")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init();
}
