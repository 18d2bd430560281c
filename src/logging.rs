use tracing_subscriber::EnvFilter;

/// Install the process-wide subscriber. Safe to call repeatedly; only the
/// first call wins. Debug builds log human-readable lines, release builds
/// emit JSON. Override the default level with `RUST_LOG`.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("blacktea_adb=info"));

    if cfg!(debug_assertions) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .with_target(false)
            .try_init();
    }
}
