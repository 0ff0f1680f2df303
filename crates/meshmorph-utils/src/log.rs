pub use log::{debug, error, info, log_enabled, trace, warn, Level, LevelFilter};

/// Installs an `env_logger` backend. `RUST_LOG` takes precedence over `default_level`.
/// Calling this more than once is harmless.
pub fn init_logger(default_level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(default_level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    if builder.try_init().is_err() {
        debug!("logger was already initialized");
    }
}
