//! Logger setup for applications embedding the streamer

/// Default filter when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info";

/// Install `env_logger` with the [`DEFAULT_FILTER`], overridable with
/// `RUST_LOG` (e.g. `RUST_LOG=cloudstream::streaming=trace` to see every
/// fill step).
///
/// # Example
/// ```
/// cloudstream::core::logging::init();
/// log::info!("Streaming started");
/// ```
pub fn init() -> bool {
    init_with_default(DEFAULT_FILTER)
}

/// Like [`init`] with a different fallback filter
///
/// Returns false if a logger was already installed, which leaves that logger
/// in place.
pub fn init_with_default(filter: &str) -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}
