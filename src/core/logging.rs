//! Logging initialization and utilities

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info` and millisecond
/// timestamps. Override with RUST_LOG environment variable.
///
/// # Example
/// ```
/// terrain_ai::core::logging::init();
/// log::info!("Session started");
/// ```
pub fn init() {
    // try_init: tests and the mock host may initialize more than once
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Log a multi-line block (prompts, node listings) one line at a time so
/// every line carries the timestamp prefix.
pub fn log_block(level: log::Level, header: &str, body: &str) {
    log::log!(level, "--- {} ---", header);
    for line in body.lines() {
        log::log!(level, "{}", line);
    }
    log::log!(level, "{}", "-".repeat(header.len() + 8));
}
