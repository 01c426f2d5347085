//! Helpers shared by the integration tests.

pub mod scripted;
pub mod sqlite;

/// Route `tracing` output through `env_logger`, once per test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
