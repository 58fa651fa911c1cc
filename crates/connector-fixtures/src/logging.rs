//! Tracing setup for test binaries.

use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a `tracing` subscriber that writes through the test harness's
/// captured output, filtered by `RUST_LOG`.
///
/// Safe to call from every test: later calls find the subscriber already
/// installed and leave it in place.
pub fn init_test_logging() {
    if fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .is_err()
    {
        debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_installation_keeps_a_global_subscriber() {
        init_test_logging();
        init_test_logging();
        assert!(tracing::dispatcher::has_been_set());
    }
}
