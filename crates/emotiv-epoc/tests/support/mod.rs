pub mod mock_transport;

use tracing_subscriber::EnvFilter;

/// Route library logs to the test harness. `RUST_LOG` overrides the filter.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("emotiv_epoc=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
