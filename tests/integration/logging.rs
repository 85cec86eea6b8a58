//! Integration tests for logging and tracing

use ad_report_client::client::RetryPolicy;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[test]
fn tracing_subscriber_initialization() {
    // try_init tolerates another test having installed a subscriber first.
    let result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ad_report_client=debug")),
        )
        .with_test_writer()
        .try_init();

    assert!(result.is_ok() || result.is_err());
}

#[test]
fn library_warnings_emit_under_a_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("ad_report_client=trace"))
        .with_test_writer()
        .try_init();

    // Out-of-range policy parameters log their correction at warn level.
    let policy = RetryPolicy::new(0, 0);
    assert_eq!(policy.max_attempts(), 8);
    assert_eq!(policy.base_delay_secs(), 10);

    debug!("explicit debug event");
    warn!("explicit warn event");
}

#[test]
fn env_filter_parses_library_directives() {
    let _plain = EnvFilter::new("info");
    let _scoped = EnvFilter::new("ad_report_client=debug");
    let _mixed = EnvFilter::new("warn,ad_report_client::client=trace");
}
