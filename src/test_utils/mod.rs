//! Test utilities for fsroute
//!
//! Helpers shared by unit and integration tests:
//! - [`init_test_logging`] installs a test-friendly tracing subscriber once
//! - [`LayeredFixture`] builds temporary layer trees with artifacts
//!
//! # Example
//!
//! ```rust,no_run
//! use fsroute::test_utils::LayeredFixture;
//! use serde_json::json;
//!
//! let fixture = LayeredFixture::new().unwrap().template_layer("t-app").context_layer("c-app");
//! fixture.template("t-app", "blog", json!({ "main": "{{ title }}" })).unwrap();
//! let options = fixture.options();
//! ```

pub mod fixtures;

pub use fixtures::LayeredFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` if given, otherwise `RUST_LOG` if set, otherwise does nothing.
///
/// ```bash
/// RUST_LOG=fsroute=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
