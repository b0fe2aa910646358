//! Diagnostic logging
//!
//! Structured events go to stderr so stdout stays machine readable.
//!
//! Configure via RUST_LOG environment variable:
//! - `RUST_LOG=debug` - all debug logs
//! - `RUST_LOG=rtab::core::model=debug` - table model state transitions only

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the tracing subscriber
///
/// RUST_LOG wins when set; otherwise `verbose` selects debug and `quiet`
/// selects error, with warn as the default.
pub fn init(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(filter);

    // A second init (e.g. in tests) keeps the first subscriber
    let _ = tracing_subscriber::registry().with(console_layer).try_init();
}
