//! Tracing setup for the CLI.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise verbosity picks the default filter.
/// All diagnostics go to stderr so stdout stays reserved for the run summary.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "promforge=debug,info"
    } else {
        "promforge=info,warn"
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = fmt::layer()
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
