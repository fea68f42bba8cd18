//! Tracing setup for the bot.
//!
//! Progress and command transcripts are the bot's primary output, so the
//! default filter keeps `info` for this crate. `RUST_LOG` overrides it.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "warn,patchbot=info";

/// Initialize the tracing subscriber.
///
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=patchbot=debug patchbot run --patch rename
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
