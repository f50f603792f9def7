//! Tracing initialisation for the `ortho` binary.
//!
//! Logs go to stderr so stdout only carries reports and plots.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with `verbose`.
/// Only the first call takes effect.
pub fn init(verbose: bool) {
    let level = default_level(verbose);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .ok();
}

fn default_level(verbose: bool) -> Level {
    if verbose { Level::DEBUG } else { Level::INFO }
}
