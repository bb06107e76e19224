//! Tracing subscriber initialization.
//!
//! Log events carry person and group ids only, never names or contact data.

use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::LogFormat;

const DEFAULT_FILTER: &str = "roster_server=info,roster_check=info,sqlx=warn";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the default filter. Calling this twice is an error,
/// which is reported and otherwise ignored.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    if let Err(e) = Registry::default().with(filter).with(fmt_layer).try_init() {
        eprintln!("tracing subscriber already installed: {e}");
    }
}
