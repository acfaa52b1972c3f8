use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise production logs at `info`, everything
/// else at `debug`. Production output is JSON for log shipping.
pub fn init(settings: &Settings) {
    let default_level = if settings.is_production() { "info" } else { "debug" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let res = if settings.is_production() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    // A second init (tests, embedding hosts) keeps the first subscriber.
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
