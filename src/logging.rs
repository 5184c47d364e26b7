use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Logs go to stderr so progress bars and command output stay on their own
/// streams. Calling this twice keeps the first subscriber.
pub fn init_subscriber(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let formatter = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let subscriber = Registry::default().with(filter).with(formatter);

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}
