use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Registry + env filter + fmt layer, shared by every binary
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
