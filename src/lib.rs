pub mod config;
pub mod models;
pub mod pipeline;
pub mod analysis; // Risk findings, trends, chart projections
pub mod export; // CSV and PDF output
pub mod session;

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` wins over the built-in filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("{} v{} tracing initialized", config::APP_NAME, config::APP_VERSION);
}
