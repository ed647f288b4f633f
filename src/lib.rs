pub mod config;
pub mod error;
pub mod models;
pub mod db;
pub mod scheduling; // dose schedule arithmetic
pub mod vitals; // classification thresholds
pub mod adherence; // dose events, counters, streaks
pub mod permissions; // connection graph + access checks
pub mod alerts; // trigger -> notification fan-out
pub mod notifications; // notification lifecycle
pub mod delivery; // channel sink + pull loop
pub mod rate_limit;
pub mod engine; // command facade

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` wins when set.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
