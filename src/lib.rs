pub mod api; // HTTP surface over the collections
pub mod config;
pub mod core_state; // Process-wide state: collections + stores
pub mod mock_api; // Simulated collection services
pub mod models;
pub mod rules; // Pure domain rules (invoices, stock, scheduling)
pub mod seed; // Fixture loading
pub mod storage; // Key-value persistence
pub mod store; // Observable state container
pub mod stores; // Domain stores
pub mod validation;

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the
/// default filter. Calling it twice is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
