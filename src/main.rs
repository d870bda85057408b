use std::sync::Arc;

use klinik::config::{self, ClinicConfig};
use klinik::core_state::ClinicState;
use klinik::seed::{SeedData, SeedError};
use klinik::storage::{FileStorage, KeyValueStorage, StorageError};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    klinik::init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ClinicConfig::from_env();
    let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::open(&config.data_dir)?);

    let data = match &config.seed_file {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading seed file");
            SeedData::from_json_file(path)?
        }
        None => SeedData::demo(klinik::stores::local_today()),
    };

    let bind = config.bind;
    let state = Arc::new(ClinicState::seeded(config, storage, &data));
    let stats = state.collection_stats();
    tracing::info!(
        users = stats.users.total,
        patients = stats.patients.total,
        appointments = stats.appointments.total,
        invoices = stats.billing.total_invoices,
        inventory = stats.inventory.total,
        "collections ready"
    );

    klinik::api::serve(state, bind).await?;
    Ok(())
}
