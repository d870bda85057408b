//! Process-wide application state.
//!
//! `ClinicState` is built once at startup and shared behind an `Arc` by the
//! binary and the HTTP router. It owns one `MockApi` per collection and
//! every domain store on top of them. The user store and the auth store
//! share the same user collection and credential table.

use std::sync::Arc;

use crate::config::ClinicConfig;
use crate::mock_api::MockApi;
use crate::models::{
    Appointment, InventoryItem, Invoice, MedicalRecord, Notification, Patient, Payment,
    StockMovement, User,
};
use crate::seed::{self, SeedData, SeedOptions, SeedStats};
use crate::storage::KeyValueStorage;
use crate::stores::auth::Credentials;
use crate::stores::{
    AppointmentStore, AuthStore, BillingStore, EmrStore, InventoryStore, NotificationStore,
    PatientStore, SettingsStore, ThemeStore, UserStore,
};

/// The backing collections, one simulated service each.
pub struct Collections {
    pub users: Arc<MockApi<User>>,
    pub patients: Arc<MockApi<Patient>>,
    pub appointments: Arc<MockApi<Appointment>>,
    pub medical_records: Arc<MockApi<MedicalRecord>>,
    pub invoices: Arc<MockApi<Invoice>>,
    pub payments: Arc<MockApi<Payment>>,
    pub inventory: Arc<MockApi<InventoryItem>>,
    pub stock_movements: Arc<MockApi<StockMovement>>,
    pub notifications: Arc<MockApi<Notification>>,
}

impl Collections {
    /// Empty collections, all answering after `config.api_delay`.
    fn empty(config: &ClinicConfig) -> Self {
        let delay = config.api_delay;
        Self {
            users: Arc::new(MockApi::with_delay(Vec::new(), delay)),
            patients: Arc::new(MockApi::with_delay(Vec::new(), delay)),
            appointments: Arc::new(MockApi::with_delay(Vec::new(), delay)),
            medical_records: Arc::new(MockApi::with_delay(Vec::new(), delay)),
            invoices: Arc::new(MockApi::with_delay(Vec::new(), delay)),
            payments: Arc::new(MockApi::with_delay(Vec::new(), delay)),
            inventory: Arc::new(MockApi::with_delay(Vec::new(), delay)),
            stock_movements: Arc::new(MockApi::with_delay(Vec::new(), delay)),
            notifications: Arc::new(MockApi::with_delay(Vec::new(), delay)),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// ClinicState
// ═══════════════════════════════════════════════════════════

pub struct ClinicState {
    pub config: ClinicConfig,
    pub storage: Arc<dyn KeyValueStorage>,
    pub apis: Collections,
    pub credentials: Arc<Credentials>,

    pub users: UserStore,
    pub auth: AuthStore,
    pub patients: PatientStore,
    pub appointments: AppointmentStore,
    pub billing: BillingStore,
    pub emr: EmrStore,
    pub inventory: InventoryStore,
    pub notifications: NotificationStore,
    pub theme: ThemeStore,
    pub settings: SettingsStore,
}

impl ClinicState {
    /// Empty collections; persisted session and settings are picked up
    /// from `storage`.
    pub fn new(config: ClinicConfig, storage: Arc<dyn KeyValueStorage>) -> Self {
        let apis = Collections::empty(&config);
        let credentials = Arc::new(Credentials::new());

        Self {
            users: UserStore::new(Arc::clone(&apis.users), Arc::clone(&credentials)),
            auth: AuthStore::new(
                Arc::clone(&apis.users),
                Arc::clone(&credentials),
                Arc::clone(&storage),
                &config,
            ),
            patients: PatientStore::new(Arc::clone(&apis.patients)),
            appointments: AppointmentStore::new(Arc::clone(&apis.appointments)),
            billing: BillingStore::new(Arc::clone(&apis.invoices), Arc::clone(&apis.payments)),
            emr: EmrStore::new(Arc::clone(&apis.medical_records)),
            inventory: InventoryStore::new(
                Arc::clone(&apis.inventory),
                Arc::clone(&apis.stock_movements),
            ),
            notifications: NotificationStore::new(Arc::clone(&apis.notifications)),
            theme: ThemeStore::new(),
            settings: SettingsStore::new(Arc::clone(&storage)),
            config,
            storage,
            apis,
            credentials,
        }
    }

    /// Constructs the state and loads every collection from `data`.
    pub fn seeded(config: ClinicConfig, storage: Arc<dyn KeyValueStorage>, data: &SeedData) -> Self {
        let state = Self::new(config, storage);
        seed::seed_database(&state, data, &SeedOptions::default(), |_, _| {});
        state
    }

    /// Empties every collection and the credential table.
    pub fn clear_all(&self) {
        self.apis.users.clear();
        self.apis.patients.clear();
        self.apis.appointments.clear();
        self.apis.medical_records.clear();
        self.apis.invoices.clear();
        self.apis.payments.clear();
        self.apis.inventory.clear();
        self.apis.stock_movements.clear();
        self.apis.notifications.clear();
        self.credentials.clear();
        self.sync_stores();
    }

    /// Re-mirrors every entity store from its collection.
    pub fn sync_stores(&self) {
        self.users.sync_from_api();
        self.patients.sync_from_api();
        self.appointments.sync_from_api();
        self.emr.sync_from_api();
        self.billing.sync_from_api();
        self.billing.payments().sync_from_api();
        self.inventory.sync_from_api();
        self.inventory.movements().sync_from_api();
        self.notifications.sync_from_api();
        tracing::debug!("stores re-synced from collections");
    }

    /// Live counts in the seed summary shape.
    pub fn collection_stats(&self) -> SeedStats {
        SeedData {
            users: self.apis.users.snapshot(),
            credentials: Default::default(),
            patients: self.apis.patients.snapshot(),
            appointments: self.apis.appointments.snapshot(),
            medical_records: self.apis.medical_records.snapshot(),
            invoices: self.apis.invoices.snapshot(),
            payments: self.apis.payments.snapshot(),
            inventory: self.apis.inventory.snapshot(),
            stock_movements: self.apis.stock_movements.snapshot(),
            notifications: self.apis.notifications.snapshot(),
        }
        .stats()
    }
}
