use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_CURRENCY, DEFAULT_LANGUAGE, DEFAULT_THEME};
use crate::models::{Language, Theme};
use crate::storage::{load_json, save_json, KeyValueStorage, StorageError};
use crate::store::Store;

/// Storage key of the persisted settings snapshot.
pub const SETTINGS_KEY: &str = "app_config";

/// Clinic-wide preferences. Missing fields in a stored snapshot take
/// their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub clinic_name: String,
    pub clinic_address: String,
    pub clinic_tax_number: String,
    pub clinic_logo_url: String,
    pub theme: Theme,
    pub primary_color: String,
    pub accent_color: String,
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub appointment_reminders: bool,
    pub system_notifications: bool,
    pub language: Language,
    pub currency: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            clinic_name: "Klinik Adı".into(),
            clinic_address: "Klinik Adresi".into(),
            clinic_tax_number: "XXXXXXX".into(),
            clinic_logo_url: String::new(),
            theme: DEFAULT_THEME,
            primary_color: "blue".into(),
            accent_color: "emerald".into(),
            email_notifications: true,
            sms_notifications: false,
            appointment_reminders: true,
            system_notifications: true,
            language: DEFAULT_LANGUAGE,
            currency: DEFAULT_CURRENCY.into(),
        }
    }
}

/// Settings mirrored to key-value storage on every change.
pub struct SettingsStore {
    state: Store<AppSettings>,
    storage: Arc<dyn KeyValueStorage>,
}

impl SettingsStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let initial = load_json(storage.as_ref(), SETTINGS_KEY).unwrap_or_default();
        Self {
            state: Store::new(initial),
            storage,
        }
    }

    pub fn store(&self) -> &Store<AppSettings> {
        &self.state
    }

    pub fn get(&self) -> AppSettings {
        self.state.get()
    }

    /// Edits the settings and persists the result. The in-memory value
    /// changes even when the write fails.
    pub fn update(&self, f: impl FnOnce(&mut AppSettings)) -> Result<AppSettings, StorageError> {
        self.state.update(f);
        self.persist()
    }

    pub fn set(&self, settings: AppSettings) -> Result<AppSettings, StorageError> {
        self.state.set(settings);
        self.persist()
    }

    pub fn reset(&self) -> Result<AppSettings, StorageError> {
        self.set(AppSettings::default())
    }

    fn persist(&self) -> Result<AppSettings, StorageError> {
        let settings = self.state.get();
        if let Err(e) = save_json(self.storage.as_ref(), SETTINGS_KEY, &settings) {
            tracing::warn!(error = %e, "failed to persist settings");
            return Err(e);
        }
        Ok(settings)
    }
}
